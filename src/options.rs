//! Enumerated choices offered by the tool forms.
//!
//! Each option has a wire label (what goes into the prompt or request) and
//! parses case-insensitively from that label with punctuation and spaces
//! ignored, so `sci-fi`, `Sci-Fi` and `scifi` all select [`Genre::SciFi`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! option_enum {
    (
        $(#[$meta:meta])*
        $name:ident, default = $default:ident {
            $($variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every choice, in display order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The label used on the wire and in prompts.
            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = squash(s);
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| squash(v.label()) == wanted)
                    .ok_or_else(|| {
                        let choices: Vec<&str> = $name::ALL.iter().map(|v| v.label()).collect();
                        format!("unknown {} '{}' (expected one of: {})", stringify!($name), s, choices.join(", "))
                    })
            }
        }
    };
}

fn squash(s: &str) -> String {
    s.chars().filter(|c| c.is_alphanumeric()).flat_map(char::to_lowercase).collect()
}

option_enum! {
    /// Social network the captions are written for.
    Platform, default = Instagram {
        Instagram => "Instagram",
        YouTube => "YouTube",
        Twitter => "Twitter",
        LinkedIn => "LinkedIn",
        TikTok => "TikTok",
        Facebook => "Facebook",
    }
}

option_enum! {
    /// Caption tone.
    Tone, default = Engaging {
        Engaging => "engaging",
        Funny => "funny",
        Professional => "professional",
        Inspirational => "inspirational",
        Sarcastic => "sarcastic",
    }
}

option_enum! {
    Genre, default = Adventure {
        Adventure => "Adventure",
        Fantasy => "Fantasy",
        SciFi => "Sci-Fi",
        BedtimeStory => "Bedtime Story",
        Funny => "Funny",
        Mystery => "Mystery",
    }
}

option_enum! {
    /// Story language.
    Language, default = English {
        English => "English",
        Spanish => "Spanish",
        French => "French",
        German => "German",
        Italian => "Italian",
        Portuguese => "Portuguese",
        Hindi => "Hindi",
        Tamil => "Tamil",
        Telugu => "Telugu",
        Malayalam => "Malayalam",
        Kannada => "Kannada",
        Japanese => "Japanese",
        Chinese => "Chinese",
        Arabic => "Arabic",
        Russian => "Russian",
    }
}

option_enum! {
    /// Prebuilt narrator voice for speech synthesis.
    Voice, default = Kore {
        Kore => "Kore",
        Puck => "Puck",
        Charon => "Charon",
        Fenrir => "Fenrir",
        Zephyr => "Zephyr",
    }
}

option_enum! {
    /// Aspect ratio requested from image synthesis.
    AspectRatio, default = Square {
        Square => "1:1",
        Landscape => "16:9",
        Portrait => "9:16",
        Standard => "4:3",
        Tall => "3:4",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_forgiving() {
        assert_eq!("sci-fi".parse::<Genre>().unwrap(), Genre::SciFi);
        assert_eq!("bedtime story".parse::<Genre>().unwrap(), Genre::BedtimeStory);
        assert_eq!("YOUTUBE".parse::<Platform>().unwrap(), Platform::YouTube);
        assert_eq!("16:9".parse::<AspectRatio>().unwrap(), AspectRatio::Landscape);
        assert_eq!("puck".parse::<Voice>().unwrap(), Voice::Puck);
    }

    #[test]
    fn unknown_lists_choices() {
        let err = "klingon".parse::<Language>().unwrap_err();
        assert!(err.contains("English"), "{err}");
        assert!(err.contains("klingon"), "{err}");
    }

    #[test]
    fn defaults_match_forms() {
        assert_eq!(Platform::default(), Platform::Instagram);
        assert_eq!(Tone::default().label(), "engaging");
        assert_eq!(Genre::default(), Genre::Adventure);
        assert_eq!(Language::default(), Language::English);
        assert_eq!(Voice::default().label(), "Kore");
        assert_eq!(AspectRatio::default().label(), "1:1");
    }

    #[test]
    fn all_lists_every_choice() {
        assert_eq!(Language::ALL.len(), 15);
        assert_eq!(AspectRatio::ALL.len(), 5);
        assert_eq!(Tone::ALL.len(), 5);
        assert_eq!(Platform::ALL.len(), 6);
    }
}
