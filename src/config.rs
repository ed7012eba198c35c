//! Configuration types for the toolverse tools.
//!
//! [`ToolverseConfig`] carries the service endpoint, the API key and the
//! model chosen for each kind of generation, plus the defaults the local
//! adapters use. It is built through [`ToolverseConfigBuilder`] so callers
//! only set what they care about.

use crate::error::ToolverseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default base URL of the Gemini REST API.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Configuration shared by every tool.
///
/// # Example
/// ```rust
/// use toolverse::ToolverseConfig;
///
/// let config = ToolverseConfig::builder()
///     .api_key("test-key")
///     .text_model("gemini-2.5-flash")
///     .build()
///     .unwrap();
/// assert_eq!(config.raster_scale, 2.0);
/// ```
#[derive(Clone)]
pub struct ToolverseConfig {
    /// API key for the generation service. Required only by remote tools.
    pub api_key: Option<String>,

    /// Base URL of the generation service. Default: [`DEFAULT_ENDPOINT`].
    pub endpoint: String,

    /// Model used for summaries, extraction and the writing tools.
    pub text_model: String,

    /// Model used by the homework solver.
    pub reasoning_model: String,

    /// Model used for image synthesis.
    pub image_model: String,

    /// Model used for speech synthesis.
    pub speech_model: String,

    /// Magnification used by PDF → image. Range: 0.25–8.0. Default: 2.0.
    pub raster_scale: f32,

    /// Directory holding the pdfium shared library. If None, the system
    /// library is used.
    pub pdfium_lib_path: Option<PathBuf>,
}

impl Default for ToolverseConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            text_model: "gemini-2.5-flash".to_string(),
            reasoning_model: "gemini-3-pro-preview".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            speech_model: "gemini-2.5-flash-preview-tts".to_string(),
            raster_scale: 2.0,
            pdfium_lib_path: None,
        }
    }
}

impl fmt::Debug for ToolverseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolverseConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("text_model", &self.text_model)
            .field("reasoning_model", &self.reasoning_model)
            .field("image_model", &self.image_model)
            .field("speech_model", &self.speech_model)
            .field("raster_scale", &self.raster_scale)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .finish()
    }
}

impl ToolverseConfig {
    /// Create a new builder for `ToolverseConfig`.
    pub fn builder() -> ToolverseConfigBuilder {
        ToolverseConfigBuilder {
            config: Self::default(),
        }
    }

    /// The API key, or [`ToolverseError::ApiKeyMissing`].
    pub fn require_api_key(&self) -> Result<&str, ToolverseError> {
        match self.api_key.as_deref() {
            Some(k) if !k.trim().is_empty() => Ok(k),
            _ => Err(ToolverseError::ApiKeyMissing),
        }
    }
}

/// Builder for [`ToolverseConfig`].
#[derive(Debug)]
pub struct ToolverseConfigBuilder {
    config: ToolverseConfig,
}

impl ToolverseConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.config.text_model = model.into();
        self
    }

    pub fn reasoning_model(mut self, model: impl Into<String>) -> Self {
        self.config.reasoning_model = model.into();
        self
    }

    pub fn image_model(mut self, model: impl Into<String>) -> Self {
        self.config.image_model = model.into();
        self
    }

    pub fn speech_model(mut self, model: impl Into<String>) -> Self {
        self.config.speech_model = model.into();
        self
    }

    pub fn raster_scale(mut self, scale: f32) -> Self {
        self.config.raster_scale = scale;
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ToolverseConfig, ToolverseError> {
        let c = &self.config;
        if !(0.25..=8.0).contains(&c.raster_scale) {
            return Err(ToolverseError::InvalidConfig(format!(
                "Raster scale must be 0.25–8.0, got {}",
                c.raster_scale
            )));
        }
        if !c.endpoint.starts_with("http://") && !c.endpoint.starts_with("https://") {
            return Err(ToolverseError::InvalidConfig(format!(
                "Endpoint must be an HTTP(S) URL, got '{}'",
                c.endpoint
            )));
        }
        for (name, model) in [
            ("text", &c.text_model),
            ("reasoning", &c.reasoning_model),
            ("image", &c.image_model),
            ("speech", &c.speech_model),
        ] {
            if model.trim().is_empty() {
                return Err(ToolverseError::InvalidConfig(format!(
                    "The {name} model must not be empty"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Compression strength offered by the compress-file and compress-image tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompressionLevel {
    /// Smallest output.
    Low,
    #[default]
    Medium,
    /// Best looking output.
    High,
}

/// A named (JPEG quality, rasterisation scale) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    /// JPEG quality in 0.0–1.0.
    pub jpeg_quality: f32,
    /// Magnification used when a PDF page is rasterised before re-encoding.
    pub scale: f32,
}

impl Preset {
    /// Quality as the 1–100 integer the JPEG encoder takes.
    pub fn quality_percent(&self) -> u8 {
        (self.jpeg_quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

impl CompressionLevel {
    /// | Level  | JPEG quality | Scale |
    /// |--------|--------------|-------|
    /// | High   | 0.8          | 2.0   |
    /// | Medium | 0.6          | 1.5   |
    /// | Low    | 0.3          | 1.0   |
    pub fn preset(self) -> Preset {
        match self {
            CompressionLevel::High => Preset {
                jpeg_quality: 0.8,
                scale: 2.0,
            },
            CompressionLevel::Medium => Preset {
                jpeg_quality: 0.6,
                scale: 1.5,
            },
            CompressionLevel::Low => Preset {
                jpeg_quality: 0.3,
                scale: 1.0,
            },
        }
    }
}

/// How much detail the PDF summariser asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SummaryDetail {
    Bullets,
    Short,
    #[default]
    Detailed,
}
