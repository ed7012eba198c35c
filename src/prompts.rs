//! Every instruction sent to the generation service.
//!
//! Prompts live in one place so wording changes touch exactly one file and
//! tests can assert on them without a network.

use crate::config::SummaryDetail;
use crate::options::{Genre, Language, Platform, Tone};

// ── PDF tools ────────────────────────────────────────────────────────────

/// Summary instruction for the chosen detail level.
pub fn summary(detail: SummaryDetail) -> &'static str {
    match detail {
        SummaryDetail::Bullets => {
            "Provide a concise summary in bullet points, focusing only on the critical facts."
        }
        SummaryDetail::Short => "Provide a short, 1-paragraph abstract of the document.",
        SummaryDetail::Detailed => {
            "Provide a comprehensive summary. Highlight key points, main arguments, and important \
conclusions. Format with clear Markdown headings."
        }
    }
}

pub const PDF_TO_MARKDOWN: &str = "Extract the text content from this PDF. Preserve the structural \
hierarchy (headings, paragraphs, lists) using Markdown. Do not include any preamble, just the \
content. If there are tables, try to represent them as Markdown tables.";

pub const PDF_TO_CSV: &str = "Extract tabular data from this PDF and output it strictly as CSV \
format. If there are multiple tables, separate them with a blank line. Do not include markdown \
formatting or explanations, just the CSV data.";

// ── Resume maker ─────────────────────────────────────────────────────────

pub fn resume(user_data: &str, job_description: Option<&str>) -> String {
    let mut prompt = format!(
        "Create a professional resume in Markdown format based on the following raw user data. \
Ensure it looks polished, uses professional language, and is structured correctly (Header, \
Summary, Experience, Education, Skills). Raw Data: \n\n{user_data}"
    );
    if let Some(jd) = non_blank(job_description) {
        prompt.push_str(&format!(
            "\n\nTarget Job Description: {jd}\n\nPlease tailor the resume summary and highlight \
skills relevant to this job description."
        ));
    }
    prompt
}

pub fn cover_letter(user_data: &str, job_description: Option<&str>) -> String {
    let jd = non_blank(job_description).unwrap_or("General Application");
    format!(
        "Write a professional and persuasive cover letter in Markdown format.\n\n\
Applicant's Details:\n{user_data}\n\n\
Target Job Description:\n{jd}\n\n\
Instructions:\n\
- Use a formal business letter format.\n\
- Connect the applicant's skills and experience directly to the requirements in the job description.\n\
- Keep the tone enthusiastic but professional.\n\
- Ensure the letter flows logically: Introduction, Why I'm a fit (Body), and Conclusion."
    )
}

// ── Captions, stories, homework, budget ──────────────────────────────────

/// Context used when the caption form only has an image.
pub const DEFAULT_CAPTION_CONTEXT: &str = "Describe this image";

pub fn captions(description: &str, platform: Platform, tone: Tone) -> String {
    let context = non_blank(Some(description)).unwrap_or(DEFAULT_CAPTION_CONTEXT);
    format!(
        "Generate 5 {tone} social media captions (including hashtags) for {platform} based on this \
context: {context}"
    )
}

/// Form fields of the story maker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryBrief {
    pub topic: String,
    pub character: String,
    pub age: String,
    pub genre: Genre,
    pub moral: Option<String>,
    pub language: Language,
}

pub fn story(brief: &StoryBrief) -> String {
    let mut prompt = format!(
        "Write a creative and engaging children's story (approx 300 words) in {}. \nTopic: {}\n\
Main Character: {}\nTarget Audience Age: {} years old.\nGenre: {}.",
        brief.language, brief.topic, brief.character, brief.age, brief.genre
    );
    if let Some(moral) = non_blank(brief.moral.as_deref()) {
        prompt.push_str(&format!("\nMoral/Lesson: {moral}"));
    }
    prompt.push_str("\nFormat nicely with Markdown.");
    prompt
}

/// Question used when the homework form only has an image.
pub const DEFAULT_HOMEWORK_QUESTION: &str = "Solve this problem shown in the image.";

pub fn homework(question: &str) -> String {
    let question = non_blank(Some(question)).unwrap_or(DEFAULT_HOMEWORK_QUESTION);
    format!(
        "You are an expert tutor. Solve the following homework problem step-by-step. Explain the \
reasoning clearly. Use LaTeX for math equations where appropriate (wrapped in $ or $$). \n\
Question: {question}"
    )
}

pub fn budget(financial_data: &str) -> String {
    format!(
        "Analyze the following financial data and create a monthly budget plan. \n\
Return the response in JSON format with two keys: \"analysis\" (a markdown string explaining the \
budget advice) and \"categories\" (an array of objects with \"name\" and \"value\" representing \
suggested expense distribution).\n\nFinancial Data: {financial_data}"
    )
}

/// Response schema for [`budget`].
pub fn budget_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "analysis": { "type": "STRING" },
            "categories": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "value": { "type": "NUMBER" }
                    }
                }
            }
        }
    })
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_prompts_differ() {
        assert!(summary(SummaryDetail::Short).contains("1-paragraph abstract"));
        assert!(summary(SummaryDetail::Bullets).contains("bullet points"));
        assert!(summary(SummaryDetail::Detailed).contains("Markdown headings"));
    }

    #[test]
    fn resume_tailors_only_with_jd() {
        assert!(!resume("Jane, 5y Rust", None).contains("Target Job Description"));
        assert!(!resume("Jane", Some("   ")).contains("Target Job Description"));
        let tailored = resume("Jane", Some("Backend engineer"));
        assert!(tailored.contains("Target Job Description: Backend engineer"));
    }

    #[test]
    fn cover_letter_defaults_to_general() {
        assert!(cover_letter("Jane", None).contains("General Application"));
        assert!(cover_letter("Jane", Some("SRE")).contains("Target Job Description:\nSRE"));
    }

    #[test]
    fn captions_use_labels() {
        let p = captions("", Platform::LinkedIn, Tone::Professional);
        assert_eq!(
            p,
            "Generate 5 professional social media captions (including hashtags) for LinkedIn \
based on this context: Describe this image"
        );
    }

    #[test]
    fn story_moral_optional() {
        let mut brief = StoryBrief {
            topic: "space".into(),
            character: "Milo".into(),
            age: "6".into(),
            genre: Genre::SciFi,
            moral: None,
            language: Language::Spanish,
        };
        let p = story(&brief);
        assert!(p.contains("in Spanish"));
        assert!(p.contains("Genre: Sci-Fi."));
        assert!(!p.contains("Moral/Lesson"));
        assert!(p.ends_with("Format nicely with Markdown."));

        brief.moral = Some("share".into());
        assert!(story(&brief).contains("\nMoral/Lesson: share\n"));
    }

    #[test]
    fn homework_default_question() {
        assert!(homework(" ").ends_with("Question: Solve this problem shown in the image."));
    }

    #[test]
    fn budget_schema_shape() {
        let s = budget_schema();
        assert_eq!(s["properties"]["categories"]["items"]["properties"]["value"]["type"], "NUMBER");
        assert!(budget("rent 1200").ends_with("Financial Data: rent 1200"));
    }
}
