//! The generation-backed tools: resume maker, captions, kids' stories,
//! homework, budget planner and image generator.
//!
//! Each tool builds its instruction from [`crate::prompts`], makes exactly
//! one call through [`GenerationClient`] and tidies the answer. Required
//! fields are checked before anything is sent.

use crate::config::ToolverseConfig;
use crate::error::ToolverseError;
use crate::generation::audio::SpeechClip;
use crate::generation::{GenerationClient, InlineData};
use crate::options::{AspectRatio, Platform, Tone, Voice};
use crate::output::{BudgetPlan, GeneratedImage};
use crate::pipeline::detect::FileKind;
use crate::pipeline::input::UploadedFile;
use crate::pipeline::postprocess::clean_markdown;
use crate::prompts::{self, StoryBrief};
use tracing::{debug, info};

/// Generation-backed tools sharing one client.
#[derive(Debug, Clone)]
pub struct Tools {
    client: GenerationClient,
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ToolverseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ToolverseError::MissingInput { field })
    } else {
        Ok(trimmed)
    }
}

fn image_part(image: Option<&UploadedFile>, operation: &'static str) -> Result<Option<InlineData>, ToolverseError> {
    match image {
        Some(file) => {
            file.require(FileKind::Image, operation)?;
            Ok(Some(InlineData::new(file.media_type.clone(), file.bytes.clone())))
        }
        None => Ok(None),
    }
}

impl Tools {
    pub fn new(client: GenerationClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &ToolverseConfig) -> Result<Self, ToolverseError> {
        Ok(Self::new(GenerationClient::from_config(config)?))
    }

    async fn markdown(&self, instruction: String, inline: Option<InlineData>) -> Result<String, ToolverseError> {
        let model = self.client.text_model().to_string();
        let text = self.client.generate_text(&model, instruction, inline).await?;
        Ok(clean_markdown(&text))
    }

    // ── Resume maker ─────────────────────────────────────────────────────

    /// A Markdown resume, tailored when a job description is given.
    pub async fn resume(&self, user_data: &str, job_description: Option<&str>) -> Result<String, ToolverseError> {
        let user_data = required(user_data, "user data")?;
        info!("Writing resume ({} chars of user data)", user_data.len());
        self.markdown(prompts::resume(user_data, job_description), None).await
    }

    pub async fn cover_letter(&self, user_data: &str, job_description: Option<&str>) -> Result<String, ToolverseError> {
        let user_data = required(user_data, "user data")?;
        info!("Writing cover letter");
        self.markdown(prompts::cover_letter(user_data, job_description), None).await
    }

    // ── Captions ─────────────────────────────────────────────────────────

    /// Five captions with hashtags. Needs a description, an image, or both.
    pub async fn captions(
        &self,
        description: &str,
        image: Option<&UploadedFile>,
        platform: Platform,
        tone: Tone,
    ) -> Result<String, ToolverseError> {
        if description.trim().is_empty() && image.is_none() {
            return Err(ToolverseError::MissingInput {
                field: "description or image",
            });
        }
        let inline = image_part(image, "captions")?;
        info!("Writing {} captions for {}", tone, platform);
        self.markdown(prompts::captions(description, platform, tone), inline).await
    }

    // ── Kids' stories ────────────────────────────────────────────────────

    pub async fn story(&self, brief: &StoryBrief) -> Result<String, ToolverseError> {
        required(&brief.topic, "topic")?;
        required(&brief.character, "character")?;
        info!("Writing {} story in {}", brief.genre, brief.language);
        self.markdown(prompts::story(brief), None).await
    }

    /// Speech for `text` in the chosen voice.
    pub async fn read_aloud(&self, text: &str, voice: Voice) -> Result<SpeechClip, ToolverseError> {
        let text = required(text, "text")?;
        let clip = self.client.synthesize_speech(text, voice).await?;
        debug!("Speech clip: {:?}", clip);
        Ok(clip)
    }

    // ── Homework ─────────────────────────────────────────────────────────

    /// Step-by-step solution from the reasoning model. Needs a question, a
    /// photo of the problem, or both.
    pub async fn homework(&self, question: &str, image: Option<&UploadedFile>) -> Result<String, ToolverseError> {
        if question.trim().is_empty() && image.is_none() {
            return Err(ToolverseError::MissingInput {
                field: "question or image",
            });
        }
        let inline = image_part(image, "homework")?;
        let model = self.client.reasoning_model().to_string();
        info!("Solving homework with {}", model);
        let text = self.client.generate_text(&model, prompts::homework(question), inline).await?;
        Ok(clean_markdown(&text))
    }

    // ── Budget ───────────────────────────────────────────────────────────

    pub async fn budget(&self, financial_data: &str) -> Result<BudgetPlan, ToolverseError> {
        let data = required(financial_data, "financial data")?;
        let model = self.client.text_model().to_string();
        info!("Planning budget");
        let mut plan: BudgetPlan = self
            .client
            .generate_structured(&model, prompts::budget(data), prompts::budget_schema())
            .await?;
        plan.analysis = clean_markdown(&plan.analysis);
        debug!("{} categories, total {:.2}", plan.categories.len(), plan.total());
        Ok(plan)
    }

    // ── Images ───────────────────────────────────────────────────────────

    pub async fn generate_image(&self, prompt: &str, aspect_ratio: AspectRatio) -> Result<GeneratedImage, ToolverseError> {
        let prompt = required(prompt, "prompt")?;
        let image = self.client.generate_image(prompt, aspect_ratio).await?;
        debug!("Generated {:?}", image);
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::testing::{client, RecordingBackend};
    use crate::generation::{GenerationResponse, OutputKind, ResponsePart};
    use crate::options::{Genre, Language};

    fn tools(backend: std::sync::Arc<RecordingBackend>) -> Tools {
        Tools::new(client(backend))
    }

    #[tokio::test]
    async fn resume_is_cleaned_markdown() {
        let backend = RecordingBackend::text("```markdown\n# Jane Doe\n\n\n\nEngineer   \n```");
        let out = tools(backend.clone()).resume("Jane, 5 years Rust", None).await.unwrap();
        assert_eq!(out, "# Jane Doe\n\nEngineer\n");
        let req = &backend.taken()[0];
        assert_eq!(req.model, "gemini-2.5-flash");
        assert!(req.instruction.contains("Jane, 5 years Rust"));
        assert!(!req.instruction.contains("Target Job Description"));
    }

    #[tokio::test]
    async fn blank_user_data_never_calls_out() {
        let backend = RecordingBackend::text("unused");
        let err = tools(backend.clone()).cover_letter("  ", Some("Rust dev")).await.unwrap_err();
        assert!(matches!(err, ToolverseError::MissingInput { field: "user data" }));
        assert!(backend.taken().is_empty());
    }

    #[tokio::test]
    async fn captions_send_image_first_with_default_context() {
        let backend = RecordingBackend::text("1. Sunset vibes #golden");
        let photo = UploadedFile::new("beach.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF]);
        tools(backend.clone())
            .captions("", Some(&photo), Platform::LinkedIn, Tone::Professional)
            .await
            .unwrap();
        let req = &backend.taken()[0];
        assert_eq!(req.inline.as_ref().unwrap().media_type, "image/jpeg");
        assert!(req.instruction.contains(prompts::DEFAULT_CAPTION_CONTEXT));
        assert!(req.instruction.contains("LinkedIn"));
    }

    #[tokio::test]
    async fn captions_need_something() {
        let backend = RecordingBackend::text("unused");
        let err = tools(backend)
            .captions(" ", None, Platform::default(), Tone::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolverseError::MissingInput { .. }));
    }

    #[tokio::test]
    async fn captions_reject_non_image_upload() {
        let backend = RecordingBackend::text("unused");
        let pdf = UploadedFile::new("a.pdf", "application/pdf", b"%PDF".to_vec());
        let err = tools(backend)
            .captions("hi", Some(&pdf), Platform::default(), Tone::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolverseError::UnsupportedFileType { .. }));
    }

    #[tokio::test]
    async fn story_requires_topic_and_character() {
        let backend = RecordingBackend::text("Once upon a time");
        let mut brief = StoryBrief {
            topic: "space".into(),
            character: "".into(),
            age: "6".into(),
            genre: Genre::SciFi,
            moral: None,
            language: Language::default(),
        };
        let err = tools(backend.clone()).story(&brief).await.unwrap_err();
        assert!(matches!(err, ToolverseError::MissingInput { field: "character" }));

        brief.character = "Luna".into();
        let story = tools(backend.clone()).story(&brief).await.unwrap();
        assert_eq!(story, "Once upon a time\n");
        assert!(backend.taken()[0].instruction.contains("Sci-Fi"));
    }

    #[tokio::test]
    async fn homework_uses_reasoning_model() {
        let backend = RecordingBackend::text("$x = 2$");
        tools(backend.clone()).homework("2x = 4", None).await.unwrap();
        let req = &backend.taken()[0];
        assert_eq!(req.model, "gemini-3-pro-preview");
        assert!(req.instruction.contains("2x = 4"));
    }

    #[tokio::test]
    async fn budget_uses_schema() {
        let backend = RecordingBackend::text(r#"{"analysis":"Spend less","categories":[{"name":"Rent","value":1000}]}"#);
        let plan = tools(backend.clone()).budget("Income 3000").await.unwrap();
        assert_eq!(plan.analysis, "Spend less\n");
        assert_eq!(plan.total(), 1000.0);
        match &backend.taken()[0].output {
            OutputKind::Structured { schema } => assert_eq!(schema, &prompts::budget_schema()),
            other => panic!("unexpected output kind {other:?}"),
        }
    }

    #[tokio::test]
    async fn read_aloud_returns_clip() {
        let backend = RecordingBackend::replying(vec![Ok(GenerationResponse {
            parts: vec![ResponsePart::Inline(InlineData::new("audio/L16;rate=24000", vec![0, 0, 0, 64]))],
        })]);
        let clip = tools(backend.clone()).read_aloud("Hello there", Voice::Puck).await.unwrap();
        assert_eq!(clip.decode().samples, vec![0.0, 0.5]);
        assert_eq!(backend.taken()[0].output, OutputKind::Audio { voice: Voice::Puck });
    }

    #[tokio::test]
    async fn image_prompt_required() {
        let backend = RecordingBackend::text("unused");
        let err = tools(backend).generate_image("", AspectRatio::Square).await.unwrap_err();
        assert!(matches!(err, ToolverseError::MissingInput { field: "prompt" }));
    }
}
