//! Remote generation: one request shape, one response shape, one call.
//!
//! [`GenerationBackend`] is the seam. [`GeminiClient`] is the production
//! backend; tests plug in a recording backend or point the Gemini client
//! at a mock server. [`GenerationClient`] sits on top and turns raw
//! responses into what the tools need: text, a parsed structured object,
//! an image or a speech clip. Each call is one attempt. Nothing is retried.

pub mod audio;
mod gemini;
mod wire;

pub use gemini::GeminiClient;

use crate::config::ToolverseConfig;
use crate::error::{Stage, ToolverseError};
use crate::options::{AspectRatio, Voice};
use crate::output::GeneratedImage;
use async_trait::async_trait;
use audio::SpeechClip;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info};

/// Binary payload sent inline with (or returned by) a request.
#[derive(Clone, PartialEq, Eq)]
pub struct InlineData {
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl InlineData {
    pub fn new(media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            media_type: media_type.into(),
            bytes,
        }
    }
}

impl std::fmt::Debug for InlineData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineData")
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// What the model is asked to produce.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OutputKind {
    #[default]
    Text,
    /// JSON matching `schema`.
    Structured { schema: serde_json::Value },
    Image { aspect_ratio: AspectRatio },
    Audio { voice: Voice },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub instruction: String,
    /// Sent before the instruction.
    pub inline: Option<InlineData>,
    pub output: OutputKind,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            instruction: instruction.into(),
            inline: None,
            output: OutputKind::Text,
        }
    }

    pub fn with_inline(mut self, inline: Option<InlineData>) -> Self {
        self.inline = inline;
        self
    }

    pub fn with_output(mut self, output: OutputKind) -> Self {
        self.output = output;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePart {
    Text(String),
    Inline(InlineData),
}

/// Parts of the first candidate, in order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerationResponse {
    pub parts: Vec<ResponsePart>,
}

impl GenerationResponse {
    /// All text parts joined.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                ResponsePart::Text(t) => Some(t.as_str()),
                ResponsePart::Inline(_) => None,
            })
            .collect()
    }

    /// First inline part, if any.
    pub fn first_inline(&self) -> Option<&InlineData> {
        self.parts.iter().find_map(|p| match p {
            ResponsePart::Inline(d) => Some(d),
            ResponsePart::Text(_) => None,
        })
    }
}

/// Anything that can answer a [`GenerationRequest`].
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ToolverseError>;
}

/// Typed helpers over a backend, with the configured model per task.
#[derive(Clone)]
pub struct GenerationClient {
    backend: Arc<dyn GenerationBackend>,
    text_model: String,
    reasoning_model: String,
    image_model: String,
    speech_model: String,
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient")
            .field("text_model", &self.text_model)
            .field("reasoning_model", &self.reasoning_model)
            .field("image_model", &self.image_model)
            .field("speech_model", &self.speech_model)
            .finish_non_exhaustive()
    }
}

impl GenerationClient {
    /// Use `backend` with the models named in `config`.
    pub fn new(backend: Arc<dyn GenerationBackend>, config: &ToolverseConfig) -> Self {
        Self {
            backend,
            text_model: config.text_model.clone(),
            reasoning_model: config.reasoning_model.clone(),
            image_model: config.image_model.clone(),
            speech_model: config.speech_model.clone(),
        }
    }

    /// A client talking to the Gemini endpoint in `config`.
    pub fn from_config(config: &ToolverseConfig) -> Result<Self, ToolverseError> {
        let gemini = GeminiClient::new(config.require_api_key()?, &config.endpoint);
        Ok(Self::new(Arc::new(gemini), config))
    }

    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    pub fn reasoning_model(&self) -> &str {
        &self.reasoning_model
    }

    /// Free text. Blank answers are [`ToolverseError::EmptyGenerationResult`].
    pub async fn generate_text(
        &self,
        model: &str,
        instruction: impl Into<String>,
        inline: Option<InlineData>,
    ) -> Result<String, ToolverseError> {
        let request = GenerationRequest::new(model, instruction).with_inline(inline);
        info!("Generating text with {}", model);
        let text = self.backend.generate(request).await?.text();
        if text.trim().is_empty() {
            return Err(ToolverseError::EmptyGenerationResult);
        }
        debug!("{} returned {} chars", model, text.len());
        Ok(text)
    }

    /// A JSON answer constrained by `schema`, parsed into `T`.
    pub async fn generate_structured<T: DeserializeOwned>(
        &self,
        model: &str,
        instruction: impl Into<String>,
        schema: serde_json::Value,
    ) -> Result<T, ToolverseError> {
        let request =
            GenerationRequest::new(model, instruction).with_output(OutputKind::Structured { schema });
        info!("Generating structured output with {}", model);
        let text = self.backend.generate(request).await?.text();
        if text.trim().is_empty() {
            return Err(ToolverseError::EmptyGenerationResult);
        }
        serde_json::from_str(text.trim()).map_err(|e| ToolverseError::decode(Stage::Parse, model, e))
    }

    /// One image for `prompt`.
    pub async fn generate_image(
        &self,
        prompt: impl Into<String>,
        aspect_ratio: AspectRatio,
    ) -> Result<GeneratedImage, ToolverseError> {
        let request = GenerationRequest::new(&self.image_model, prompt).with_output(OutputKind::Image { aspect_ratio });
        info!("Generating {} image with {}", aspect_ratio, self.image_model);
        let response = self.backend.generate(request).await?;
        let image = response
            .parts
            .into_iter()
            .find_map(|p| match p {
                ResponsePart::Inline(d) if !d.bytes.is_empty() => Some(d),
                _ => None,
            })
            .ok_or(ToolverseError::NoImageInResponse)?;
        Ok(GeneratedImage {
            media_type: image.media_type,
            bytes: image.bytes,
        })
    }

    /// Read `text` aloud. The clip is 24 kHz mono 16-bit PCM.
    pub async fn synthesize_speech(&self, text: impl Into<String>, voice: Voice) -> Result<SpeechClip, ToolverseError> {
        let request = GenerationRequest::new(&self.speech_model, text).with_output(OutputKind::Audio { voice });
        info!("Synthesising speech with voice {}", voice);
        let response = self.backend.generate(request).await?;
        // Audio is expected in the first part only.
        match response.parts.into_iter().next() {
            Some(ResponsePart::Inline(d)) if !d.bytes.is_empty() => Ok(SpeechClip::from_pcm(d.bytes)),
            _ => Err(ToolverseError::NoAudioInResponse),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A backend that records requests and replays canned responses.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct RecordingBackend {
        pub requests: Mutex<Vec<GenerationRequest>>,
        replies: Mutex<VecDeque<Result<GenerationResponse, ToolverseError>>>,
    }

    impl RecordingBackend {
        pub fn replying(replies: Vec<Result<GenerationResponse, ToolverseError>>) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                replies: Mutex::new(replies.into()),
            })
        }

        pub fn text(reply: &str) -> Arc<Self> {
            Self::replying(vec![Ok(GenerationResponse {
                parts: vec![ResponsePart::Text(reply.to_string())],
            })])
        }

        pub fn taken(&self) -> Vec<GenerationRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerationBackend for RecordingBackend {
        async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ToolverseError> {
            self.requests.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(GenerationResponse::default()))
        }
    }

    pub(crate) fn client(backend: Arc<RecordingBackend>) -> GenerationClient {
        GenerationClient::new(backend, &ToolverseConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::output::BudgetPlan;

    #[tokio::test]
    async fn blank_text_is_empty_result() {
        let backend = RecordingBackend::text("   \n");
        let err = client(backend).generate_text("m", "hi", None).await.unwrap_err();
        assert!(matches!(err, ToolverseError::EmptyGenerationResult));
    }

    #[tokio::test]
    async fn text_parts_are_joined() {
        let backend = RecordingBackend::replying(vec![Ok(GenerationResponse {
            parts: vec![ResponsePart::Text("a".into()), ResponsePart::Text("b".into())],
        })]);
        let text = client(backend.clone()).generate_text("m", "hi", None).await.unwrap();
        assert_eq!(text, "ab");
        assert_eq!(backend.taken()[0].output, OutputKind::Text);
    }

    #[tokio::test]
    async fn structured_parses_and_reports_bad_json() {
        let backend = RecordingBackend::text(r#"{"analysis":"ok","categories":[{"name":"Rent","value":900}]}"#);
        let plan: BudgetPlan = client(backend.clone())
            .generate_structured("m", "plan", serde_json::json!({"type": "OBJECT"}))
            .await
            .unwrap();
        assert_eq!(plan.categories[0].name, "Rent");
        assert!(matches!(backend.taken()[0].output, OutputKind::Structured { .. }));

        let backend = RecordingBackend::text("not json");
        let err = client(backend)
            .generate_structured::<BudgetPlan>("m", "plan", serde_json::json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Parse);
    }

    #[tokio::test]
    async fn image_scans_all_parts() {
        let backend = RecordingBackend::replying(vec![Ok(GenerationResponse {
            parts: vec![
                ResponsePart::Text("here you go".into()),
                ResponsePart::Inline(InlineData::new("image/png", vec![1, 2, 3])),
            ],
        })]);
        let img = client(backend.clone()).generate_image("cat", AspectRatio::Landscape).await.unwrap();
        assert_eq!(img.bytes, vec![1, 2, 3]);
        let req = &backend.taken()[0];
        assert_eq!(req.model, "gemini-2.5-flash-image");
        assert_eq!(
            req.output,
            OutputKind::Image {
                aspect_ratio: AspectRatio::Landscape
            }
        );
    }

    #[tokio::test]
    async fn image_missing_is_reported() {
        let backend = RecordingBackend::text("sorry, no");
        let err = client(backend).generate_image("cat", AspectRatio::Square).await.unwrap_err();
        assert!(matches!(err, ToolverseError::NoImageInResponse));
    }

    #[tokio::test]
    async fn speech_needs_audio_in_first_part() {
        let backend = RecordingBackend::replying(vec![Ok(GenerationResponse {
            parts: vec![ResponsePart::Text("no audio".into())],
        })]);
        let err = client(backend).synthesize_speech("hello", Voice::Kore).await.unwrap_err();
        assert!(matches!(err, ToolverseError::NoAudioInResponse));

        let backend = RecordingBackend::replying(vec![Ok(GenerationResponse {
            parts: vec![ResponsePart::Inline(InlineData::new("audio/L16;rate=24000", vec![0, 0, 255, 127]))],
        })]);
        let clip = client(backend).synthesize_speech("hello", Voice::Puck).await.unwrap();
        assert_eq!(clip.sample_rate, 24_000);
        assert_eq!(clip.pcm.len(), 4);
    }

    #[tokio::test]
    async fn transport_errors_pass_through() {
        let backend = RecordingBackend::replying(vec![Err(ToolverseError::Transport {
            status: Some(500),
            detail: "boom".into(),
        })]);
        let err = client(backend).generate_text("m", "x", None).await.unwrap_err();
        assert!(matches!(err, ToolverseError::Transport { status: Some(500), .. }));
    }
}
