//! Gemini `generateContent` over reqwest.
//!
//! `POST {endpoint}/models/{model}:generateContent` with the inline part (if
//! any) ahead of the instruction text. The key travels in the
//! `x-goog-api-key` header so it never shows up in a URL or an error. Non-2xx answers become
//! [`ToolverseError::Transport`] carrying the service's own message.

use super::wire::{
    Blob, Content, ErrorEnvelope, GenerateRequest, GenerateResponse, GenerationConfig, ImageConfig, Part,
    PrebuiltVoiceConfig, SpeechConfig, VoiceConfig,
};
use super::{GenerationBackend, GenerationRequest, GenerationResponse, InlineData, OutputKind, ResponsePart};
use crate::error::ToolverseError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use tracing::{debug, warn};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Production [`GenerationBackend`].
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, model)
    }
}

fn to_wire(request: &GenerationRequest) -> GenerateRequest {
    let mut parts = Vec::with_capacity(2);
    if let Some(inline) = &request.inline {
        parts.push(Part {
            text: None,
            inline_data: Some(Blob {
                mime_type: inline.media_type.clone(),
                data: STANDARD.encode(&inline.bytes),
            }),
        });
    }
    parts.push(Part {
        text: Some(request.instruction.clone()),
        inline_data: None,
    });

    let generation_config = match &request.output {
        OutputKind::Text => None,
        OutputKind::Structured { schema } => Some(GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(schema.clone()),
            ..Default::default()
        }),
        OutputKind::Image { aspect_ratio } => Some(GenerationConfig {
            image_config: Some(ImageConfig {
                aspect_ratio: aspect_ratio.label().to_string(),
            }),
            ..Default::default()
        }),
        OutputKind::Audio { voice } => Some(GenerationConfig {
            response_modalities: Some(vec!["AUDIO".to_string()]),
            speech_config: Some(SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig {
                        voice_name: voice.label().to_string(),
                    },
                },
            }),
            ..Default::default()
        }),
    };

    GenerateRequest {
        contents: vec![Content { parts }],
        generation_config,
    }
}

fn from_wire(response: GenerateResponse) -> Result<GenerationResponse, ToolverseError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Ok(GenerationResponse::default());
    };
    let mut parts = Vec::with_capacity(candidate.content.parts.len());
    for part in candidate.content.parts {
        if let Some(blob) = part.inline_data {
            let bytes = STANDARD.decode(blob.data.trim()).map_err(|e| ToolverseError::Transport {
                status: None,
                detail: format!("invalid base64 in inline {} data: {e}", blob.mime_type),
            })?;
            parts.push(ResponsePart::Inline(InlineData::new(blob.mime_type, bytes)));
        } else if let Some(text) = part.text {
            parts.push(ResponsePart::Text(text));
        }
    }
    Ok(GenerationResponse { parts })
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ToolverseError> {
        let body = to_wire(&request);
        debug!(
            "POST {}/models/{}:generateContent (inline: {:?})",
            self.endpoint, request.model, request.inline
        );

        let response = self
            .client
            .post(self.url(&request.model))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let detail = match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(env) => match env.error.status {
                    Some(s) => format!("{s}: {}", env.error.message),
                    None => env.error.message,
                },
                Err(_) => format!("HTTP {status}: {}", text.trim()),
            };
            warn!("Generation request failed: {}", detail);
            return Err(ToolverseError::Transport {
                status: Some(status.as_u16()),
                detail,
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&text).map_err(|e| ToolverseError::Transport {
            status: Some(status.as_u16()),
            detail: format!("unreadable response body: {e}"),
        })?;
        from_wire(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{AspectRatio, Voice};

    #[test]
    fn inline_goes_first() {
        let req = GenerationRequest::new("m", "Summarise").with_inline(Some(InlineData::new("application/pdf", b"%PDF".to_vec())));
        let v = serde_json::to_value(to_wire(&req)).unwrap();
        let parts = &v["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "application/pdf");
        assert_eq!(parts[0]["inlineData"]["data"], "JVBERg==");
        assert_eq!(parts[1]["text"], "Summarise");
        assert!(v.get("generationConfig").is_none());
    }

    #[test]
    fn output_kinds_map_to_config() {
        let img = GenerationRequest::new("m", "cat").with_output(OutputKind::Image {
            aspect_ratio: AspectRatio::Portrait,
        });
        let v = serde_json::to_value(to_wire(&img)).unwrap();
        assert_eq!(v["generationConfig"]["imageConfig"]["aspectRatio"], "9:16");

        let tts = GenerationRequest::new("m", "hi").with_output(OutputKind::Audio { voice: Voice::Puck });
        let v = serde_json::to_value(to_wire(&tts)).unwrap();
        assert_eq!(v["generationConfig"]["responseModalities"][0], "AUDIO");

        let json = GenerationRequest::new("m", "plan").with_output(OutputKind::Structured {
            schema: serde_json::json!({"type": "OBJECT"}),
        });
        let v = serde_json::to_value(to_wire(&json)).unwrap();
        assert_eq!(v["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(v["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn response_parts_decoded() {
        let raw: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"hi"},{"inlineData":{"mimeType":"image/png","data":"AQID"}}]}}]}"#,
        )
        .unwrap();
        let r = from_wire(raw).unwrap();
        assert_eq!(r.text(), "hi");
        assert_eq!(r.first_inline().unwrap().bytes, vec![1, 2, 3]);
    }

    #[test]
    fn no_candidates_is_empty() {
        let raw: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(from_wire(raw).unwrap().parts.is_empty());
    }

    #[test]
    fn url_never_carries_key() {
        let c = GeminiClient::new("k", "http://localhost:1/v1beta/");
        assert_eq!(c.url("gemini-2.5-flash"), "http://localhost:1/v1beta/models/gemini-2.5-flash:generateContent");
    }

    #[tokio::test]
    async fn unreachable_endpoint_keeps_key_out_of_messages() {
        let c = GeminiClient::new("SECRETKEY123", "http://127.0.0.1:1/v1beta");
        let err = c.generate(GenerationRequest::new("m", "hi")).await.unwrap_err();
        assert!(matches!(err, ToolverseError::Transport { .. }));
        assert!(!err.to_string().contains("SECRETKEY123"), "got: {err}");
        assert!(!err.user_message().contains("SECRETKEY123"), "got: {}", err.user_message());
    }
}
