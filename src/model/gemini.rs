//! `ModelInvoker` backed by the Gemini `generateContent` REST endpoint

use super::{Candidate, ModelInvoker, ModelRequest, ModelResponse, Part};
use crate::config::GeminiConfig;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest slice of an error body kept in the error message
const MAX_ERROR_BODY: usize = 512;

mod protocol {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GenerateContentRequest<'a> {
        pub contents: Vec<Content<'a>>,
        pub generation_config: GenerationConfig<'a>,
    }

    #[derive(Serialize)]
    pub struct Content<'a> {
        pub role: &'static str,
        pub parts: Vec<RequestPart<'a>>,
    }

    #[derive(Serialize)]
    #[serde(untagged)]
    pub enum RequestPart<'a> {
        Inline {
            #[serde(rename = "inlineData")]
            inline_data: Blob<'a>,
        },
        Text {
            text: &'a str,
        },
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Blob<'a> {
        pub mime_type: &'a str,
        pub data: &'a str,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GenerationConfig<'a> {
        pub temperature: f32,
        pub top_p: f32,
        pub top_k: u32,
        pub max_output_tokens: u32,
        pub response_modalities: &'a [String],
    }

    #[derive(Deserialize)]
    pub struct GenerateContentResponse {
        pub candidates: Option<Vec<WireCandidate>>,
    }

    #[derive(Deserialize)]
    pub struct WireCandidate {
        pub content: Option<WireContent>,
    }

    #[derive(Deserialize)]
    pub struct WireContent {
        pub parts: Option<Vec<WirePart>>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct WirePart {
        pub text: Option<String>,
        #[serde(alias = "inline_data")]
        pub inline_data: Option<WireBlob>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct WireBlob {
        #[serde(alias = "mime_type")]
        pub mime_type: Option<String>,
        pub data: Option<String>,
    }
}

use protocol::*;

impl<'a> From<&'a ModelRequest> for GenerateContentRequest<'a> {
    fn from(request: &'a ModelRequest) -> Self {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    RequestPart::Inline {
                        inline_data: Blob {
                            mime_type: &request.mime_type,
                            data: &request.image_base64,
                        },
                    },
                    RequestPart::Text {
                        text: &request.instruction,
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: request.generation.temperature,
                top_p: request.generation.top_p,
                top_k: request.generation.top_k,
                max_output_tokens: request.generation.max_output_tokens,
                response_modalities: &request.generation.response_modalities,
            },
        }
    }
}

impl From<GenerateContentResponse> for ModelResponse {
    fn from(response: GenerateContentResponse) -> Self {
        let candidates = response
            .candidates
            .unwrap_or_default()
            .into_iter()
            .map(|candidate| Candidate {
                parts: candidate
                    .content
                    .and_then(|content| content.parts)
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(Part::from_wire)
                    .collect(),
            })
            .collect();
        ModelResponse { candidates }
    }
}

impl Part {
    /// Parts that carry neither text nor inline data are dropped
    fn from_wire(part: WirePart) -> Option<Part> {
        match (part.inline_data, part.text) {
            (Some(blob), _) => Some(Part::InlineData {
                data: blob.data.unwrap_or_default(),
                mime_type: blob.mime_type,
            }),
            (None, Some(text)) => Some(Part::Text(text)),
            (None, None) => None,
        }
    }
}

pub struct GeminiInvoker {
    config: GeminiConfig,
    http: reqwest::Client,
}

impl GeminiInvoker {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(GeminiInvoker { config, http })
    }

    fn endpoint(&self) -> String {
        let model = self.config.model.as_str();
        let model_path = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        };
        format!("{}/{}:generateContent", self.config.api_base, model_path)
    }
}

impl std::fmt::Debug for GeminiInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GeminiInvoker {{ config: {:?} }}", self.config)
    }
}

#[async_trait]
impl ModelInvoker for GeminiInvoker {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse> {
        let endpoint = self.endpoint();
        debug!("sending image to {endpoint}");

        let response = self
            .http
            .post(&endpoint)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&GenerateContentRequest::from(request))
            .send()
            .await
            .with_context(|| format!("gemini request failed ({endpoint})"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            bail!("gemini returned {status}: {body}");
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .context("gemini response was not a valid generateContent payload")?;
        Ok(body.into())
    }
}
