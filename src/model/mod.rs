//! Everything between the decoded upload and the generative model: the request
//! we send, the response we read back, and the seam the provider sits behind

use crate::config;
use crate::upload::UploadedImage;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};

pub mod extract;
pub mod gemini;

pub use extract::{extract_image, ExtractedImage};

/// Sampling parameters sent with every request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_modalities: Vec<String>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        GenerationParams {
            temperature: config::TEMPERATURE,
            top_p: config::TOP_P,
            top_k: config::TOP_K,
            max_output_tokens: config::MAX_OUTPUT_TOKENS,
            response_modalities: config::RESPONSE_MODALITIES
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

/// A one-shot image editing request
#[derive(Clone, PartialEq)]
pub struct ModelRequest {
    /// The uploaded bytes, base 64 encoded
    pub image_base64: String,
    pub mime_type: String,
    pub instruction: String,
    pub generation: GenerationParams,
}

impl ModelRequest {
    pub fn from_upload(upload: &UploadedImage) -> Self {
        ModelRequest {
            image_base64: general_purpose::STANDARD.encode(&upload.bytes),
            mime_type: upload.mime_type.clone(),
            instruction: config::INSTRUCTION.to_string(),
            generation: GenerationParams::default(),
        }
    }
}

impl std::fmt::Debug for ModelRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ModelRequest {{ image: <{} b64 chars>, mime_type: {:?}, instruction: {:?}, generation: {:?} }}",
            self.image_base64.len(),
            self.mime_type,
            self.instruction,
            self.generation
        )
    }
}

/// One segment of a candidate's content
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    /// Base 64 payload, with the mime type the model declared for it
    InlineData {
        data: String,
        mime_type: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    pub parts: Vec<Part>,
}

/// Everything the model sent back, in the order it sent it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    pub candidates: Vec<Candidate>,
}

/// A generative model that can answer a `ModelRequest`. Every call is
/// independent: no conversation state is kept between invocations
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    fn name(&self) -> &str;

    async fn invoke(&self, request: &ModelRequest) -> anyhow::Result<ModelResponse>;
}
