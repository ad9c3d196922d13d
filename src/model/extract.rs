//! Finding the edited image in a model response. Only the first candidate is
//! looked at, and within it only the first inline data part

use super::{ModelResponse, Part};
use crate::error::{PipelineError, Result};
use anyhow::Context;
use base64::{engine::general_purpose, Engine as _};
use mime::Mime;

/// The image the model produced
#[derive(Clone, PartialEq, Eq)]
pub struct ExtractedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl std::fmt::Debug for ExtractedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ExtractedImage {{ bytes: <{} bytes>, mime_type: {:?} }}",
            self.bytes.len(),
            self.mime_type
        )
    }
}

/// Decode the first inline image of the first candidate. `fallback_mime` is
/// used when the part does not declare a mime type, or declares one that
/// does not parse
pub fn extract_image(response: &ModelResponse, fallback_mime: &str) -> Result<ExtractedImage> {
    let candidate = response
        .candidates
        .first()
        .ok_or(PipelineError::NoImageInResponse)?;

    let (data, mime_type) = candidate
        .parts
        .iter()
        .find_map(|part| match part {
            Part::InlineData { data, mime_type } if !data.is_empty() => {
                Some((data, mime_type.as_deref()))
            }
            _ => None,
        })
        .ok_or(PipelineError::NoImageInResponse)?;

    let bytes = general_purpose::STANDARD
        .decode(data)
        .context("model returned invalid base 64 image data")
        .map_err(PipelineError::UpstreamFailure)?;

    let mime_type = mime_type
        .and_then(|m| m.trim().parse::<Mime>().ok())
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| fallback_mime.to_string());

    Ok(ExtractedImage { bytes, mime_type })
}
