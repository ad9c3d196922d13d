//! Pulls the uploaded image out of a multipart form

use crate::error::{PipelineError, Result};
use actix_multipart::{Field, Multipart, MultipartError};
use anyhow::anyhow;
use tokio_stream::StreamExt;
use tracing::debug;

/// Name of the multipart field carrying the image
pub const IMAGE_FIELD: &str = "image";

/// Mime type assumed when the image field declares none
pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// An image as received from the client, held fully in memory for the
/// duration of one request
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl UploadedImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        UploadedImage {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

impl std::fmt::Debug for UploadedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "UploadedImage {{ bytes: <{} bytes>, mime_type: {:?} }}",
            self.bytes.len(),
            self.mime_type
        )
    }
}

/// Read the `image` field from a multipart form. Other fields are skipped.
/// A missing or empty `image` field is a `MissingImage` error, and so is a
/// form with no parts at all. An `image` field that is not a file is malformed
pub async fn decode(mut payload: Multipart, max_bytes: usize) -> Result<UploadedImage> {
    let mut seen_field = false;
    while let Some(field) = payload.next().await {
        let mut field = match field {
            Ok(field) => field,
            // An empty form is just the closing boundary
            Err(MultipartError::Incomplete) if !seen_field => {
                return Err(PipelineError::MissingImage)
            }
            Err(e) => return Err(PipelineError::MalformedUpload(anyhow!("{e}"))),
        };
        seen_field = true;

        let disposition = field.content_disposition();
        if disposition.get_name() != Some(IMAGE_FIELD) {
            debug!("skipping form field {:?}", disposition.get_name());
            drain(&mut field).await?;
            continue;
        }
        if disposition.get_filename().is_none() {
            return Err(PipelineError::MalformedUpload(anyhow!(
                "`{IMAGE_FIELD}` field is not a file"
            )));
        }

        let mime_type = field
            .content_type()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string());
        let bytes = read_limited(&mut field, max_bytes).await?;

        if bytes.is_empty() {
            return Err(PipelineError::MissingImage);
        }
        return Ok(UploadedImage::new(bytes, mime_type));
    }

    Err(PipelineError::MissingImage)
}

async fn read_limited(field: &mut Field, max_bytes: usize) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| PipelineError::MalformedUpload(anyhow!("{e}")))?;
        if bytes.len() + chunk.len() > max_bytes {
            return Err(PipelineError::UploadTooLarge { limit: max_bytes });
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

async fn drain(field: &mut Field) -> Result<()> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(|e| PipelineError::MalformedUpload(anyhow!("{e}")))?;
    }
    Ok(())
}
