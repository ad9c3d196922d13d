//! The per-request chain: decoded upload -> model request -> model -> image.
//! A `Pipeline` holds no per-request state and is shared by every worker

use crate::config::{ContentTypeSource, Settings};
use crate::error::{PipelineError, Result, Stage};
use crate::model::{extract_image, ModelInvoker, ModelRequest};
use crate::upload::UploadedImage;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// The final image and the content type to send it with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

pub struct Pipeline {
    invoker: Arc<dyn ModelInvoker>,
    timeout: Duration,
    max_upload_bytes: usize,
    content_type_source: ContentTypeSource,
}

impl Pipeline {
    pub fn new(invoker: Arc<dyn ModelInvoker>, settings: &Settings) -> Self {
        Pipeline {
            invoker,
            timeout: settings.upstream_timeout(),
            max_upload_bytes: settings.max_upload_bytes,
            content_type_source: settings.content_type_source,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Send the upload through the model and pull the edited image back out
    pub async fn process(&self, upload: &UploadedImage) -> Result<ProcessedImage> {
        let request = ModelRequest::from_upload(upload);
        debug!(stage = ?Stage::RequestBuilt, model = self.invoker.name());

        let response = tokio::time::timeout(self.timeout, self.invoker.invoke(&request))
            .await
            .map_err(|_| PipelineError::UpstreamTimeout(self.timeout))?
            .map_err(PipelineError::UpstreamFailure)?;
        debug!(
            stage = ?Stage::Invoked,
            candidates = response.candidates.len()
        );

        let image = extract_image(&response, &upload.mime_type)?;
        debug!(stage = ?Stage::Extracted, model_mime_type = %image.mime_type);

        let content_type = match self.content_type_source {
            ContentTypeSource::Upload => upload.mime_type.clone(),
            ContentTypeSource::Model => image.mime_type,
        };
        info!(
            "processed image extracted ({} bytes, {content_type})",
            image.bytes.len()
        );

        Ok(ProcessedImage {
            bytes: image.bytes,
            content_type,
        })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("invoker", &self.invoker.name())
            .field("timeout", &self.timeout)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("content_type_source", &self.content_type_source)
            .finish()
    }
}
