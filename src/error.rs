//! Failures that can end a remove-watermark request

use std::time::Duration;

/// The states a request passes through, in order. A request stops at the
/// first failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Decoded,
    RequestBuilt,
    Invoked,
    Extracted,
    Encoded,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The form had no usable `image` field
    #[error("no image provided")]
    MissingImage,

    #[error("uploaded image exceeds {limit} bytes")]
    UploadTooLarge { limit: usize },

    /// The request body could not be read as multipart form data
    #[error("malformed upload: {0:#}")]
    MalformedUpload(anyhow::Error),

    /// Transport, auth, quota or response-format failure talking to the model
    #[error("upstream model failed: {0:#}")]
    UpstreamFailure(anyhow::Error),

    #[error("upstream model did not answer within {0:?}")]
    UpstreamTimeout(Duration),

    /// The model answered, but without an image
    #[error("no image in model response")]
    NoImageInResponse,
}

impl PipelineError {
    /// The stage at which a request ending in this error stopped
    pub fn failed_at(&self) -> Stage {
        match self {
            PipelineError::MissingImage
            | PipelineError::UploadTooLarge { .. }
            | PipelineError::MalformedUpload(_) => Stage::Decoded,
            PipelineError::UpstreamFailure(_) | PipelineError::UpstreamTimeout(_) => {
                Stage::Invoked
            }
            PipelineError::NoImageInResponse => Stage::Extracted,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
