use crate::error::PipelineError;

pub const NO_IMAGE_PROVIDED: &str = "No image provided";
pub const NO_IMAGE_GENERATED: &str = "No image generated";
pub const ERROR_PROCESSING_IMAGE: &str = "Error processing image";

/// The plain-text body sent to the client for a failed request. Anything
/// other than a missing upload or a missing model image shares one body
pub fn failure_body(err: &PipelineError) -> &'static str {
    match err {
        PipelineError::MissingImage => NO_IMAGE_PROVIDED,
        PipelineError::NoImageInResponse => NO_IMAGE_GENERATED,
        PipelineError::UploadTooLarge { .. }
        | PipelineError::MalformedUpload(_)
        | PipelineError::UpstreamFailure(_)
        | PipelineError::UpstreamTimeout(_) => ERROR_PROCESSING_IMAGE,
    }
}
