//! The HTTP surface. Pipeline errors render themselves as plain-text
//! responses, so handlers can simply `?` them

use crate::error::PipelineError;
use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use tracing::{error, warn};

pub mod protocol;
pub mod routes;

impl actix_web::error::ResponseError for PipelineError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!(failed_at = ?self.failed_at(), "{self}");
        } else {
            warn!(failed_at = ?self.failed_at(), "{self}");
        }

        HttpResponse::build(status)
            .insert_header(ContentType::plaintext())
            .body(protocol::failure_body(self))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::MissingImage => StatusCode::BAD_REQUEST,
            PipelineError::UploadTooLarge { .. }
            | PipelineError::MalformedUpload(_)
            | PipelineError::UpstreamFailure(_)
            | PipelineError::UpstreamTimeout(_)
            | PipelineError::NoImageInResponse => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
