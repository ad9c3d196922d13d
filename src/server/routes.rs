//! Route handlers. There is one: upload an image, get the cleaned image back

use crate::error::{Result, Stage};
use crate::pipeline::Pipeline;
use crate::upload;
use actix_multipart::Multipart;
use actix_web::{post, web, HttpResponse};
use tracing::{debug, info};

#[post("/api/remove-watermark")]
pub async fn remove_watermark(
    payload: Multipart,
    pipeline: web::Data<Pipeline>,
) -> Result<HttpResponse> {
    debug!(stage = ?Stage::Received);

    let image = upload::decode(payload, pipeline.max_upload_bytes()).await?;
    info!(
        "image received, mime type {} ({} bytes)",
        image.mime_type,
        image.size_bytes()
    );
    debug!(stage = ?Stage::Decoded);

    let processed = pipeline.process(&image).await?;
    drop(image);

    debug!(stage = ?Stage::Encoded);
    Ok(HttpResponse::Ok()
        .content_type(processed.content_type)
        .body(processed.bytes))
}
