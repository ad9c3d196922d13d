use actix_web::dev::ServerHandle;
use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App, HttpRequest, HttpResponse, HttpServer};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use watermark_service::config::{GeminiConfig, Settings};
use watermark_service::model::gemini::GeminiInvoker;
use watermark_service::model::{ModelInvoker, ModelRequest, Part};
use watermark_service::pipeline::Pipeline;
use watermark_service::server::routes;
use watermark_service::upload::UploadedImage;

const BOUNDARY: &str = "----geminiboundary";

/// What the stand-in Gemini endpoint saw for one call
#[derive(Debug, Clone)]
struct Seen {
    path: String,
    api_key: Option<String>,
    body: Value,
}

/// A canned `generateContent` reply
struct Reply {
    status: StatusCode,
    body: String,
    seen: Mutex<Vec<Seen>>,
}

async fn generate(req: HttpRequest, body: web::Bytes, reply: web::Data<Reply>) -> HttpResponse {
    reply.seen.lock().unwrap().push(Seen {
        path: req.path().to_string(),
        api_key: req
            .headers()
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });
    HttpResponse::build(reply.status)
        .content_type("application/json")
        .body(reply.body.clone())
}

/// Serve `reply` on a random local port, returning the api base to use
fn start_upstream(reply: Reply) -> (String, web::Data<Reply>, ServerHandle) {
    let reply = web::Data::new(reply);
    let data = reply.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .default_service(web::to(generate))
    })
    .workers(1)
    .disable_signals()
    .bind(("127.0.0.1", 0))
    .unwrap();

    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);

    (format!("http://{addr}/v1beta"), reply, handle)
}

fn reply(status: StatusCode, body: impl Into<String>) -> Reply {
    Reply {
        status,
        body: body.into(),
        seen: Mutex::new(Vec::new()),
    }
}

fn invoker(api_base: String) -> GeminiInvoker {
    GeminiInvoker::new(GeminiConfig {
        api_key: "test-key".into(),
        api_base,
        model: "gemini-test".into(),
    })
    .unwrap()
}

fn request() -> ModelRequest {
    ModelRequest::from_upload(&UploadedImage::new(b"hello".to_vec(), "image/png"))
}

#[actix_web::test]
async fn sends_key_and_payload() {
    let body = json!({
        "candidates": [{
            "content": {
                "parts": [
                    { "text": "cleaned" },
                    { "inlineData": { "mimeType": "image/png", "data": "d29ybGQ=" } }
                ]
            }
        }]
    });
    let (api_base, reply, handle) = start_upstream(reply(StatusCode::OK, body.to_string()));

    let response = invoker(api_base).invoke(&request()).await.unwrap();
    assert_eq!(
        response.candidates[0].parts,
        vec![
            Part::Text("cleaned".into()),
            Part::InlineData {
                data: "d29ybGQ=".into(),
                mime_type: Some("image/png".into())
            }
        ]
    );

    let seen = reply.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].path, "/v1beta/models/gemini-test:generateContent");
    assert_eq!(seen[0].api_key.as_deref(), Some("test-key"));
    let parts = &seen[0].body["contents"][0]["parts"];
    assert_eq!(parts[0]["inlineData"]["mimeType"], json!("image/png"));
    assert_eq!(parts[0]["inlineData"]["data"], json!("aGVsbG8="));
    assert_eq!(
        parts[1]["text"],
        json!("Remove watermarks from the image while preserving image quality and content.")
    );
    assert_eq!(
        seen[0].body["generationConfig"]["responseModalities"],
        json!(["TEXT", "IMAGE"])
    );

    handle.stop(false).await;
}

#[actix_web::test]
async fn error_status_is_err() {
    for status in [StatusCode::UNAUTHORIZED, StatusCode::TOO_MANY_REQUESTS] {
        let long_body = format!(r#"{{"error":{{"message":"{}"}}}}"#, "x".repeat(4000));
        let (api_base, _, handle) = start_upstream(reply(status, long_body));

        let err = invoker(api_base).invoke(&request()).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(status.as_str()), "{msg}");
        assert!(msg.len() < 1000, "error body not truncated: {} chars", msg.len());

        handle.stop(false).await;
    }
}

#[actix_web::test]
async fn unparsable_body_is_err() {
    let (api_base, _, handle) = start_upstream(reply(StatusCode::OK, "<html>oops</html>"));

    let err = invoker(api_base).invoke(&request()).await.unwrap_err();
    assert!(format!("{err:#}").contains("generateContent"));

    handle.stop(false).await;
}

async fn post_image(api_base: String) -> (StatusCode, web::Bytes) {
    let settings = Settings::from_toml("").unwrap();
    let pipeline = web::Data::new(Pipeline::new(Arc::new(invoker(api_base)), &settings));
    let app = test::init_service(
        App::new()
            .app_data(pipeline)
            .service(routes::remove_watermark),
    )
    .await;

    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"image\"; filename=\"a.png\"\r\n\
             Content-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"hello");
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let req = test::TestRequest::post()
        .uri("/api/remove-watermark")
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(body)
        .to_request();
    let res = test::call_service(&app, req).await;
    let status = res.status();
    (status, test::read_body(res).await)
}

#[actix_web::test]
async fn route_hides_upstream_errors() {
    for status in [StatusCode::UNAUTHORIZED, StatusCode::TOO_MANY_REQUESTS] {
        let (api_base, _, handle) = start_upstream(reply(status, r#"{"error":{}}"#));

        let (status, body) = post_image(api_base).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.as_ref(), b"Error processing image");

        handle.stop(false).await;
    }
}

#[actix_web::test]
async fn route_returns_upstream_image() {
    let body = json!({
        "candidates": [{
            "content": {
                "parts": [{ "inline_data": { "mime_type": "image/png", "data": "d29ybGQ=" } }]
            }
        }]
    });
    let (api_base, _, handle) = start_upstream(reply(StatusCode::OK, body.to_string()));

    let (status, body) = post_image(api_base).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_ref(), b"world");

    handle.stop(false).await;
}
