use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use watermark_service::config::{GeminiConfig, Settings};
use watermark_service::model::gemini::GeminiInvoker;
use watermark_service::pipeline::Pipeline;
use watermark_service::server::routes;

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load settings")?;
    init_tracing(&settings);

    // A missing key is fatal here rather than on the first request
    let gemini = GeminiConfig::from_settings(&settings)?;
    info!("using model {} at {}", gemini.model, gemini.api_base);

    let invoker = Arc::new(GeminiInvoker::new(gemini)?);
    let pipeline = web::Data::new(Pipeline::new(invoker, &settings));

    let addr = (settings.host.clone(), settings.port);
    info!("listening on {}:{}", addr.0, addr.1);

    HttpServer::new(move || {
        App::new()
            .app_data(pipeline.clone())
            .wrap(middleware::Logger::default())
            .service(routes::remove_watermark)
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}
