//! Service configuration. Fixed model parameters live here as constants; the
//! rest is layered from defaults, an optional TOML file and the environment.

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Instruction sent alongside every uploaded image
pub const INSTRUCTION: &str =
    "Remove watermarks from the image while preserving image quality and content.";

pub const TEMPERATURE: f32 = 1.0;
pub const TOP_P: f32 = 0.95;
pub const TOP_K: u32 = 40;
pub const MAX_OUTPUT_TOKENS: u32 = 8192;

/// The model must be allowed to answer with both text and images
pub const RESPONSE_MODALITIES: [&str; 2] = ["TEXT", "IMAGE"];

/// Default log filter, used when `RUST_LOG` is unset
pub const RUST_LOG: &str = "info,actix_web=info";

/// Config file looked up in the working directory when `WATERMARK_CONFIG`
/// is not set
pub const CONFIG_FILE: &str = "watermark.toml";

const ENV_PREFIX: &str = "WATERMARK";
const API_KEY_VAR: &str = "GEMINI_API_KEY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is not set")]
    MissingApiKey,

    #[error("invalid configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Which mime type labels the processed image in the HTTP response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentTypeSource {
    /// Echo the mime type of the uploaded image
    Upload,
    /// Use the mime type the model declared for the returned image
    Model,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub upstream_timeout_secs: u64,
    pub max_upload_bytes: usize,
    pub content_type_source: ContentTypeSource,
    pub log_level: String,
}

impl Settings {
    /// Load settings from every source, highest priority last
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("WATERMARK_CONFIG").unwrap_or_else(|_| CONFIG_FILE.into());
        let config = Self::defaults()?
            .add_source(File::with_name(&path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .set_override_option("api_key", env::var(API_KEY_VAR).ok())?
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Load settings from defaults overlaid with a TOML document only
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config = Self::defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 3000)?
            .set_default("api_base", "https://generativelanguage.googleapis.com/v1beta")?
            .set_default("model", "gemini-2.0-flash-exp-image-generation")?
            .set_default("upstream_timeout_secs", 90)?
            .set_default("max_upload_bytes", 20 * 1024 * 1024)?
            .set_default("content_type_source", "upload")?
            .set_default("log_level", RUST_LOG)?)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

/// Everything the Gemini client needs, including the credential. Built once
/// at startup and handed to the invoker
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
}

impl GeminiConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        Ok(GeminiConfig {
            api_key: api_key.to_string(),
            api_base: settings.api_base.trim().trim_end_matches('/').to_string(),
            model: settings.model.trim().to_string(),
        })
    }
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "GeminiConfig {{ api_key: <redacted>, api_base: {:?}, model: {:?} }}",
            self.api_base, self.model
        )
    }
}
