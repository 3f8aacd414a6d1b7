#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod cors;
mod env;
pub mod health;
mod loader;
pub mod server;
pub mod telemetry;
pub mod tts;

use serde::Deserialize;

pub use cors::*;
pub use health::*;
pub use server::*;
pub use telemetry::*;
pub use tts::*;

/// Top-level speechgate configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// TTS providers and voice styles
    #[serde(default)]
    pub tts: TtsConfig,
    /// Logging configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}
