use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;

use crate::{cors::CorsConfig, health::HealthConfig};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub listen_address: Option<SocketAddr>,
    /// Directory generated audio is written to and served from
    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub cors: Option<CorsConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: None,
            audio_dir: default_audio_dir(),
            health: HealthConfig::default(),
            cors: None,
        }
    }
}

fn default_audio_dir() -> PathBuf {
    PathBuf::from("generated_audio")
}
