//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;
use std::path::Path;

use secrecy::SecretString;
use speechgate_config::{
    Config, CorsConfig, GateConfig, HealthConfig, ServerConfig, TtsConfig, TtsProviderConfig, TtsProviderType,
    VoiceConfig,
};

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with minimal defaults
    pub fn new() -> Self {
        Self {
            config: Config {
                server: ServerConfig {
                    listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                    health: HealthConfig {
                        enabled: true,
                        ..HealthConfig::default()
                    },
                    ..ServerConfig::default()
                },
                tts: TtsConfig::default(),
                telemetry: None,
            },
        }
    }

    fn with_provider(mut self, name: &str, provider: TtsProviderConfig) -> Self {
        self.config.tts.providers.insert(name.to_owned(), provider);
        self
    }

    /// Add a Google provider pointed at a mock backend
    pub fn with_google_provider(self, name: &str, base_url: &str) -> Self {
        self.with_provider(
            name,
            TtsProviderConfig {
                provider_type: TtsProviderType::Google,
                api_key: Some(SecretString::from("test-key")),
                base_url: Some(base_url.to_owned()),
                binary: None,
                gate: GateConfig::default(),
            },
        )
    }

    /// Add a Coqui provider pointed at a mock backend
    pub fn with_coqui_provider(self, name: &str, base_url: &str) -> Self {
        self.with_provider(
            name,
            TtsProviderConfig {
                provider_type: TtsProviderType::Coqui,
                api_key: None,
                base_url: Some(base_url.to_owned()),
                binary: None,
                gate: GateConfig::default(),
            },
        )
    }

    /// Add an espeak provider running `binary` with fast gate timings
    pub fn with_espeak_provider(self, name: &str, binary: &Path) -> Self {
        self.with_provider(
            name,
            TtsProviderConfig {
                provider_type: TtsProviderType::Espeak,
                api_key: None,
                base_url: None,
                binary: Some(binary.to_path_buf()),
                gate: GateConfig {
                    poll_interval: "10ms".to_owned(),
                    settle_timeout: "2s".to_owned(),
                    teardown_pause: "10ms".to_owned(),
                    ..GateConfig::default()
                },
            },
        )
    }

    /// Add a voice style served by `provider`
    pub fn with_voice(mut self, key: &str, provider: &str, customize: impl FnOnce(&mut VoiceConfig)) -> Self {
        let mut voice = voice(provider);
        customize(&mut voice);
        self.config.tts.voices.insert(key.to_owned(), voice);
        self
    }

    /// Set CORS configuration
    pub fn with_cors(mut self, config: CorsConfig) -> Self {
        self.config.server.cors = Some(config);
        self
    }

    /// Disable health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}

/// A voice with every optional setting unset
pub fn voice(provider: &str) -> VoiceConfig {
    VoiceConfig {
        provider: provider.to_owned(),
        label: None,
        language_code: None,
        name: None,
        gender: None,
        pitch: None,
        speaking_rate: None,
        speaker: None,
        rate: 150.0,
        volume: 1.0,
        voice_index: None,
    }
}
