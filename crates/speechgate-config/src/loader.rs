use std::path::Path;

use secrecy::ExposeSecret;
use url::Url;

use crate::{Config, TtsProviderConfig, TtsProviderType, VoiceConfig};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing, or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if no provider or voice is configured, a voice
    /// references an unknown provider, or a provider/voice carries values
    /// its backend cannot use
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_server_config()?;
        self.validate_providers()?;
        self.validate_voices()?;
        Ok(())
    }

    fn validate_server_config(&self) -> anyhow::Result<()> {
        if self.server.health.enabled && !self.server.health.path.starts_with('/') {
            anyhow::bail!("server.health.path must start with '/'");
        }

        Ok(())
    }

    fn validate_providers(&self) -> anyhow::Result<()> {
        if self.tts.providers.is_empty() {
            anyhow::bail!("at least one TTS provider must be configured");
        }

        for (name, provider) in &self.tts.providers {
            validate_provider(name, provider)?;
        }

        Ok(())
    }

    fn validate_voices(&self) -> anyhow::Result<()> {
        if self.tts.voices.is_empty() {
            anyhow::bail!("at least one voice must be configured");
        }

        for (key, voice) in &self.tts.voices {
            let Some(provider) = self.tts.providers.get(&voice.provider) else {
                anyhow::bail!("voice '{key}' references unknown provider '{}'", voice.provider);
            };

            validate_voice(key, voice, provider.provider_type)?;
        }

        Ok(())
    }
}

fn validate_provider(name: &str, provider: &TtsProviderConfig) -> anyhow::Result<()> {
    match provider.provider_type {
        TtsProviderType::Google => {
            let has_key = provider
                .api_key
                .as_ref()
                .is_some_and(|key| !key.expose_secret().is_empty());

            if !has_key {
                anyhow::bail!("API key required for TTS provider '{name}'");
            }
        }
        TtsProviderType::Coqui => {}
        TtsProviderType::Espeak => {
            let gate = &provider.gate;
            gate.poll_interval()?;
            gate.settle_timeout()?;
            gate.teardown_pause()?;
            gate.acquire_timeout()?;

            if gate.synthesis_timeout()?.is_zero() {
                anyhow::bail!("synthesis_timeout for TTS provider '{name}' must be greater than zero");
            }
        }
    }

    if let Some(ref base_url) = provider.base_url {
        let url = Url::parse(base_url)
            .map_err(|e| anyhow::anyhow!("invalid base_url for TTS provider '{name}': {e}"))?;

        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("base_url for TTS provider '{name}' must be an http(s) URL");
        }
    }

    Ok(())
}

fn validate_voice(key: &str, voice: &VoiceConfig, provider_type: TtsProviderType) -> anyhow::Result<()> {
    match provider_type {
        TtsProviderType::Google => {
            if voice.name.is_none() || voice.language_code.is_none() {
                anyhow::bail!("voice '{key}' needs both `name` and `language_code` for a google provider");
            }
        }
        TtsProviderType::Coqui => {}
        TtsProviderType::Espeak => {
            if !(0.0..=1.0).contains(&voice.volume) {
                anyhow::bail!("voice '{key}' volume must be between 0.0 and 1.0");
            }

            if !voice.rate.is_finite() || voice.rate <= 0.0 {
                anyhow::bail!("voice '{key}' rate must be a positive number");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::Config;

    const OFFLINE: &str = r#"
        [tts.providers.offline]
        type = "espeak"

        [tts.voices.male_standard]
        provider = "offline"
        rate = 150
        volume = 1.0
    "#;

    #[test]
    fn minimal_offline_config() {
        let config = Config::from_toml(OFFLINE).unwrap();
        assert_eq!(config.tts.providers.len(), 1);
        assert_eq!(config.server.audio_dir, std::path::PathBuf::from("generated_audio"));
        assert!(config.server.health.enabled);
    }

    #[test]
    fn voices_keep_declaration_order() {
        let raw = format!(
            "{OFFLINE}
            [tts.voices.male_slow]
            provider = \"offline\"
            rate = 130

            [tts.voices.male_fast]
            provider = \"offline\"
            rate = 170
            "
        );

        let config = Config::from_toml(&raw).unwrap();
        let keys: Vec<_> = config.tts.voices.keys().map(String::as_str).collect();
        assert_eq!(keys, ["male_standard", "male_slow", "male_fast"]);
    }

    #[test]
    fn no_providers_rejected() {
        let err = Config::from_toml("").unwrap_err();
        assert!(err.to_string().contains("at least one TTS provider"));
    }

    #[test]
    fn no_voices_rejected() {
        let raw = r#"
            [tts.providers.offline]
            type = "espeak"
        "#;

        let err = Config::from_toml(raw).unwrap_err();
        assert!(err.to_string().contains("at least one voice"));
    }

    #[test]
    fn unknown_provider_reference_rejected() {
        let raw = format!(
            "{OFFLINE}
            [tts.voices.male_deep]
            provider = \"neural\"
            "
        );

        let err = Config::from_toml(&raw).unwrap_err();
        assert!(err.to_string().contains("unknown provider 'neural'"));
    }

    #[test]
    fn volume_out_of_range_rejected() {
        let raw = r#"
            [tts.providers.offline]
            type = "espeak"

            [tts.voices.loud]
            provider = "offline"
            volume = 1.5
        "#;

        let err = Config::from_toml(raw).unwrap_err();
        assert!(err.to_string().contains("volume"));
    }

    #[test]
    fn google_requires_api_key() {
        let raw = r#"
            [tts.providers.google]
            type = "google"

            [tts.voices.male_news]
            provider = "google"
            language_code = "en-US"
            name = "en-US-Neural2-D"
        "#;

        let err = Config::from_toml(raw).unwrap_err();
        assert!(err.to_string().contains("API key required"));
    }

    #[test]
    fn google_voice_requires_name() {
        let raw = r#"
            [tts.providers.google]
            type = "google"
            api_key = "test-key"

            [tts.voices.male_news]
            provider = "google"
            language_code = "en-US"
        "#;

        let err = Config::from_toml(raw).unwrap_err();
        assert!(err.to_string().contains("male_news"));
    }

    #[test]
    fn api_key_from_environment() {
        let raw = r#"
            [tts.providers.google]
            type = "google"
            api_key = "{{ env.SG_GOOGLE_KEY }}"

            [tts.voices.female_news]
            provider = "google"
            language_code = "en-US"
            name = "en-US-Neural2-F"
            gender = "female"
        "#;

        temp_env::with_var("SG_GOOGLE_KEY", Some("from-env"), || {
            use secrecy::ExposeSecret;

            let config = Config::from_toml(raw).unwrap();
            let key = config.tts.providers["google"].api_key.as_ref().unwrap();
            assert_eq!(key.expose_secret(), "from-env");
        });
    }

    #[test]
    fn invalid_gate_duration_rejected() {
        let raw = r#"
            [tts.providers.offline]
            type = "espeak"

            [tts.providers.offline.gate]
            settle_timeout = "forever"

            [tts.voices.male_standard]
            provider = "offline"
        "#;

        let err = Config::from_toml(raw).unwrap_err();
        assert!(err.to_string().contains("settle_timeout"));
    }

    #[test]
    fn zero_synthesis_timeout_rejected() {
        let raw = r#"
            [tts.providers.offline]
            type = "espeak"

            [tts.providers.offline.gate]
            synthesis_timeout = "0s"

            [tts.voices.male_standard]
            provider = "offline"
        "#;

        let err = Config::from_toml(raw).unwrap_err();
        assert!(err.to_string().contains("synthesis_timeout"));
    }

    #[test]
    fn example_config_is_valid() {
        let raw = include_str!("../../../speechgate.example.toml");

        temp_env::with_vars(
            [
                ("GOOGLE_TTS_API_KEY", Some("example-key")),
                ("COQUI_VCTK_URL", None::<&str>),
                ("COQUI_LJSPEECH_URL", None),
            ],
            || {
                let config = Config::from_toml(raw).unwrap();

                assert_eq!(config.tts.providers.len(), 4);
                assert_eq!(config.tts.voices.len(), 16);
                assert_eq!(
                    config.tts.providers["vctk"].base_url.as_deref(),
                    Some("http://localhost:5002")
                );
                assert_eq!(config.tts.voices["neural_male_british"].speaker.as_deref(), Some("p227"));
            },
        );
    }

    #[test]
    fn base_url_must_be_http() {
        let raw = |url: &str| {
            format!(
                r#"
                [tts.providers.neural]
                type = "coqui"
                base_url = "{url}"

                [tts.voices.male_deep]
                provider = "neural"
                "#
            )
        };

        assert!(Config::from_toml(&raw("http://localhost:5002")).is_ok());

        let err = Config::from_toml(&raw("ftp://localhost")).unwrap_err();
        assert!(err.to_string().contains("http(s)"));

        let err = Config::from_toml(&raw("localhost:5002/api")).unwrap_err();
        assert!(err.to_string().contains("neural"));
    }

    #[test]
    fn unknown_fields_rejected() {
        let raw = format!("{OFFLINE}\n[server]\nport = 8000\n");
        assert!(Config::from_toml(&raw).is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speechgate.toml");
        std::fs::write(&path, OFFLINE).unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.tts.voices.contains_key("male_standard"));
    }

    #[test]
    fn load_missing_file_mentions_path() {
        let err = Config::load(std::path::Path::new("/nonexistent/speechgate.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/speechgate.toml"));
    }
}
