use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use secrecy::SecretString;
use speechgate_config::{Config, TtsProviderConfig, TtsProviderType};

use crate::{
    error::{Result, TtsError},
    gate::GateSettings,
    provider::{TtsProvider, coqui::CoquiProvider, espeak::EspeakProvider, google::GoogleProvider},
    storage::AudioStore,
    types::{AudioFormat, OutputArtifact, SpeechRequest, SpeechResponse, VoiceSummary},
    voices::VoiceCatalog,
};

/// Speech server that routes voice styles to their providers
pub struct Server {
    providers: IndexMap<String, Arc<dyn TtsProvider>>,
    voices: VoiceCatalog,
    store: AudioStore,
}

impl Server {
    /// Assemble a server from already constructed parts
    pub fn new(providers: IndexMap<String, Arc<dyn TtsProvider>>, voices: VoiceCatalog, store: AudioStore) -> Self {
        Self {
            providers,
            voices,
            store,
        }
    }

    /// Generate speech for `request` and store it as a new audio file
    ///
    /// Unknown voices are rejected before any provider is touched.
    pub async fn synthesize(&self, request: SpeechRequest) -> Result<SpeechResponse> {
        if request.text.trim().is_empty() {
            return Err(TtsError::InvalidRequest("text must not be empty".to_string()));
        }

        let voice = self.voices.resolve(&request.voice_type)?;

        let provider = self
            .providers
            .get(voice.provider())
            .ok_or_else(|| TtsError::ProviderNotFound(voice.provider().to_string()))?;

        let slot = self.store.allocate(provider.format());

        tracing::debug!(
            voice_type = %voice.key,
            provider = provider.name(),
            text_len = request.text.len(),
            filename = %slot.filename,
            "generating speech"
        );

        let artifact = provider
            .synthesize(&request.text, voice, &slot.path)
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    voice_type = %voice.key,
                    provider = provider.name(),
                    text_len = request.text.len(),
                    "speech generation failed: {e}"
                );
            })?;

        let artifact = OutputArtifact::verify(artifact.path()).inspect_err(|e| {
            tracing::warn!(voice_type = %voice.key, provider = provider.name(), "speech output rejected: {e}");
        })?;

        tracing::info!(
            voice_type = %voice.key,
            provider = provider.name(),
            bytes = artifact.size(),
            "speech generated: {}",
            slot.filename
        );

        Ok(SpeechResponse::success(&slot.filename))
    }

    /// Locate a previously generated audio file
    pub fn open_artifact(&self, filename: &str) -> Result<(PathBuf, AudioFormat)> {
        self.store.resolve(filename)
    }

    /// Configured voice styles in configuration order
    pub fn voices(&self) -> Vec<VoiceSummary> {
        self.voices.summaries()
    }

    pub fn store(&self) -> &AudioStore {
        &self.store
    }
}

/// Builder for constructing the speech server from configuration
pub struct TtsServerBuilder<'a> {
    config: &'a Config,
}

impl<'a> TtsServerBuilder<'a> {
    pub const fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn build(self) -> Result<Server> {
        let mut providers: IndexMap<String, Arc<dyn TtsProvider>> = IndexMap::new();

        for (name, provider_config) in &self.config.tts.providers {
            tracing::debug!(
                "Initializing TTS provider: {name} ({})",
                provider_config.provider_type.as_str()
            );

            let provider: Arc<dyn TtsProvider> = match provider_config.provider_type {
                TtsProviderType::Google => {
                    let api_key = resolve_api_key(name, provider_config)?;

                    Arc::new(GoogleProvider::new(
                        name.clone(),
                        api_key,
                        provider_config.base_url.clone(),
                    ))
                }
                TtsProviderType::Coqui => {
                    Arc::new(CoquiProvider::new(name.clone(), provider_config.base_url.clone()))
                }
                TtsProviderType::Espeak => {
                    let settings = GateSettings::from_config(&provider_config.gate)?;

                    Arc::new(EspeakProvider::new(
                        name.clone(),
                        provider_config.binary.clone(),
                        settings,
                    ))
                }
            };

            providers.insert(name.clone(), provider);
        }

        let voices = VoiceCatalog::from_config(&self.config.tts);

        for voice in voices.iter() {
            if !providers.contains_key(voice.provider()) {
                return Err(TtsError::ConfigError(format!(
                    "voice '{}' references unknown provider '{}'",
                    voice.key,
                    voice.provider()
                )));
            }
        }

        let store = AudioStore::open(&self.config.server.audio_dir)?;

        tracing::debug!(
            "TTS server initialized with {} provider(s) and {} voice(s)",
            providers.len(),
            voices.len()
        );

        Ok(Server::new(providers, voices, store))
    }
}

fn resolve_api_key(name: &str, config: &TtsProviderConfig) -> Result<SecretString> {
    config
        .api_key
        .clone()
        .ok_or_else(|| TtsError::ConfigError(format!("API key required for TTS provider '{name}'")))
}
