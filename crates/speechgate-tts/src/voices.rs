use indexmap::IndexMap;
use speechgate_config::{TtsConfig, VoiceConfig};

use crate::{
    error::{Result, TtsError},
    types::VoiceSummary,
};

/// A configured voice style
#[derive(Debug, Clone)]
pub struct VoiceProfile {
    /// Selector clients send as `voice_type`
    pub key: String,
    pub settings: VoiceConfig,
}

impl VoiceProfile {
    pub fn provider(&self) -> &str {
        &self.settings.provider
    }

    /// Display label, falling back to the key with underscores as spaces
    pub fn label(&self) -> String {
        self.settings
            .label
            .clone()
            .unwrap_or_else(|| self.key.replace('_', " "))
    }
}

/// Voice styles in configuration order
#[derive(Debug, Default)]
pub struct VoiceCatalog {
    voices: IndexMap<String, VoiceProfile>,
}

impl VoiceCatalog {
    pub fn from_config(config: &TtsConfig) -> Self {
        let voices = config
            .voices
            .iter()
            .map(|(key, settings)| {
                let profile = VoiceProfile {
                    key: key.clone(),
                    settings: settings.clone(),
                };
                (key.clone(), profile)
            })
            .collect();

        Self { voices }
    }

    /// Look up the voice a client asked for
    pub fn resolve(&self, voice_type: &str) -> Result<&VoiceProfile> {
        self.voices
            .get(voice_type)
            .ok_or_else(|| TtsError::InvalidVoiceSelector(voice_type.to_string()))
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VoiceProfile> {
        self.voices.values()
    }

    pub fn summaries(&self) -> Vec<VoiceSummary> {
        self.iter()
            .map(|voice| VoiceSummary {
                voice_type: voice.key.clone(),
                provider: voice.provider().to_string(),
                label: voice.label(),
            })
            .collect()
    }
}
