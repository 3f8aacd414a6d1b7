use std::path::PathBuf;
use std::time::Duration;

use indexmap::IndexMap;
use secrecy::SecretString;
use serde::Deserialize;

/// Top-level TTS configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TtsConfig {
    /// TTS provider configurations keyed by name
    #[serde(default)]
    pub providers: IndexMap<String, TtsProviderConfig>,
    /// Voice styles keyed by the selector clients send as `voice_type`
    #[serde(default)]
    pub voices: IndexMap<String, VoiceConfig>,
}

/// Configuration for a single TTS provider
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TtsProviderConfig {
    /// Provider type
    #[serde(rename = "type")]
    pub provider_type: TtsProviderType,
    /// API key (cloud providers only)
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<String>,
    /// Path to the speech engine executable (offline providers only)
    #[serde(default)]
    pub binary: Option<PathBuf>,
    /// Engine access discipline (offline providers only)
    #[serde(default)]
    pub gate: GateConfig,
}

/// Supported TTS providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtsProviderType {
    /// Google Cloud Text-to-Speech
    Google,
    /// Coqui `tts-server` running locally
    Coqui,
    /// `espeak-ng`, driven through the synthesis gate
    Espeak,
}

impl TtsProviderType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Coqui => "coqui",
            Self::Espeak => "espeak",
        }
    }
}

/// Timings for serialized access to a stateful engine
///
/// Durations are written as strings such as `"500ms"` or `"2s"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateConfig {
    /// Voice index used when a voice asks for one the engine does not have
    #[serde(default)]
    pub default_voice_index: usize,
    /// Interval between output file size checks while draining
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,
    /// Upper bound on waiting for the output file to stop growing
    #[serde(default = "default_settle_timeout")]
    pub settle_timeout: String,
    /// Pause after teardown before the next request may create an engine
    #[serde(default = "default_teardown_pause")]
    pub teardown_pause: String,
    /// Give up waiting for the gate after this long (unbounded when unset)
    #[serde(default)]
    pub acquire_timeout: Option<String>,
    /// Kill an engine run that has not finished after this long
    #[serde(default = "default_synthesis_timeout")]
    pub synthesis_timeout: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            default_voice_index: 0,
            poll_interval: default_poll_interval(),
            settle_timeout: default_settle_timeout(),
            teardown_pause: default_teardown_pause(),
            acquire_timeout: None,
            synthesis_timeout: default_synthesis_timeout(),
        }
    }
}

impl GateConfig {
    /// Parsed [`Self::poll_interval`]
    pub fn poll_interval(&self) -> anyhow::Result<Duration> {
        parse_duration("poll_interval", &self.poll_interval)
    }

    /// Parsed [`Self::settle_timeout`]
    pub fn settle_timeout(&self) -> anyhow::Result<Duration> {
        parse_duration("settle_timeout", &self.settle_timeout)
    }

    /// Parsed [`Self::teardown_pause`]
    pub fn teardown_pause(&self) -> anyhow::Result<Duration> {
        parse_duration("teardown_pause", &self.teardown_pause)
    }

    /// Parsed [`Self::synthesis_timeout`]
    pub fn synthesis_timeout(&self) -> anyhow::Result<Duration> {
        parse_duration("synthesis_timeout", &self.synthesis_timeout)
    }

    /// Parsed [`Self::acquire_timeout`]
    pub fn acquire_timeout(&self) -> anyhow::Result<Option<Duration>> {
        self.acquire_timeout
            .as_deref()
            .map(|value| parse_duration("acquire_timeout", value))
            .transpose()
    }
}

fn parse_duration(field: &str, value: &str) -> anyhow::Result<Duration> {
    duration_str::parse(value).map_err(|e| anyhow::anyhow!("invalid duration for {field} '{value}': {e}"))
}

fn default_poll_interval() -> String {
    "50ms".to_string()
}

fn default_settle_timeout() -> String {
    "5s".to_string()
}

fn default_teardown_pause() -> String {
    "200ms".to_string()
}

fn default_synthesis_timeout() -> String {
    "120s".to_string()
}

/// A voice style clients can select
///
/// Which fields matter depends on the provider the voice points at.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoiceConfig {
    /// Name of the provider in `[tts.providers]`
    pub provider: String,
    /// Human readable label shown by the voice listing
    #[serde(default)]
    pub label: Option<String>,

    /// BCP-47 language code (cloud)
    #[serde(default)]
    pub language_code: Option<String>,
    /// Provider voice name, e.g. `en-US-Wavenet-D` (cloud)
    #[serde(default)]
    pub name: Option<String>,
    /// Requested voice gender (cloud)
    #[serde(default)]
    pub gender: Option<VoiceGender>,
    /// Pitch shift in semitones (cloud)
    #[serde(default)]
    pub pitch: Option<f64>,
    /// Speaking rate multiplier (cloud)
    #[serde(default)]
    pub speaking_rate: Option<f64>,

    /// Speaker id for multi-speaker models (neural)
    #[serde(default)]
    pub speaker: Option<String>,

    /// Words per minute (offline)
    #[serde(default = "default_rate")]
    pub rate: f32,
    /// Output volume between 0.0 and 1.0 (offline)
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Index into the engine's installed voices (offline)
    #[serde(default)]
    pub voice_index: Option<usize>,
}

/// Voice gender hint for cloud providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceGender {
    Male,
    Female,
    Neutral,
}

#[allow(clippy::missing_const_for_fn)]
fn default_rate() -> f32 {
    150.0
}

#[allow(clippy::missing_const_for_fn)]
fn default_volume() -> f32 {
    1.0
}
