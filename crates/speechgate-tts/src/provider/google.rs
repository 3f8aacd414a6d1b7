use std::path::Path;

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use speechgate_config::VoiceGender;

use crate::{
    error::{Result, TtsError},
    http_client::http_client,
    types::{AudioFormat, OutputArtifact},
    voices::VoiceProfile,
};

use super::{TtsProvider, api_error, write_artifact};

const DEFAULT_GOOGLE_API_URL: &str = "https://texttospeech.googleapis.com/v1";

/// Google Cloud Text-to-Speech provider
pub(crate) struct GoogleProvider {
    client: Client,
    base_url: String,
    api_key: SecretString,
    name: String,
}

impl GoogleProvider {
    pub fn new(name: String, api_key: SecretString, base_url: Option<String>) -> Self {
        let client = http_client();
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_GOOGLE_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            client,
            base_url,
            api_key,
            name,
        }
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(serde::Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ssml_gender: Option<&'static str>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
    pitch: f64,
    speaking_rate: f64,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

const fn ssml_gender(gender: VoiceGender) -> &'static str {
    match gender {
        VoiceGender::Male => "MALE",
        VoiceGender::Female => "FEMALE",
        VoiceGender::Neutral => "NEUTRAL",
    }
}

fn build_request<'a>(text: &'a str, voice: &'a VoiceProfile) -> SynthesizeRequest<'a> {
    let settings = &voice.settings;

    SynthesizeRequest {
        input: SynthesisInput { text },
        voice: VoiceSelection {
            language_code: settings.language_code.as_deref().unwrap_or("en-US"),
            name: settings.name.as_deref(),
            ssml_gender: settings.gender.map(ssml_gender),
        },
        audio_config: AudioConfig {
            audio_encoding: "MP3",
            pitch: settings.pitch.unwrap_or(0.0),
            speaking_rate: settings.speaking_rate.unwrap_or(1.0),
        },
    }
}

#[async_trait]
impl TtsProvider for GoogleProvider {
    async fn synthesize(&self, text: &str, voice: &VoiceProfile, output: &Path) -> Result<OutputArtifact> {
        let url = format!("{}/text:synthesize", self.base_url);

        tracing::debug!(
            "Google TTS request: voice={}, name={:?}, input_len={}",
            voice.key,
            voice.settings.name,
            text.len(),
        );

        let response = self
            .client
            .post(&url)
            .header("X-Goog-Api-Key", self.api_key.expose_secret())
            .json(&build_request(text, voice))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Google TTS request failed: {e}");
                TtsError::ConnectionError(format!("Failed to send request to Google TTS: {e}"))
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

            tracing::error!("Google TTS API error ({status}): {error_text}");

            return Err(api_error(status.as_u16(), error_text));
        }

        let body: SynthesizeResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Google TTS response: {e}");
            TtsError::InternalError(None)
        })?;

        let audio = base64::engine::general_purpose::STANDARD
            .decode(body.audio_content.as_bytes())
            .map_err(|e| {
                tracing::error!("Google TTS returned invalid base64 audio: {e}");
                TtsError::SynthesisFailure("provider returned undecodable audio".to_string())
            })?;

        tracing::debug!("Google TTS synthesis complete, {} bytes", audio.len());

        write_artifact(output, &audio).await
    }

    fn format(&self) -> AudioFormat {
        AudioFormat::Mp3
    }

    fn name(&self) -> &str {
        &self.name
    }
}
