use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;

use crate::{
    error::{Result, TtsError},
    http_client::http_client,
    types::{AudioFormat, OutputArtifact},
    voices::VoiceProfile,
};

use super::{TtsProvider, api_error, write_artifact};

const DEFAULT_COQUI_URL: &str = "http://localhost:5002";

/// Local neural TTS through a Coqui `tts-server`
///
/// The server loads one model, so each model gets its own provider entry.
/// Requests are independent round-trips and need no serialization.
pub(crate) struct CoquiProvider {
    client: Client,
    base_url: String,
    name: String,
}

impl CoquiProvider {
    pub fn new(name: String, base_url: Option<String>) -> Self {
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_COQUI_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            client: http_client(),
            base_url,
            name,
        }
    }
}

#[async_trait]
impl TtsProvider for CoquiProvider {
    async fn synthesize(&self, text: &str, voice: &VoiceProfile, output: &Path) -> Result<OutputArtifact> {
        let url = format!("{}/api/tts", self.base_url);
        let speaker = voice.settings.speaker.as_deref().unwrap_or_default();

        tracing::debug!(
            "Coqui TTS request: voice={}, speaker={speaker:?}, input_len={}",
            voice.key,
            text.len(),
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("text", text),
                ("speaker_id", speaker),
                ("style_wav", ""),
                ("language_id", ""),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Coqui TTS request failed: {e}");
                TtsError::ConnectionError(format!("Failed to send request to Coqui TTS: {e}"))
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

            tracing::error!("Coqui TTS error ({status}): {error_text}");

            return Err(api_error(status.as_u16(), error_text));
        }

        let audio = response.bytes().await.map_err(|e| {
            tracing::error!("Failed to read Coqui TTS response body: {e}");
            TtsError::InternalError(None)
        })?;

        tracing::debug!("Coqui TTS synthesis complete, {} bytes", audio.len());

        write_artifact(output, &audio).await
    }

    fn format(&self) -> AudioFormat {
        AudioFormat::Wav
    }

    fn name(&self) -> &str {
        &self.name
    }
}
