pub mod coqui;
pub mod espeak;
pub mod google;

use std::path::Path;

use async_trait::async_trait;

use crate::{
    error::{Result, TtsError},
    types::{AudioFormat, OutputArtifact},
    voices::VoiceProfile,
};

/// Trait for TTS backend implementations
#[async_trait]
pub trait TtsProvider: Send + Sync {
    /// Synthesize `text` with `voice` into the file at `output`
    async fn synthesize(&self, text: &str, voice: &VoiceProfile, output: &Path) -> Result<OutputArtifact>;

    /// Encoding of the files this provider writes
    fn format(&self) -> AudioFormat;

    /// Get the provider name
    fn name(&self) -> &str;
}

/// Persist audio returned by a network backend
pub(crate) async fn write_artifact(output: &Path, audio: &[u8]) -> Result<OutputArtifact> {
    if audio.is_empty() {
        return Err(TtsError::SynthesisFailure("provider returned no audio".to_string()));
    }

    tokio::fs::write(output, audio).await.map_err(|e| {
        tracing::error!(path = %output.display(), "failed to write audio file: {e}");
        TtsError::InternalError(None)
    })?;

    OutputArtifact::verify(output)
}

/// Map a non-success backend status to an error
pub(crate) fn api_error(status: u16, message: String) -> TtsError {
    match status {
        401 | 403 => TtsError::AuthenticationFailed(message),
        400 => TtsError::InvalidRequest(message),
        _ => TtsError::ProviderApiError { status, message },
    }
}
