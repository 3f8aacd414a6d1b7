#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod error;
pub mod gate;
mod http_client;
mod provider;
mod request;
mod server;
mod storage;
mod types;
mod voices;

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio_util::io::ReaderStream;

pub use error::{Result, TtsError};
pub use provider::TtsProvider;
pub use server::{Server, TtsServerBuilder};
pub use storage::{ArtifactSlot, AudioStore};
pub use types::{AudioFormat, OutputArtifact, SpeechRequest, SpeechResponse, SynthesisRequest, VoiceSummary};
pub use voices::{VoiceCatalog, VoiceProfile};
use request::JsonPayload;

/// Build the speech server from configuration
pub fn build_server(config: &speechgate_config::Config) -> anyhow::Result<Arc<Server>> {
    let server = Arc::new(
        TtsServerBuilder::new(config)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to initialize TTS server: {e}"))?,
    );
    Ok(server)
}

/// Create the endpoint router for speech generation and download
pub fn endpoint_router() -> Router<Arc<Server>> {
    Router::new()
        .route("/generate-speech", post(generate_speech))
        .route("/audio/{filename}", get(download_audio))
        .route("/voices", get(list_voices))
}

/// Handle speech generation requests
async fn generate_speech(
    State(server): State<Arc<Server>>,
    JsonPayload(request): JsonPayload<SpeechRequest>,
) -> Result<Json<SpeechResponse>> {
    tracing::debug!("speech handler called for voice: {}", request.voice_type);

    let response = server.synthesize(request).await?;

    Ok(Json(response))
}

/// Stream a generated audio file
async fn download_audio(State(server): State<Arc<Server>>, Path(filename): Path<String>) -> Result<Response> {
    let (path, format) = server.open_artifact(&filename)?;

    let file = tokio::fs::File::open(&path).await.map_err(|e| {
        tracing::debug!(path = %path.display(), "cannot open audio file: {e}");
        TtsError::ArtifactNotFound(filename.clone())
    })?;

    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.media_type().to_string()),
            (header::CONTENT_DISPOSITION, format!("inline; filename=\"{filename}\"")),
        ],
        body,
    )
        .into_response())
}

/// List the configured voice styles
async fn list_voices(State(server): State<Arc<Server>>) -> Json<Vec<VoiceSummary>> {
    Json(server.voices())
}
