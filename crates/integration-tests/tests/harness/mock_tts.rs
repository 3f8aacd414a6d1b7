//! Mock speech backends for integration tests
//!
//! Serves a Google Cloud Text-to-Speech style `text:synthesize` endpoint and
//! a Coqui `tts-server` style `/api/tts` endpoint from one listener.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use base64::Engine as _;
use tokio_util::sync::CancellationToken;

/// Audio the mock returns from both endpoints
pub const MOCK_MP3: &[u8] = b"ID3\x04mock-mp3-audio";
pub const MOCK_WAV: &[u8] = b"RIFF\x24\x00\x00\x00WAVEmock";

/// Mock TTS backend that records what it receives
pub struct MockTts {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockTtsState>,
}

#[derive(Default)]
struct MockTtsState {
    /// Status to answer with instead of audio
    fail_with: Option<StatusCode>,
    google_requests: Mutex<Vec<(Option<String>, serde_json::Value)>>,
    coqui_requests: Mutex<Vec<HashMap<String, String>>>,
}

impl MockTts {
    /// Start the mock server, returning immediately
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_inner(None).await
    }

    /// Start a mock server that answers every request with `status`
    pub async fn start_failing(status: StatusCode) -> anyhow::Result<Self> {
        Self::start_inner(Some(status)).await
    }

    async fn start_inner(fail_with: Option<StatusCode>) -> anyhow::Result<Self> {
        let state = Arc::new(MockTtsState {
            fail_with,
            ..MockTtsState::default()
        });

        let app = Router::new()
            .route("/v1/text:synthesize", routing::post(handle_google))
            .route("/api/tts", routing::get(handle_coqui))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for a Google provider, including the API version
    pub fn google_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Base URL for a Coqui provider
    pub fn coqui_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// API key header and JSON body of every Google request
    pub fn google_requests(&self) -> Vec<(Option<String>, serde_json::Value)> {
        self.state.google_requests.lock().unwrap().clone()
    }

    /// Query parameters of every Coqui request
    pub fn coqui_requests(&self) -> Vec<HashMap<String, String>> {
        self.state.coqui_requests.lock().unwrap().clone()
    }
}

impl Drop for MockTts {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn failure(status: StatusCode) -> Response {
    let body = serde_json::json!({
        "error": { "code": status.as_u16(), "message": "mock failure", "status": "FAILED" }
    });
    (status, Json(body)).into_response()
}

async fn handle_google(
    State(state): State<Arc<MockTtsState>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let api_key = headers
        .get("x-goog-api-key")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    state.google_requests.lock().unwrap().push((api_key, body));

    if let Some(status) = state.fail_with {
        return failure(status);
    }

    let audio_content = base64::engine::general_purpose::STANDARD.encode(MOCK_MP3);
    Json(serde_json::json!({ "audioContent": audio_content })).into_response()
}

async fn handle_coqui(
    State(state): State<Arc<MockTtsState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.coqui_requests.lock().unwrap().push(query);

    if let Some(status) = state.fail_with {
        return failure(status);
    }

    ([(axum::http::header::CONTENT_TYPE, "audio/wav")], MOCK_WAV).into_response()
}
