//! Test server wrapper that starts speechgate on a random port

use std::net::SocketAddr;
use std::path::Path;

use speechgate_config::Config;
use speechgate_server::Server;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// A running test server instance
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    client: reqwest::Client,
    audio_dir: TempDir,
}

impl TestServer {
    /// Start a test server with the given configuration
    ///
    /// Binds to port 0 for automatic port assignment and writes audio into
    /// a scratch directory owned by the returned server.
    pub async fn start(mut config: Config) -> anyhow::Result<Self> {
        let audio_dir = tempfile::tempdir()?;
        config.server.audio_dir = audio_dir.path().to_path_buf();

        config.validate()?;

        let server = Server::new(&config)?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        // Bind the listener here so we know the actual port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            axum::serve(listener, server.into_router())
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        let client = reqwest::Client::new();

        Ok(Self {
            addr,
            shutdown,
            client,
            audio_dir,
        })
    }

    /// Base URL of the running test server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Get a reference to the HTTP client
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Directory generated audio is written to
    pub fn audio_dir(&self) -> &Path {
        self.audio_dir.path()
    }

    /// POST a speech request and return the raw response
    pub async fn generate(&self, text: &str, voice_type: &str) -> reqwest::Response {
        self.client
            .post(self.url("/generate-speech"))
            .json(&serde_json::json!({ "text": text, "voice_type": voice_type }))
            .send()
            .await
            .expect("request reaches test server")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
