use std::{sync::OnceLock, time::Duration};

use axum::http;
use reqwest::Client;

/// Shared client so every network voice reuses pooled connections
///
/// Synthesis of long passages can take a while on the backend, hence the
/// generous request timeout.
pub fn http_client() -> Client {
    static CLIENT: OnceLock<Client> = OnceLock::new();

    CLIENT
        .get_or_init(|| {
            let mut headers = http::HeaderMap::new();
            headers.insert(http::header::USER_AGENT, http::HeaderValue::from_static("speechgate"));

            Client::builder()
                .timeout(Duration::from_secs(120))
                .connect_timeout(Duration::from_secs(10))
                .pool_idle_timeout(Some(Duration::from_secs(30)))
                .tcp_nodelay(true)
                .default_headers(headers)
                .build()
                .expect("Failed to build default HTTP client")
        })
        .clone()
}
