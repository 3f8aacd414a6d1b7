use axum::{
    body::Body,
    http::{self, StatusCode},
    response::Response,
};
use serde::de::DeserializeOwned;

use crate::error::rejection;

/// Extractor for JSON request bodies
///
/// Rejects anything that is not declared as JSON, bodies over the limit and
/// payloads that do not match `T`, answering with the gateway error body.
pub struct JsonPayload<T>(pub T);

/// Body limit for speech requests (1 MiB)
const BODY_LIMIT_BYTES: usize = 1 << 20;

fn is_json(headers: &http::HeaderMap) -> bool {
    headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

impl<S, T: DeserializeOwned> axum::extract::FromRequest<S> for JsonPayload<T>
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(request: http::Request<Body>, _state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = request.into_parts();

        if !is_json(&parts.headers) {
            return Err(rejection(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Unsupported Content-Type, expected: 'Content-Type: application/json'".to_string(),
            ));
        }

        let bytes = axum::body::to_bytes(body, BODY_LIMIT_BYTES).await.map_err(|err| {
            if std::error::Error::source(&err)
                .is_some_and(|source| source.is::<http_body_util::LengthLimitError>())
            {
                rejection(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    format!("Request body is too large, limit is {BODY_LIMIT_BYTES} bytes"),
                )
            } else {
                rejection(StatusCode::BAD_REQUEST, format!("Failed to read request body: {err}"))
            }
        })?;

        serde_json::from_slice::<T>(&bytes)
            .map(Self)
            .map_err(|e| rejection(StatusCode::BAD_REQUEST, format!("Failed to parse request body: {e}")))
    }
}
