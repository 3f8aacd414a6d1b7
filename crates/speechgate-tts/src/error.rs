use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TtsError>;

/// Speech service errors with appropriate HTTP status codes
#[derive(Debug, Error)]
pub enum TtsError {
    /// The requested voice style is not configured
    #[error("Invalid voice type: {0}")]
    InvalidVoiceSelector(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The speech engine could not be started
    #[error("Speech engine failed to start: {0}")]
    EngineInitFailure(String),

    /// The engine ran but no usable audio file was produced
    #[error("Speech synthesis failed: {0}")]
    SynthesisFailure(String),

    /// A previously generated audio file does not exist
    #[error("Audio file not found")]
    ArtifactNotFound(String),

    /// Waited too long for exclusive access to the speech engine
    #[error("Speech engine is busy, try again later")]
    GateBusy,

    /// Authentication failed (missing or invalid API key)
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// A voice points at a provider that is not configured
    #[error("Provider '{0}' not found")]
    ProviderNotFound(String),

    /// Provider API returned an error
    #[error("Provider API error ({status}): {message}")]
    ProviderApiError { status: u16, message: String },

    /// Network or connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal server error
    /// If Some(message), it came from a provider and can be shown
    /// If None, it's an internal error and should not leak details
    #[error("Internal server error")]
    InternalError(Option<String>),
}

impl TtsError {
    /// Get the appropriate HTTP status code for this error
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidVoiceSelector(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::ArtifactNotFound(_) => StatusCode::NOT_FOUND,
            Self::GateBusy => StatusCode::SERVICE_UNAVAILABLE,
            Self::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            Self::ConnectionError(_) => StatusCode::BAD_GATEWAY,
            Self::ProviderApiError { status, .. } => match *status {
                400 => StatusCode::BAD_REQUEST,
                401 => StatusCode::UNAUTHORIZED,
                403 => StatusCode::FORBIDDEN,
                429 => StatusCode::TOO_MANY_REQUESTS,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::EngineInitFailure(_)
            | Self::SynthesisFailure(_)
            | Self::ProviderNotFound(_)
            | Self::ConfigError(_)
            | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type string for the response
    pub const fn error_type(&self) -> &str {
        match self {
            Self::InvalidVoiceSelector(_) | Self::InvalidRequest(_) => "invalid_request_error",
            Self::ArtifactNotFound(_) => "not_found_error",
            Self::GateBusy => "overloaded_error",
            Self::AuthenticationFailed(_) => "authentication_error",
            Self::EngineInitFailure(_) | Self::SynthesisFailure(_) => "synthesis_error",
            Self::ConnectionError(_) | Self::ProviderApiError { .. } => "api_error",
            Self::ProviderNotFound(_) | Self::ConfigError(_) | Self::InternalError(_) => "internal_error",
        }
    }

    /// Message that is safe to expose to API consumers
    pub fn client_message(&self) -> String {
        match self {
            Self::InternalError(Some(provider_msg)) => provider_msg.clone(),
            Self::InternalError(None) => "Internal server error".to_string(),
            Self::EngineInitFailure(_) => "Speech engine failed to start".to_string(),
            Self::SynthesisFailure(_) => "Speech synthesis failed".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorDetails,
}

#[derive(Debug, Serialize)]
struct ErrorDetails {
    message: String,
    r#type: String,
    code: u16,
}

fn error_body(status: StatusCode, message: String, error_type: &str) -> Response {
    let error_response = ErrorResponse {
        error: ErrorDetails {
            message,
            r#type: error_type.to_string(),
            code: status.as_u16(),
        },
    };

    (status, Json(error_response)).into_response()
}

/// Error body for requests rejected before they reach a handler
pub(crate) fn rejection(status: StatusCode, message: String) -> Response {
    error_body(status, message, "invalid_request_error")
}

impl IntoResponse for TtsError {
    fn into_response(self) -> Response {
        error_body(self.status_code(), self.client_message(), self.error_type())
    }
}
