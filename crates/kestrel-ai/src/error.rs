//! Error types for kestrel-ai

use thiserror::Error;

/// Result type alias using kestrel-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the model provider
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error event or response
    #[error("API error: {message} (type: {error_type})")]
    Api { error_type: String, message: String },

    /// Invalid API key
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    /// Server-sent events error
    #[error("SSE error: {0}")]
    Sse(String),

    /// The stream failed after it was opened
    #[error("Stream error: {0}")]
    Stream(String),

    /// Unexpected response format
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Model not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),
}

impl Error {
    /// Create an API error from type and message
    pub fn api(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            error_type: error_type.into(),
            message: message.into(),
        }
    }
}
