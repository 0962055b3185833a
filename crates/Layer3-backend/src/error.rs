//! Backend-specific error types
//!
//! `BackendError` keeps the API and the Codex CLI failure modes apart so the
//! caller can attach the right remedy. Conversion into
//! `cmtr_foundation::Error` keeps timeouts as their own top-level category.

use cmtr_foundation::Error as FoundationError;
use thiserror::Error;

/// Errors raised while generating a commit message
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    /// Request could not be sent, completed, or decoded
    #[error("OpenAI request failed: {0}")]
    Request(String),

    /// API answered with a non-success status
    #[error("OpenAI request failed ({status}): {message}")]
    Api { status: u16, message: String },

    /// API answered but carried no usable text
    #[error("OpenAI response contained no text")]
    EmptyResponse,

    /// Codex CLI could not be launched, exited non-zero, or produced no message
    #[error("{0}")]
    Codex(String),

    /// The configured deadline elapsed
    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: f64 },
}

impl BackendError {
    /// Create from an HTTP status and the error body, digging the message
    /// out of the standard `{"error": {"message": ...}}` envelope when present
    pub fn from_http_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|json| {
                json.get("error")?
                    .get("message")?
                    .as_str()
                    .map(str::to_string)
            })
            .unwrap_or_else(|| body.trim().to_string());
        let message = if message.is_empty() {
            "unknown error".to_string()
        } else {
            message
        };
        BackendError::Api { status, message }
    }

    pub fn request(message: impl Into<String>) -> Self {
        BackendError::Request(message.into())
    }

    pub fn codex(message: impl Into<String>) -> Self {
        BackendError::Codex(message.into())
    }
}

// ============================================================================
// cmtr_foundation::Error conversion
// ============================================================================

impl From<BackendError> for FoundationError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Timeout { seconds } => FoundationError::Timeout { seconds },
            other => FoundationError::Backend(other.to_string()),
        }
    }
}
