//! Uniform error shape surfaced by the request client.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::transport::TransportFailure;

pub const SERVER_ERROR_MESSAGE: &str = "Server error occurred";
pub const NETWORK_ERROR_MESSAGE: &str = "Network error - please check your connection";
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Failure returned to callers once retries are exhausted or skipped.
///
/// `message` is always human-readable and the only field safe to show to an
/// end user. `status_code` is set only when a response was received;
/// `error_code` only when the transport supplied one. `details` may carry
/// the full server payload and must be sanitized before display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl NormalizedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
            error_code: None,
            details: None,
        }
    }
}

impl std::fmt::Display for NormalizedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status_code {
            Some(status) => write!(f, "{} (HTTP {})", self.message, status),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for NormalizedError {}

/// Maps a final transport failure to a [`NormalizedError`]. Pure.
pub fn normalize(failure: &TransportFailure) -> NormalizedError {
    match failure {
        TransportFailure::HttpStatus { status, body, code } => {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or(SERVER_ERROR_MESSAGE);
            NormalizedError {
                message: message.to_string(),
                status_code: Some(*status),
                error_code: code.clone(),
                details: Some(body.clone()),
            }
        }
        TransportFailure::NoResponse { code } | TransportFailure::Timeout { code } => {
            NormalizedError {
                message: NETWORK_ERROR_MESSAGE.to_string(),
                status_code: None,
                error_code: code.clone(),
                details: None,
            }
        }
        TransportFailure::Other { message } => {
            let message = if message.trim().is_empty() {
                UNEXPECTED_ERROR_MESSAGE
            } else {
                message
            };
            NormalizedError::new(message)
        }
    }
}
