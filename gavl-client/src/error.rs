//! Error types for the GAVL client.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the verdict service or the identity backend.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport error (connection refused, DNS, TLS, body decode)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response from the verdict service
    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    /// Error reported by the identity/database service.
    ///
    /// Displays the upstream message verbatim so callers can match on it.
    #[error("{message}")]
    Identity { status: Option<u16>, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build an identity error from an upstream message.
    pub fn identity(message: impl Into<String>) -> Self {
        Error::Identity {
            status: None,
            message: message.into(),
        }
    }

    /// HTTP status attached to this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Status { status, .. } => Some(*status),
            Error::Identity { status, .. } => *status,
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
