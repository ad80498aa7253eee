//! Error types for the roster client

use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client error types
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request failed before a response arrived
    #[cfg(feature = "client")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server returned a non-success status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Credentials rejected or authentication round-trip failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Durable session storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport failure from a non-HTTP gateway
    #[error("Transport error: {0}")]
    Transport(String),
}

impl ClientError {
    /// Text suitable for a transient notification.
    ///
    /// Server and auth errors carry the server-supplied message; everything
    /// else falls back to the display form.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Server { message, .. } => message.clone(),
            ClientError::Auth(message) => message.clone(),
            ClientError::NotFound(what) => format!("{} not found", what),
            other => other.to_string(),
        }
    }

    /// Whether the failure happened below the application protocol
    /// (connection refused, timeout, broken transport).
    pub fn is_transport(&self) -> bool {
        match self {
            #[cfg(feature = "client")]
            ClientError::Http(_) => true,
            ClientError::Transport(_) => true,
            _ => false,
        }
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}

/// Pull a human-readable message out of an error response body.
///
/// The records API answers failures with `{"error": "..."}`; mutation
/// endpoints sometimes use `{"message": "..."}`. Anything else is returned
/// as the raw text.
pub(crate) fn server_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "message"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    body.to_string()
}
