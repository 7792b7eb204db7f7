//! Error types for magpie operations.

use thiserror::Error;

/// Result type alias for magpie operations.
pub type MagpieResult<T> = Result<T, MagpieError>;

/// Main error type for all magpie operations.
#[derive(Error, Debug)]
pub enum MagpieError {
    /// Configuration error. Fatal at startup, never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Database operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Transient source fetch failure. Retried with backoff by the
    /// collector; exhaustion drops that source's items for the cycle.
    #[error("Fetch error from source '{source_name}': {message}")]
    TransientFetch {
        source_name: String,
        message: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MagpieError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            source: None,
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            source: None,
        }
    }

    /// Create a transient fetch error for a named source.
    pub fn fetch(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransientFetch {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Whether this error is fatal at startup (never retried).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Whether this error is worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientFetch { .. })
    }
}

impl From<rusqlite::Error> for MagpieError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}
