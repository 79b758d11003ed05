//! Error handling for the mining simulator
//!
//! A single error type covering configuration, mining, and the HTTP boundary.

use thiserror::Error;

/// Result type alias for mining operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the mining simulator
#[derive(Error, Debug)]
pub enum Error {
    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unrecognized difficulty label
    #[error("Invalid difficulty: {label}")]
    InvalidDifficulty { label: String },

    /// Malformed config file or transactions string
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Every nonce partition was searched without finding a solution
    #[error("Nonce space exhausted after {hashes_tried} hashes")]
    NonceSpaceExhausted { hashes_tried: u64 },

    /// A start request arrived while a mining job was in progress
    #[error("A mining job is already running")]
    JobAlreadyRunning,

    /// Worker errors
    #[error("Worker error: {message}")]
    Worker { message: String },

    /// Cancellation of an in-flight operation
    #[error("Operation was cancelled: {operation}")]
    Cancelled { operation: String },
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid-difficulty error
    pub fn invalid_difficulty(label: impl Into<String>) -> Self {
        Self::InvalidDifficulty {
            label: label.into(),
        }
    }

    /// Create a worker error
    pub fn worker(message: impl Into<String>) -> Self {
        Self::Worker {
            message: message.into(),
        }
    }

    /// Create a cancellation error
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Error::Json(_) => "json",
            Error::Yaml(_) => "yaml",
            Error::Io(_) => "io",
            Error::InvalidDifficulty { .. } => "invalid_difficulty",
            Error::Config { .. } => "config",
            Error::NonceSpaceExhausted { .. } => "nonce_space_exhausted",
            Error::JobAlreadyRunning => "job_already_running",
            Error::Worker { .. } => "worker",
            Error::Cancelled { .. } => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_error_constructors() {
        assert_matches!(Error::config("bad"), Error::Config { .. });
        assert_matches!(
            Error::invalid_difficulty("Impossible"),
            Error::InvalidDifficulty { .. }
        );
        assert_matches!(Error::worker("oops"), Error::Worker { .. });
        assert_matches!(Error::cancelled("mining"), Error::Cancelled { .. });
    }

    #[test]
    fn test_error_display() {
        let err = Error::invalid_difficulty("Impossible");
        assert_eq!(err.to_string(), "Invalid difficulty: Impossible");

        let err = Error::NonceSpaceExhausted { hashes_tried: 42 };
        assert_eq!(err.to_string(), "Nonce space exhausted after 42 hashes");

        assert_eq!(
            Error::JobAlreadyRunning.to_string(),
            "A mining job is already running"
        );
    }

    #[test]
    fn test_error_category() {
        assert_eq!(Error::JobAlreadyRunning.category(), "job_already_running");
        assert_eq!(Error::config("x").category(), "config");
        assert_eq!(
            Error::NonceSpaceExhausted { hashes_tried: 0 }.category(),
            "nonce_space_exhausted"
        );
    }
}
