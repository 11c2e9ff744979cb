//! Error types for scribed.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScribedError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Client input errors. Displays as the bare message because the text is
    // relayed verbatim to clients in failure replies.
    #[error("{message}")]
    ClientInput { message: String },

    // Recognition errors
    #[error("Recognition failed: {message}")]
    RecognitionFailed { message: String },

    #[error("Recognition stream produced no result within {idle_ms} ms")]
    RecognitionTimeout { idle_ms: u64 },

    // Persistence errors
    #[error("Failed to persist transcript: {message}")]
    PersistenceFailed { message: String, retryable: bool },

    // Gateway session errors
    #[error("Session busy: an utterance is already being finalized")]
    SessionBusy,

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl ScribedError {
    /// True for failures of the recognition stream itself, including the
    /// idle-timeout case.
    pub fn is_recognition_failure(&self) -> bool {
        matches!(
            self,
            ScribedError::RecognitionFailed { .. } | ScribedError::RecognitionTimeout { .. }
        )
    }

    /// True when retrying the same operation with the same inputs may
    /// succeed. Only persistence failures carry this distinction.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScribedError::PersistenceFailed { retryable: true, .. })
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ScribedError>;
