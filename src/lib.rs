//! scribed - Streaming transcription gateway
//!
//! Terminates client audio streams, drives a remote recognition backend, and
//! persists every finished transcript before replying.

// Error handling discipline for library code
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod gateway;
pub mod recognition;
pub mod store;

// Core pipeline (buffer → frames → recognition → transcript)
pub use audio::{AudioBuffer, Chunker};
pub use recognition::{
    MockRecognitionBackend, RecognitionBackend, RecognitionConfig, RecognitionEvent,
    RemoteRecognitionBackend, TranscriptionSession,
};

// Persistence
pub use store::{
    MemoryTranscriptStore, Persister, SqliteTranscriptStore, TranscriptRecord, TranscriptStore,
};

// Gateway
pub use gateway::{GatewayState, router, run_gateway};

// Error handling
pub use error::{Result, ScribedError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
