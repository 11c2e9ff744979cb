//! Immutable audio buffer for a single utterance.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Result, ScribedError};

/// Raw PCM audio for one utterance.
///
/// The bytes are shared behind an `Arc`, so cloning a buffer never copies
/// audio. Once constructed the contents are never mutated; every consumer
/// (framing, retries, logging) observes the same bytes.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    data: Arc<[u8]>,
}

impl AudioBuffer {
    /// Creates a buffer from raw PCM bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { data: bytes.into() }
    }

    /// Creates a buffer from a base64-encoded payload.
    ///
    /// # Returns
    /// `ClientInput` when the payload is not valid base64.
    pub fn from_base64(payload: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| ScribedError::ClientInput {
                message: format!("Invalid base64 audio payload: {}", e),
            })?;
        Ok(Self::new(bytes))
    }

    /// Returns the raw audio bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the buffer length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true when the buffer holds no audio.
    ///
    /// An empty utterance is valid input, not an error.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the audio duration in milliseconds, assuming 16-bit mono
    /// samples at the given rate.
    pub fn duration_ms(&self, sample_rate: u32) -> u64 {
        if sample_rate == 0 {
            return 0;
        }
        (self.data.len() as u64 / 2) * 1000 / sample_rate as u64
    }
}

impl From<Vec<u8>> for AudioBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}
