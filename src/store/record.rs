//! Persisted transcript record.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A completed transcript ready for durable storage.
///
/// The identifier is minted exactly once, when the record is created, and
/// never regenerated. Retrying a failed write re-presents this same record,
/// so a retry can never produce a second copy under a fresh id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TranscriptRecord {
    /// UUID v4 string: 122 bits of cryptographically sourced randomness,
    /// collision-safe without coordination between gateway instances.
    pub id: String,
    /// The final transcript text.
    pub transcript: String,
    /// Creation time, milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl TranscriptRecord {
    /// Creates a record for a completed transcript, minting its id and
    /// capturing the current time.
    pub fn new(transcript: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            transcript: transcript.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}
