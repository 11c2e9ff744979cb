//! Persister: records completed transcripts.

use std::sync::Arc;

use tracing::debug;

use crate::defaults;
use crate::error::Result;
use crate::store::backend::TranscriptStore;
use crate::store::record::TranscriptRecord;

/// Writes completed transcripts into one configured table.
///
/// Each call is a single write attempt. On failure the caller decides
/// whether to retry, re-presenting the same record so the store ends up
/// with exactly one copy either way.
#[derive(Clone)]
pub struct Persister {
    store: Arc<dyn TranscriptStore>,
    table: String,
}

impl Persister {
    /// Creates a persister writing to the default table.
    pub fn new(store: Arc<dyn TranscriptStore>) -> Self {
        Self::with_table(store, defaults::TABLE)
    }

    /// Creates a persister writing to a custom table.
    pub fn with_table(store: Arc<dyn TranscriptStore>, table: &str) -> Self {
        Self {
            store,
            table: table.to_string(),
        }
    }

    /// Returns the table this persister writes to.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Writes one record. A single attempt; never regenerates the id.
    pub async fn persist(&self, record: &TranscriptRecord) -> Result<()> {
        debug!(
            id = %record.id,
            chars = record.transcript.len(),
            table = %self.table,
            "persisting transcript"
        );
        self.store.put(&self.table, record).await
    }

    /// Builds a record for `transcript` and writes it, returning the record
    /// (with its minted id) so callers can reference or retry it.
    pub async fn persist_transcript(&self, transcript: &str) -> Result<TranscriptRecord> {
        let record = TranscriptRecord::new(transcript);
        self.persist(&record).await?;
        Ok(record)
    }
}
