//! Transcript store contract.
//!
//! This trait allows swapping implementations (SQLite vs in-memory).

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Result, ScribedError};
use crate::store::record::TranscriptRecord;

/// Trait for durable transcript stores.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Writes a record into the named table.
    ///
    /// Put-if-absent-or-overwrite: writing the same id twice leaves exactly
    /// one record, so retried writes are safe.
    async fn put(&self, table: &str, record: &TranscriptRecord) -> Result<()>;
}

/// Implement TranscriptStore for Arc<T> to allow sharing across sessions.
/// `?Sized` keeps `Arc<dyn TranscriptStore>` covered as well.
#[async_trait]
impl<T: TranscriptStore + ?Sized> TranscriptStore for Arc<T> {
    async fn put(&self, table: &str, record: &TranscriptRecord) -> Result<()> {
        (**self).put(table, record).await
    }
}

/// In-memory transcript store for tests and development.
///
/// Keyed by (table, id) with the same overwrite semantics as the real
/// store. Clones share the underlying map, so a test can keep one handle
/// for assertions and hand a clone to the code under test.
#[derive(Debug, Clone, Default)]
pub struct MemoryTranscriptStore {
    tables: Arc<Mutex<HashMap<String, BTreeMap<String, TranscriptRecord>>>>,
    fail_puts: bool,
}

impl MemoryTranscriptStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the store to reject every write.
    pub fn with_failure(mut self) -> Self {
        self.fail_puts = true;
        self
    }

    /// Number of records in a table.
    pub fn len(&self, table: &str) -> usize {
        self.tables
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(table)
            .map_or(0, BTreeMap::len)
    }

    /// True when a table holds no records.
    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    /// All records in a table, ordered by id.
    pub fn records(&self, table: &str) -> Vec<TranscriptRecord> {
        self.tables
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(table)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TranscriptStore for MemoryTranscriptStore {
    async fn put(&self, table: &str, record: &TranscriptRecord) -> Result<()> {
        if self.fail_puts {
            return Err(ScribedError::PersistenceFailed {
                message: "mock store rejected the write".to_string(),
                retryable: true,
            });
        }
        self.tables
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(table.to_string())
            .or_default()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }
}
