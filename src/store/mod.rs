//! Durable transcript storage.
//!
//! Completed transcripts become [`TranscriptRecord`]s and are written
//! through the [`TranscriptStore`] trait. Writes are idempotent per record
//! id: retrying a failed write re-presents the same record instead of
//! minting a new one.

pub mod backend;
pub mod persister;
pub mod record;
pub mod sqlite;

pub use backend::{MemoryTranscriptStore, TranscriptStore};
pub use persister::Persister;
pub use record::TranscriptRecord;
pub use sqlite::SqliteTranscriptStore;
