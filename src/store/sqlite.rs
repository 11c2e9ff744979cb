//! SQLite transcript store.
//!
//! One pooled connection set per process; tables are created on demand so a
//! fresh deployment needs no migration step before its first write.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::debug;

use crate::error::{Result, ScribedError};
use crate::store::backend::TranscriptStore;
use crate::store::record::TranscriptRecord;

/// Transcript store backed by a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteTranscriptStore {
    pool: SqlitePool,
}

impl SqliteTranscriptStore {
    /// Opens (creating if missing) the database at `database_url`, e.g.
    /// `sqlite:/var/lib/scribed/transcripts.db`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        if let Some(path) = database_url.strip_prefix("sqlite:") {
            if let Some(parent) = Path::new(path).parent() {
                std::fs::create_dir_all(parent).ok();
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| ScribedError::PersistenceFailed {
                message: format!("Invalid database URL: {}", e),
                retryable: false,
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(persistence_error)?;

        debug!(url = %database_url, "opened transcript database");
        Ok(Self { pool })
    }

    /// Reads one record back; mainly useful for tooling and tests.
    pub async fn fetch(&self, table: &str, id: &str) -> Result<Option<TranscriptRecord>> {
        let table = validated_table(table)?;
        self.ensure_table(table).await?;
        let record = sqlx::query_as::<_, TranscriptRecord>(&format!(
            "SELECT id, transcript, timestamp FROM {} WHERE id = ?",
            table
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence_error)?;
        Ok(record)
    }

    /// Number of records in a table.
    pub async fn count(&self, table: &str) -> Result<i64> {
        let table = validated_table(table)?;
        self.ensure_table(table).await?;
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await
            .map_err(persistence_error)?;
        Ok(count)
    }

    async fn ensure_table(&self, table: &str) -> Result<()> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             id TEXT PRIMARY KEY, \
             transcript TEXT NOT NULL, \
             timestamp INTEGER NOT NULL)",
            table
        ))
        .execute(&self.pool)
        .await
        .map_err(persistence_error)?;
        Ok(())
    }
}

#[async_trait]
impl TranscriptStore for SqliteTranscriptStore {
    async fn put(&self, table: &str, record: &TranscriptRecord) -> Result<()> {
        let table = validated_table(table)?;
        self.ensure_table(table).await?;
        sqlx::query(&format!(
            "INSERT INTO {} (id, transcript, timestamp) VALUES (?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
             transcript = excluded.transcript, timestamp = excluded.timestamp",
            table
        ))
        .bind(&record.id)
        .bind(&record.transcript)
        .bind(record.timestamp)
        .execute(&self.pool)
        .await
        .map_err(persistence_error)?;
        Ok(())
    }
}

/// Table names are interpolated into SQL, so they are restricted to plain
/// identifiers instead of being escaped.
fn validated_table(table: &str) -> Result<&str> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(table)
    } else {
        Err(ScribedError::PersistenceFailed {
            message: format!("Invalid table name: {:?}", table),
            retryable: false,
        })
    }
}

/// Maps a sqlx failure onto the persistence error, marking transient
/// pool/connection conditions as retryable.
fn persistence_error(e: sqlx::Error) -> ScribedError {
    let retryable = matches!(
        e,
        sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    );
    ScribedError::PersistenceFailed {
        message: e.to_string(),
        retryable,
    }
}
