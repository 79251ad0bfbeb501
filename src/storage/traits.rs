//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::model::{SeriesHandle, SeriesRecord};
use crate::state::RunState;
use crate::storage::RunRecord;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Corrupt row for '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Implementations must be safe to share between the ingestion run (the single
/// writer) and any number of concurrent readers; every method takes `&self`.
pub trait Storage: Send + Sync {
    // ===== Series =====

    /// Inserts a series or updates the existing row with the same handle
    ///
    /// Repeating an upsert with identical data leaves the store unchanged.
    /// An absent image never clears one stored earlier.
    fn upsert_series(&self, record: &SeriesRecord) -> StorageResult<()>;

    /// Gets one series by handle
    fn get_series(&self, handle: &SeriesHandle) -> StorageResult<Option<SeriesRecord>>;

    /// Gets every stored series, most recently updated first
    fn list_all_series(&self) -> StorageResult<Vec<SeriesRecord>>;

    // ===== Run Ledger =====

    /// Opens a ledger entry for a run and returns its ID
    fn start_run(&self, started_at: DateTime<Utc>) -> StorageResult<i64>;

    /// Closes a ledger entry with the run's outcome
    fn finish_run(
        &self,
        run_id: i64,
        finished_at: DateTime<Utc>,
        status: RunState,
        attempted: u32,
        succeeded: u32,
    ) -> StorageResult<()>;

    /// Gets the most recent run
    fn latest_run(&self) -> StorageResult<Option<RunRecord>>;
}
