//! Storage module for persisting series state
//!
//! This module handles:
//! - The `Storage` contract consumed by ingestion (upsert) and by readers (list)
//! - SQLite persistence (production) and an in-memory backend
//! - The run ledger

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::RunState;
use std::path::Path;

/// Opens the SQLite storage at the given path
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Represents one ingestion run in the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: RunState,
    pub attempted: u32,
    pub succeeded: u32,
}
