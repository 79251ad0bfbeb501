//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! The connection sits behind a mutex held for one statement at a time, and
//! the database runs in WAL mode so other connections can read during a write.

use crate::model::{SeriesHandle, SeriesRecord};
use crate::state::RunState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::RunRecord;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

type RawSeriesRow = (String, String, String, i64, Option<String>);

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path`, creating parent directories
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

fn series_from_raw(raw: RawSeriesRow) -> StorageResult<SeriesRecord> {
    let (handle, name, url, last_update, image) = raw;
    let handle = SeriesHandle::new(handle.clone()).map_err(|e| StorageError::Corrupt {
        key: handle,
        reason: e.to_string(),
    })?;

    Ok(SeriesRecord {
        handle,
        name,
        url,
        last_update,
        image,
    })
}

type RawRunRow = (i64, String, Option<String>, String, u32, u32);

fn run_from_raw(raw: RawRunRow) -> StorageResult<RunRecord> {
    let (id, started_at, finished_at, status, attempted, succeeded) = raw;
    let status = RunState::from_db_string(&status).ok_or_else(|| StorageError::Corrupt {
        key: format!("run {}", id),
        reason: format!("unknown status '{}'", status),
    })?;

    Ok(RunRecord {
        id,
        started_at,
        finished_at,
        status,
        attempted,
        succeeded,
    })
}

impl Storage for SqliteStorage {
    // ===== Series =====

    fn upsert_series(&self, record: &SeriesRecord) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO series (handle, name, url, last_update, image)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(handle) DO UPDATE SET
                name = excluded.name,
                url = excluded.url,
                last_update = excluded.last_update,
                image = COALESCE(excluded.image, series.image)",
            params![
                record.handle.as_str(),
                record.name,
                record.url,
                record.last_update,
                record.image,
            ],
        )?;
        Ok(())
    }

    fn get_series(&self, handle: &SeriesHandle) -> StorageResult<Option<SeriesRecord>> {
        let conn = self.conn()?;
        let raw: Option<RawSeriesRow> = conn
            .query_row(
                "SELECT handle, name, url, last_update, image FROM series WHERE handle = ?1",
                params![handle.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .optional()?;

        raw.map(series_from_raw).transpose()
    }

    fn list_all_series(&self) -> StorageResult<Vec<SeriesRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT handle, name, url, last_update, image FROM series
             ORDER BY last_update DESC, name ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        })?;

        let mut series = Vec::new();
        for row in rows {
            series.push(series_from_raw(row?)?);
        }

        Ok(series)
    }

    // ===== Run Ledger =====

    fn start_run(&self, started_at: DateTime<Utc>) -> StorageResult<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO runs (started_at, status) VALUES (?1, ?2)",
            params![
                started_at.to_rfc3339(),
                RunState::FetchingListing.to_db_string()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn finish_run(
        &self,
        run_id: i64,
        finished_at: DateTime<Utc>,
        status: RunState,
        attempted: u32,
        succeeded: u32,
    ) -> StorageResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE runs SET finished_at = ?1, status = ?2, attempted = ?3, succeeded = ?4
             WHERE id = ?5",
            params![
                finished_at.to_rfc3339(),
                status.to_db_string(),
                attempted,
                succeeded,
                run_id
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let conn = self.conn()?;
        let run = conn
            .query_row(
                "SELECT id, started_at, finished_at, status, attempted, succeeded
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )
            .optional()?;

        run.map(run_from_raw).transpose()
    }
}
