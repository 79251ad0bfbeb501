//! In-memory storage backend
//!
//! Keeps everything in a `RwLock`, which gives the single-writer,
//! many-reader discipline directly. Nothing survives the process.

use crate::model::{SeriesHandle, SeriesRecord};
use crate::state::RunState;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::RunRecord;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    series: BTreeMap<SeriesHandle, SeriesRecord>,
    runs: Vec<RunRecord>,
}

/// Volatile storage backend
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn upsert_series(&self, record: &SeriesRecord) -> StorageResult<()> {
        let mut inner = self.inner.write().map_err(|_| StorageError::LockPoisoned)?;

        let image = match inner.series.get(&record.handle) {
            Some(existing) if record.image.is_none() => existing.image.clone(),
            _ => record.image.clone(),
        };

        inner.series.insert(
            record.handle.clone(),
            SeriesRecord {
                image,
                ..record.clone()
            },
        );
        Ok(())
    }

    fn get_series(&self, handle: &SeriesHandle) -> StorageResult<Option<SeriesRecord>> {
        let inner = self.inner.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(inner.series.get(handle).cloned())
    }

    fn list_all_series(&self) -> StorageResult<Vec<SeriesRecord>> {
        let inner = self.inner.read().map_err(|_| StorageError::LockPoisoned)?;
        let mut series: Vec<SeriesRecord> = inner.series.values().cloned().collect();
        series.sort_by(|a, b| {
            b.last_update
                .cmp(&a.last_update)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(series)
    }

    fn start_run(&self, started_at: DateTime<Utc>) -> StorageResult<i64> {
        let mut inner = self.inner.write().map_err(|_| StorageError::LockPoisoned)?;
        let id = inner.runs.len() as i64 + 1;
        inner.runs.push(RunRecord {
            id,
            started_at: started_at.to_rfc3339(),
            finished_at: None,
            status: RunState::FetchingListing,
            attempted: 0,
            succeeded: 0,
        });
        Ok(id)
    }

    fn finish_run(
        &self,
        run_id: i64,
        finished_at: DateTime<Utc>,
        status: RunState,
        attempted: u32,
        succeeded: u32,
    ) -> StorageResult<()> {
        let mut inner = self.inner.write().map_err(|_| StorageError::LockPoisoned)?;
        let run = inner
            .runs
            .iter_mut()
            .find(|run| run.id == run_id)
            .ok_or(StorageError::RunNotFound(run_id))?;

        run.finished_at = Some(finished_at.to_rfc3339());
        run.status = status;
        run.attempted = attempted;
        run.succeeded = succeeded;
        Ok(())
    }

    fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let inner = self.inner.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(inner.runs.last().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(handle: &str, last_update: i64, image: Option<&str>) -> SeriesRecord {
        SeriesRecord {
            handle: SeriesHandle::new(handle).unwrap(),
            name: handle.to_uppercase(),
            url: format!("https://example.com/{}", handle),
            last_update,
            image: image.map(str::to_string),
        }
    }

    #[test]
    fn test_upsert_never_duplicates() {
        let storage = MemoryStorage::new();
        storage.upsert_series(&record("foo", 1, None)).unwrap();
        storage.upsert_series(&record("foo", 2, None)).unwrap();
        storage.upsert_series(&record("bar", 1, None)).unwrap();

        let all = storage.list_all_series().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].handle.as_str(), "foo");
        assert_eq!(all[0].last_update, 2);
    }

    #[test]
    fn test_image_is_sticky() {
        let storage = MemoryStorage::new();
        storage
            .upsert_series(&record("foo", 1, Some("a.jpg")))
            .unwrap();
        storage.upsert_series(&record("foo", 2, None)).unwrap();

        let foo = storage
            .get_series(&SeriesHandle::new("foo").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(foo.image.as_deref(), Some("a.jpg"));
    }

    #[test]
    fn test_run_ledger() {
        let storage = MemoryStorage::new();
        let id = storage.start_run(Utc::now()).unwrap();
        storage
            .finish_run(id, Utc::now(), RunState::Aborted, 0, 0)
            .unwrap();

        let run = storage.latest_run().unwrap().unwrap();
        assert_eq!(run.status, RunState::Aborted);
        assert!(storage
            .finish_run(99, Utc::now(), RunState::Done, 0, 0)
            .is_err());
    }
}
