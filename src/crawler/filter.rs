//! Recency window and per-run handle deduplication for listing entries

use crate::model::{ChapterEntry, SeriesHandle};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Start of the lookback window: entries must be strictly newer than this
pub fn cutoff(now: DateTime<Utc>, lookback_days: u32) -> DateTime<Utc> {
    now - Duration::days(i64::from(lookback_days))
}

/// Keeps entries published strictly after `cutoff`, in their original order
pub fn retain_recent(entries: Vec<ChapterEntry>, cutoff: DateTime<Utc>) -> Vec<ChapterEntry> {
    entries
        .into_iter()
        .filter(|entry| entry.published_at > cutoff)
        .collect()
}

/// Collapses entries to one per series handle
///
/// Handles keep the position of their first sighting; the data of the last
/// sighting wins, since the listing does not promise unique-first ordering.
pub fn dedup_by_handle(entries: &[ChapterEntry]) -> Vec<ChapterEntry> {
    let mut positions: HashMap<&SeriesHandle, usize> = HashMap::new();
    let mut unique: Vec<ChapterEntry> = Vec::new();

    for entry in entries {
        match positions.get(&entry.handle) {
            Some(&position) => {
                tracing::debug!(handle = %entry.handle, "Duplicate handle in listing");
                unique[position] = entry.clone();
            }
            None => {
                positions.insert(&entry.handle, unique.len());
                unique.push(entry.clone());
            }
        }
    }

    unique
}
