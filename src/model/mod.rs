//! Core records flowing through an ingestion run
//!
//! - `SeriesHandle`: URL-safe slug that keys a series everywhere
//! - `ChapterEntry`: one chapter seen on the listing page
//! - `SeriesRecord`: the persisted per-series row

mod handle;
mod records;

pub use handle::{HandleError, SeriesHandle};
pub use records::{ChapterEntry, SeriesRecord};
