//! Crawler module for the two-stage listing → series ingestion
//!
//! This module contains the core ingestion logic, including:
//! - HTTP fetching of single pages
//! - Record extraction from listing and series pages
//! - Recency filtering and handle deduplication
//! - Politeness pacing between series requests
//! - Run orchestration and time-of-day scheduling

mod coordinator;
mod extractor;
mod fetcher;
mod filter;
mod pacer;
mod scheduler;

pub use coordinator::{Coordinator, FailureStage, RunSummary, SeriesFailure};
pub use extractor::{
    ExtractError, Extraction, ExtractionGap, Extractor, GapReason, SeriesChapter, SeriesPage,
    SERIES_ROW_CAP,
};
pub use fetcher::{build_http_client, fetch_page, Fetcher, TransportError};
pub use filter::{cutoff, dedup_by_handle, retain_recent};
pub use pacer::Pacer;
pub use scheduler::{Schedule, Scheduler};
