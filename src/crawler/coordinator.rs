//! Ingestion coordinator - main run orchestration logic
//!
//! One run walks the state machine
//! `Idle → FetchingListing → Filtering → PerSeries* → Done | Aborted`:
//! - Fetching and extracting the free-chapter listing
//! - Applying the recency window and deduplicating handles
//! - Publishing the aggregate feed
//! - Visiting each surviving series page in turn, paced and retried
//! - Publishing per-series feeds and upserting series records
//!
//! Only a failed listing fetch or a failed aggregate feed write aborts a run.
//! Everything that goes wrong for one series stays with that series.

use crate::config::Config;
use crate::crawler::extractor::{Extractor, SeriesPage};
use crate::crawler::fetcher::{Fetcher, TransportError};
use crate::crawler::filter::{cutoff, dedup_by_handle, retain_recent};
use crate::crawler::pacer::Pacer;
use crate::feed::{assemble, FeedDocument, FeedItem};
use crate::model::{ChapterEntry, SeriesRecord};
use crate::output::{to_atom, FeedSink, OutputResult, MAIN_FEED_NAME};
use crate::state::RunState;
use crate::storage::Storage;
use crate::{FeedsError, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};

/// Step of per-series processing that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Fetch,
    Serialize,
    Feed,
    Record,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fetch => "fetch",
            Self::Serialize => "serialize",
            Self::Feed => "feed",
            Self::Record => "record",
        };
        f.write_str(name)
    }
}

/// One per-series failure, kept for the end-of-run summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesFailure {
    pub handle: String,
    pub stage: FailureStage,
    pub message: String,
}

/// Outcome counts of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Ledger ID, when the ledger entry could be opened
    pub run_id: Option<i64>,
    /// Entries extracted from the listing page
    pub listing_entries: usize,
    /// Entries inside the recency window
    pub retained: usize,
    /// Series pages visited
    pub attempted: u32,
    /// Series whose feed and record were both written
    pub succeeded: u32,
    pub failures: Vec<SeriesFailure>,
}

impl RunSummary {
    pub fn failed(&self) -> u32 {
        self.attempted.saturating_sub(self.succeeded)
    }
}

/// Main ingestion coordinator structure
///
/// Shared behind an `Arc` between the scheduler and anything observing runs.
/// `run` takes an internal lock, so two runs never overlap: a second caller
/// waits for the first run to finish.
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: Fetcher,
    extractor: Extractor,
    storage: Arc<dyn Storage>,
    sink: Arc<dyn FeedSink>,
    run_lock: Mutex<()>,
    state: watch::Sender<RunState>,
}

impl Coordinator {
    /// Creates a coordinator
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `storage` - Backend receiving series records and the run ledger
    /// * `sink` - Destination of serialized feeds
    pub fn new(config: Config, storage: Arc<dyn Storage>, sink: Arc<dyn FeedSink>) -> Result<Self> {
        let fetcher = Fetcher::new(&config.crawler)?;
        let extractor = Extractor::new(&config.source.base_url, &config.source.series_path_prefix)?;
        let (state, _) = watch::channel(RunState::Idle);

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            extractor,
            storage,
            sink,
            run_lock: Mutex::new(()),
            state,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Current run state
    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Observes run state changes without touching the run lock
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Whether a run currently holds the lock
    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    /// Performs one ingestion run at the current time
    pub async fn run(&self) -> Result<RunSummary> {
        self.run_at(Utc::now()).await
    }

    /// Performs one ingestion run as if started at `now`
    ///
    /// The run is bounded by the configured run deadline; hitting it aborts
    /// the run with `FeedsError::Deadline`.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunSummary> {
        let _guard = self.run_lock.lock().await;

        let mut summary = RunSummary {
            run_id: self.open_ledger(now),
            ..RunSummary::default()
        };

        tracing::info!(run_id = ?summary.run_id, "Starting ingestion run");

        let deadline = Duration::from_secs(self.config.schedule.run_timeout_secs);
        let result = match tokio::time::timeout(deadline, self.execute(now, &mut summary)).await {
            Ok(result) => result,
            Err(_) => Err(FeedsError::Deadline(deadline)),
        };

        if let Err(e) = &result {
            tracing::error!("Ingestion run aborted: {}", e);
            if self.state().is_active() {
                self.state.send_replace(RunState::Aborted);
            }
        }

        self.close_ledger(&summary);

        tracing::info!(
            listing_entries = summary.listing_entries,
            retained = summary.retained,
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed(),
            status = %self.state(),
            "Ingestion run finished"
        );

        result.map(|_| summary)
    }

    async fn execute(&self, now: DateTime<Utc>, summary: &mut RunSummary) -> Result<()> {
        self.transition(RunState::FetchingListing)?;
        let listing_url = self.config.source.listing_url();
        let html = self.fetcher.fetch(&listing_url).await?;

        self.transition(RunState::Filtering)?;
        let listing = self.extractor.extract_listing(&html, now);
        listing.log_gaps(&listing_url);
        summary.listing_entries = listing.records.len();

        let window_start = cutoff(now, self.config.crawler.lookback_days);
        let recent = retain_recent(listing.records, window_start);
        summary.retained = recent.len();
        let series = dedup_by_handle(&recent);

        tracing::info!(
            entries = summary.listing_entries,
            retained = summary.retained,
            series = series.len(),
            "Filtered listing"
        );

        let feed = &self.config.feed;
        let aggregate = assemble(
            &feed.title,
            &listing_url,
            &feed.description,
            &feed.author,
            now,
            recent.iter().map(listing_item).collect(),
        );
        self.publish(MAIN_FEED_NAME, &aggregate)?;

        let mut pacer = Pacer::new(Duration::from_millis(
            self.config.crawler.politeness_delay_ms,
        ));

        for entry in &series {
            self.transition(RunState::PerSeries)?;
            summary.attempted += 1;

            let failures = self.process_series(entry, now, &mut pacer).await;
            if failures.is_empty() {
                summary.succeeded += 1;
            }
            summary.failures.extend(failures);
        }

        self.transition(RunState::Done)
    }

    /// Fetches, publishes and records one series; returns what went wrong
    async fn process_series(
        &self,
        entry: &ChapterEntry,
        now: DateTime<Utc>,
        pacer: &mut Pacer,
    ) -> Vec<SeriesFailure> {
        let handle = entry.handle.as_str();
        let url = self.config.source.series_url(handle);
        let mut failures = Vec::new();

        let html = match self.fetch_series(&url, pacer).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(handle, stage = %FailureStage::Fetch, "Skipping series: {}", e);
                failures.push(failure(handle, FailureStage::Fetch, e.to_string()));
                return failures;
            }
        };

        let page = self.extractor.extract_series_page(&html);
        page.chapters.log_gaps(&url);

        let document = self.series_feed(&url, &page, now);
        match to_atom(&document) {
            Ok(xml) => {
                if let Err(e) = self.sink.write_feed(handle, &xml) {
                    tracing::error!(handle, stage = %FailureStage::Feed, "Feed write failed: {}", e);
                    failures.push(failure(handle, FailureStage::Feed, e.to_string()));
                }
            }
            Err(e) => {
                tracing::error!(handle, stage = %FailureStage::Serialize, "Feed serialization failed: {}", e);
                failures.push(failure(handle, FailureStage::Serialize, e.to_string()));
            }
        }

        let record = SeriesRecord {
            handle: entry.handle.clone(),
            name: if page.title.is_empty() {
                entry.series_name.clone()
            } else {
                page.title.clone()
            },
            url,
            last_update: now.timestamp(),
            image: page.image.clone(),
        };
        if let Err(e) = self.storage.upsert_series(&record) {
            tracing::error!(handle, stage = %FailureStage::Record, "Record upsert failed: {}", e);
            failures.push(failure(handle, FailureStage::Record, e.to_string()));
        }

        if failures.is_empty() {
            tracing::debug!(handle, chapters = document.items.len(), "Series updated");
        }
        failures
    }

    /// Fetches a series page, retrying transport failures with linear backoff
    async fn fetch_series(&self, url: &str, pacer: &mut Pacer) -> std::result::Result<String, TransportError> {
        let retries = self.config.crawler.series_retries;
        let mut attempt = 0;

        loop {
            pacer.ready().await;
            match self.fetcher.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < retries => {
                    attempt += 1;
                    let wait = pacer.backoff(attempt);
                    tracing::warn!(url, attempt, wait_ms = wait.as_millis() as u64, "Retrying: {}", e);
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn series_feed(&self, url: &str, page: &SeriesPage, now: DateTime<Utc>) -> FeedDocument {
        let feed = &self.config.feed;
        let mut document = assemble(&feed.title, url, &feed.description, &feed.author, now, Vec::new());
        document.apply_page_metadata(&page.title, &page.description);
        document.icon = page.image.clone();

        let author = Some(page.author.clone()).filter(|a| !a.is_empty());
        document.items = page
            .chapters
            .records
            .iter()
            .map(|chapter| {
                let title = format!("{} - {}", document.title, chapter.label);
                FeedItem {
                    description: format!("Read {}", title),
                    title,
                    link: chapter.link.clone(),
                    author: author.clone(),
                    published_at: chapter.published_at,
                }
            })
            .collect();

        document
    }

    fn publish(&self, name: &str, document: &FeedDocument) -> OutputResult<()> {
        let xml = to_atom(document)?;
        self.sink.write_feed(name, &xml)?;
        tracing::info!(feed = name, items = document.items.len(), "Published feed");
        Ok(())
    }

    fn transition(&self, next: RunState) -> Result<()> {
        let current = self.state();
        if !current.can_transition_to(next) {
            return Err(FeedsError::InvalidTransition {
                from: current,
                to: next,
            });
        }
        tracing::debug!("Run state {} -> {}", current, next);
        self.state.send_replace(next);
        Ok(())
    }

    fn open_ledger(&self, now: DateTime<Utc>) -> Option<i64> {
        match self.storage.start_run(now) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("Could not open run ledger entry: {}", e);
                None
            }
        }
    }

    fn close_ledger(&self, summary: &RunSummary) {
        let Some(run_id) = summary.run_id else {
            return;
        };
        if let Err(e) = self.storage.finish_run(
            run_id,
            Utc::now(),
            self.state(),
            summary.attempted,
            summary.succeeded,
        ) {
            tracing::warn!(run_id, "Could not close run ledger entry: {}", e);
        }
    }
}

fn listing_item(entry: &ChapterEntry) -> FeedItem {
    FeedItem {
        title: entry.title(),
        description: entry.description(),
        link: entry.source_link.clone(),
        author: None,
        published_at: entry.published_at,
    }
}

fn failure(handle: &str, stage: FailureStage, message: String) -> SeriesFailure {
    SeriesFailure {
        handle: handle.to_string(),
        stage,
        message,
    }
}
