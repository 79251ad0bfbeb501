//! Time-of-day scheduling of ingestion runs
//!
//! This module handles:
//! - Resolving the configured run times in the configured time zone
//! - Computing the next fire instant across DST changes
//! - Driving the coordinator from a single timer loop
//!
//! Runs never overlap: the loop awaits each run before computing the next fire
//! time, and the coordinator holds its own run lock for callers outside the loop.

use crate::config::{parse_run_time, resolve_time_zone, ScheduleConfig};
use crate::crawler::Coordinator;
use crate::ConfigError;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

/// Run times of day in one time zone
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    run_times: Vec<NaiveTime>,
    time_zone: Tz,
}

impl Schedule {
    /// Builds a schedule from configuration; run times are sorted and deduplicated
    pub fn from_config(config: &ScheduleConfig) -> Result<Self, ConfigError> {
        let mut run_times = config
            .run_times
            .iter()
            .map(|raw| parse_run_time(raw))
            .collect::<Result<Vec<_>, _>>()?;
        run_times.sort();
        run_times.dedup();

        if run_times.is_empty() {
            return Err(ConfigError::Validation(
                "schedule needs at least one run time".to_string(),
            ));
        }

        Ok(Self {
            run_times,
            time_zone: resolve_time_zone(config.time_zone.as_deref())?,
        })
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    pub fn run_times(&self) -> &[NaiveTime] {
        &self.run_times
    }

    /// First scheduled instant strictly after `after`
    ///
    /// A run time that falls into a DST gap is skipped for that day; one that
    /// occurs twice when clocks fall back fires at its earlier occurrence.
    pub fn next_fire(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let today = after.with_timezone(&self.time_zone).date_naive();

        // Two days ahead is enough even if today's and tomorrow's times all sit in gaps
        (0..=2).find_map(|offset| {
            let date = today + Duration::days(offset);
            self.run_times.iter().find_map(|time| {
                self.time_zone
                    .from_local_datetime(&date.and_time(*time))
                    .earliest()
                    .map(|local| local.with_timezone(&Utc))
                    .filter(|fire| *fire > after)
            })
        })
    }

    /// The next `count` fire instants after `after`
    pub fn upcoming(&self, after: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        let mut fires = Vec::with_capacity(count);
        let mut cursor = after;
        while fires.len() < count {
            match self.next_fire(cursor) {
                Some(fire) => {
                    fires.push(fire);
                    cursor = fire;
                }
                None => break,
            }
        }
        fires
    }
}

/// Fires the coordinator on a schedule until the future is dropped
pub struct Scheduler {
    coordinator: Arc<Coordinator>,
    schedule: Schedule,
    run_on_start: bool,
}

impl Scheduler {
    /// Creates a scheduler from the coordinator's own schedule configuration
    pub fn new(coordinator: Arc<Coordinator>) -> Result<Self, ConfigError> {
        let config = &coordinator.config().schedule;
        let schedule = Schedule::from_config(config)?;
        let run_on_start = config.run_on_start;

        Ok(Self {
            coordinator,
            schedule,
            run_on_start,
        })
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Runs forever; cancel by dropping the future (e.g. from `tokio::select!`)
    pub async fn run_forever(&self) {
        tracing::info!(
            time_zone = %self.schedule.time_zone,
            run_times = ?self.schedule.run_times,
            "Scheduler started"
        );

        if self.run_on_start {
            self.trigger().await;
        }

        loop {
            let now = Utc::now();
            let Some(next) = self.schedule.next_fire(now) else {
                tracing::error!("No future run time can be scheduled, stopping scheduler");
                return;
            };

            tracing::info!(
                next = %next.with_timezone(&self.schedule.time_zone),
                "Next ingestion run scheduled"
            );

            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;
            self.trigger().await;
        }
    }

    async fn trigger(&self) {
        if self.coordinator.is_running() {
            tracing::info!("A run is already in progress, waiting for it to finish");
        }

        match self.coordinator.run().await {
            Ok(summary) if summary.failed() > 0 => {
                tracing::warn!(
                    failed = summary.failed(),
                    attempted = summary.attempted,
                    "Ingestion run finished with failed series"
                );
            }
            Ok(_) => {}
            Err(e) => tracing::error!("Ingestion run failed: {}", e),
        }
    }
}
