/// Run state definitions for tracking ingestion progress
///
/// The orchestrator moves through these states once per run and returns to
/// `Idle` when the next run starts.
use std::fmt;

/// Represents the current state of the ingestion orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    // ===== Resting State =====
    /// No run has started, or the previous one has been collected
    Idle,

    // ===== Active States =====
    /// Fetching and extracting the listing page
    FetchingListing,

    /// Applying the recency window and handle deduplication
    Filtering,

    /// Crawling one series page
    PerSeries,

    // ===== Terminal States =====
    /// Every surviving handle was attempted
    Done,

    /// The listing stage or the aggregate feed write failed
    Aborted,
}

impl RunState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// Returns true while a run is in flight
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::FetchingListing | Self::Filtering | Self::PerSeries
        )
    }

    /// Checks whether moving from `self` to `next` is a legal step
    ///
    /// `PerSeries → PerSeries` is legal (one step per handle), and any active
    /// state may abort.
    pub fn can_transition_to(&self, next: RunState) -> bool {
        use RunState::*;

        match (self, next) {
            (Idle | Done | Aborted, FetchingListing) => true,
            (FetchingListing, Filtering) => true,
            (Filtering, PerSeries | Done) => true,
            (PerSeries, PerSeries | Done) => true,
            (FetchingListing | Filtering | PerSeries, Aborted) => true,
            _ => false,
        }
    }

    /// Converts the run state to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FetchingListing => "fetching_listing",
            Self::Filtering => "filtering",
            Self::PerSeries => "per_series",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }

    /// Parses a run state from a database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "fetching_listing" => Some(Self::FetchingListing),
            "filtering" => Some(Self::Filtering),
            "per_series" => Some(Self::PerSeries),
            "done" => Some(Self::Done),
            "aborted" => Some(Self::Aborted),
            _ => None,
        }
    }

    /// Returns all possible run states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Idle,
            Self::FetchingListing,
            Self::Filtering,
            Self::PerSeries,
            Self::Done,
            Self::Aborted,
        ]
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::Idle
    }
}
