//! State module for tracking ingestion progress
//!
//! # Components
//!
//! - `RunState`: where the orchestrator is within one ingestion run
//!   (`Idle → FetchingListing → Filtering → PerSeries* → Done | Aborted`)

mod run_state;

pub use run_state::RunState;
