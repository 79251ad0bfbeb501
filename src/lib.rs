//! sj-feeds: Atom feeds for serialized manga chapters
//!
//! This crate crawls a publisher's free-chapter listing, follows each recently
//! updated series to its own page, and republishes both as static Atom feed files
//! while keeping a small per-series record store up to date.

pub mod config;
pub mod crawler;
pub mod feed;
pub mod model;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for sj-feeds operations
#[derive(Debug, Error)]
pub enum FeedsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] crawler::TransportError),

    #[error("Extraction error: {0}")]
    Extract(#[from] crawler::ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid run state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::RunState,
        to: state::RunState,
    },

    #[error("Run exceeded its deadline of {0:?}")]
    Deadline(std::time::Duration),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown time zone: {0}")]
    InvalidTimeZone(String),

    #[error("Invalid run time '{0}', expected HH:MM")]
    InvalidRunTime(String),
}

/// Result type alias for sj-feeds operations
pub type Result<T> = std::result::Result<T, FeedsError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, RunSummary, Scheduler};
pub use feed::{FeedDocument, FeedItem};
pub use model::{ChapterEntry, SeriesHandle, SeriesRecord};
pub use state::RunState;
