//! Output sink trait and error types
//!
//! This module defines the trait interface for feed sinks and the errors they
//! report.

use thiserror::Error;

/// Name of the aggregate feed file (`main.xml`)
pub const MAIN_FEED_NAME: &str = "main";

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write feed '{name}': {source}")]
    Write {
        name: String,
        source: std::io::Error,
    },

    #[error("Failed to format output: {0}")]
    Format(String),

    #[error("Invalid feed name: '{0}'")]
    InvalidName(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for serialized feed documents
///
/// `name` is either a series handle or [`MAIN_FEED_NAME`]. Writes fully replace
/// any previous document of the same name.
pub trait FeedSink: Send + Sync {
    /// Publishes one serialized document
    fn write_feed(&self, name: &str, document: &str) -> OutputResult<()>;
}

/// Checks that a feed name is usable as a bare file stem
pub fn validate_feed_name(name: &str) -> OutputResult<()> {
    let ok = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if ok {
        Ok(())
    } else {
        Err(OutputError::InvalidName(name.to_string()))
    }
}
