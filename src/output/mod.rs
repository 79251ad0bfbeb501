//! Output module for publishing feeds
//!
//! This module handles:
//! - Serializing feed documents to Atom XML
//! - Writing them through a `FeedSink` (files by default)

mod atom;
mod files;
mod traits;

pub use atom::to_atom;
pub use files::{write_feed_file, FileFeedSink};
pub use traits::{validate_feed_name, FeedSink, OutputError, OutputResult, MAIN_FEED_NAME};
