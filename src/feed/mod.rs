//! Feed documents, independent of their serialized form
//!
//! A `FeedDocument` is rebuilt from scratch on every run: one for the aggregate
//! "recent chapters" feed and one per series handle.

use chrono::{DateTime, Utc};
use std::time::UNIX_EPOCH;

/// One entry of a feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub description: String,
    pub link: String,
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
}

/// A complete syndication feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDocument {
    pub title: String,
    pub link: String,
    pub description: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    /// Optional feed icon (series hero image)
    pub icon: Option<String>,
    /// Items in insertion order (listing or crawl order)
    pub items: Vec<FeedItem>,
}

impl FeedDocument {
    /// Timestamp the feed reports as its last update
    ///
    /// The newest item wins; an empty feed reports the Unix epoch. Never
    /// depends on when the run happened, so the same HTML yields the same bytes.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.items
            .iter()
            .map(|item| item.published_at)
            .max()
            .unwrap_or_else(|| DateTime::<Utc>::from(UNIX_EPOCH))
    }

    /// Replaces the provisional title and description with values found on the
    /// series page itself. Empty values leave the provisional ones in place.
    pub fn apply_page_metadata(&mut self, title: &str, description: &str) {
        if !title.is_empty() {
            self.title = title.to_string();
        }
        if !description.is_empty() {
            self.description = description.to_string();
        }
    }
}

/// Builds a feed document; pure, preserves item order
pub fn assemble(
    title: &str,
    link: &str,
    description: &str,
    author: &str,
    created_at: DateTime<Utc>,
    items: Vec<FeedItem>,
) -> FeedDocument {
    FeedDocument {
        title: title.to_string(),
        link: link.to_string(),
        description: description.to_string(),
        author: author.to_string(),
        created_at,
        icon: None,
        items,
    }
}
