use crate::model::SeriesHandle;
use chrono::{DateTime, Utc};

/// One chapter announced on the listing page
///
/// Produced by listing-page extraction and consumed once by the recency filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterEntry {
    /// Series display name as shown on the listing
    pub series_name: String,

    /// Raw chapter label with the `Latest: ` prefix removed
    pub chapter_label: String,

    /// Absolute chapter permalink
    pub source_link: String,

    /// Release date at midnight UTC, year reconstructed at run time
    pub published_at: DateTime<Utc>,

    /// Handle derived from the series permalink
    pub handle: SeriesHandle,
}

impl ChapterEntry {
    /// Feed item title, e.g. `Foo - 12`
    pub fn title(&self) -> String {
        format!("{} - {}", self.series_name, self.chapter_label)
    }

    /// Feed item description, e.g. `Read Foo - 12`
    pub fn description(&self) -> String {
        format!("Read {}", self.title())
    }
}

/// Persisted per-series row, keyed by handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRecord {
    pub handle: SeriesHandle,
    pub name: String,
    /// Canonical series page URL
    pub url: String,
    /// Unix seconds of the run that last saw this series
    pub last_update: i64,
    pub image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_entry_title_and_description() {
        let entry = ChapterEntry {
            series_name: "Foo".to_string(),
            chapter_label: "12".to_string(),
            source_link: "https://example.com/shonenjump/foo-chapter-12/chapter/1".to_string(),
            published_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            handle: SeriesHandle::new("foo").unwrap(),
        };

        assert_eq!(entry.title(), "Foo - 12");
        assert_eq!(entry.description(), "Read Foo - 12");
    }
}
