use std::fmt;
use thiserror::Error;
use url::Url;

/// Reasons a series link cannot produce a handle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandleError {
    #[error("series handle is empty")]
    Empty,

    #[error("series link '{0}' is outside the series path prefix")]
    OutsidePrefix(String),

    #[error("series handle '{0}' contains characters that are not URL-safe")]
    Unsafe(String),
}

/// Short stable identifier of a series, taken from its page URL path
///
/// Always non-empty and made only of ASCII alphanumerics, `-`, `_` and `.`,
/// so it can be used as a path segment, a file name and a storage key as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesHandle(String);

impl SeriesHandle {
    /// Validates a raw handle
    pub fn new(raw: impl Into<String>) -> Result<Self, HandleError> {
        let raw = raw.into();

        if raw.is_empty() {
            return Err(HandleError::Empty);
        }

        let url_safe = raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

        if !url_safe || raw == "." || raw == ".." {
            return Err(HandleError::Unsafe(raw));
        }

        Ok(Self(raw))
    }

    /// Derives a handle from a series permalink by stripping the series path prefix
    ///
    /// Accepts both site-relative (`/shonenjump/chapters/foo`) and absolute links.
    /// Query strings, fragments and a trailing slash are ignored.
    ///
    /// # Example
    ///
    /// ```
    /// use sj_feeds::model::SeriesHandle;
    ///
    /// let handle = SeriesHandle::from_series_link("/shonenjump/chapters/foo", "/shonenjump/chapters/").unwrap();
    /// assert_eq!(handle.as_str(), "foo");
    /// ```
    pub fn from_series_link(href: &str, prefix: &str) -> Result<Self, HandleError> {
        let href = href.trim();
        if href.is_empty() {
            return Err(HandleError::Empty);
        }

        let path = match Url::parse(href) {
            Ok(absolute) => absolute.path().to_string(),
            Err(_) => href
                .split(|c: char| c == '?' || c == '#')
                .next()
                .unwrap_or_default()
                .to_string(),
        };

        let rest = path
            .strip_prefix(prefix)
            .ok_or_else(|| HandleError::OutsidePrefix(href.to_string()))?;

        Self::new(rest.trim_end_matches('/'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeriesHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SeriesHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
