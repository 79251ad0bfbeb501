//! Record extraction from listing and series pages
//!
//! Both page kinds are queried with CSS selectors compiled once per `Extractor`.
//! A block or row missing a required field never fails the page: it is reported
//! as an `ExtractionGap` and left out of the records.

use crate::model::{ChapterEntry, HandleError, SeriesHandle};
use crate::output::MAIN_FEED_NAME;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use thiserror::Error;
use url::Url;

/// Series pages only contribute their first rows, in document order
pub const SERIES_ROW_CAP: usize = 4;

const LATEST_PREFIX: &str = "Latest: ";
const PAYWALL_MARKER: &str = "join to read";
const DATE_FORMAT: &str = "%B %d, %Y";

/// Extractor setup failures
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("Invalid base URL '{0}'")]
    BaseUrl(String),
}

/// Why one block or row produced no record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GapReason {
    MissingDate,
    UnparsableDate(String),
    MissingLabel,
    MissingLink,
    InvalidHandle(HandleError),
    /// Handle collides with the aggregate feed name
    ReservedHandle(String),
    Paywalled,
}

impl fmt::Display for GapReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDate => f.write_str("release date is missing"),
            Self::UnparsableDate(raw) => write!(f, "release date '{}' is not parsable", raw),
            Self::MissingLabel => f.write_str("chapter label is missing"),
            Self::MissingLink => f.write_str("chapter link is missing"),
            Self::InvalidHandle(err) => write!(f, "{}", err),
            Self::ReservedHandle(handle) => write!(f, "series handle '{}' is reserved", handle),
            Self::Paywalled => f.write_str("chapter is paywalled"),
        }
    }
}

/// A block (listing) or row (series page) that was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionGap {
    /// Zero-based position of the block or row in document order
    pub index: usize,
    pub reason: GapReason,
}

/// Records plus the gaps encountered while producing them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction<T> {
    pub records: Vec<T>,
    pub gaps: Vec<ExtractionGap>,
}

impl<T> Default for Extraction<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            gaps: Vec::new(),
        }
    }
}

impl<T> Extraction<T> {
    fn gap(&mut self, index: usize, reason: GapReason) {
        self.gaps.push(ExtractionGap { index, reason });
    }

    /// Logs every gap at debug level
    pub fn log_gaps(&self, page: &str) {
        for gap in &self.gaps {
            tracing::debug!(page, index = gap.index, reason = %gap.reason, "Dropped block");
        }
    }
}

/// One chapter row of a series page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesChapter {
    pub label: String,
    /// Absolute chapter URL
    pub link: String,
    pub published_at: DateTime<Utc>,
}

/// Everything a series page yields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesPage {
    /// Empty when the page has no title element
    pub title: String,
    pub description: String,
    pub author: String,
    /// Absolute hero image URL
    pub image: Option<String>,
    pub chapters: Extraction<SeriesChapter>,
}

struct ListingSelectors {
    block: Selector,
    name: Selector,
    latest: Selector,
    chapter_link: Selector,
    series_link: Selector,
    date: Selector,
}

struct SeriesSelectors {
    title: Selector,
    description: Selector,
    author: Selector,
    image: Selector,
    row: Selector,
    label: Selector,
    chapter_link: Selector,
    date: Selector,
}

/// Compiled selectors plus the link-resolution context
pub struct Extractor {
    base_url: Url,
    series_prefix: String,
    listing: ListingSelectors,
    series: SeriesSelectors,
}

fn compile(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::Selector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

impl Extractor {
    /// Creates an extractor resolving links against `base_url`
    ///
    /// `series_prefix` is the path prefix stripped from series links to obtain
    /// the handle (e.g. `/shonenjump/chapters/`).
    pub fn new(base_url: &str, series_prefix: &str) -> Result<Self, ExtractError> {
        let base_url =
            Url::parse(base_url).map_err(|_| ExtractError::BaseUrl(base_url.to_string()))?;

        Ok(Self {
            base_url,
            series_prefix: series_prefix.to_string(),
            listing: ListingSelectors {
                block: compile(".o_sortable")?,
                name: compile("div.type-center")?,
                latest: compile("span")?,
                chapter_link: compile("a.o_inner-link")?,
                series_link: compile("a.o_chapters-link")?,
                date: compile("span.type-bs--sm")?,
            },
            series: SeriesSelectors {
                title: compile("h2.type-lg")?,
                description: compile("div.line-solid.type-md")?,
                author: compile("span.disp-bl--bm")?,
                image: compile("img.o_hero-media")?,
                row: compile("div.o_sortable")?,
                label: compile("td.ch-num-list-spacing")?,
                chapter_link: compile("a.o_chapter-container")?,
                date: compile("div.style-italic")?,
            },
        })
    }

    /// Extracts chapter entries from the free-chapter listing page
    ///
    /// Release dates on the listing carry no year. The year of `now` is assumed,
    /// unless that puts the date more than a day in the future, in which case the
    /// entry is from the previous year (a January run reading December dates).
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use sj_feeds::crawler::Extractor;
    ///
    /// let html = r#"<div class="o_sortable">
    ///   <a class="o_chapters-link" href="/shonenjump/chapters/foo"><div class="type-center">Foo</div></a>
    ///   <a class="o_inner-link" href="/shonenjump/foo-chapter-12/chapter/1"><span>Latest: 12</span></a>
    ///   <span class="type-bs--sm">March 1</span>
    /// </div>"#;
    ///
    /// let extractor = Extractor::new("https://www.viz.com", "/shonenjump/chapters/").unwrap();
    /// let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
    /// let listing = extractor.extract_listing(html, now);
    /// assert_eq!(listing.records[0].title(), "Foo - 12");
    /// assert_eq!(listing.records[0].handle.as_str(), "foo");
    /// ```
    pub fn extract_listing(&self, html: &str, now: DateTime<Utc>) -> Extraction<ChapterEntry> {
        let document = Html::parse_document(html);
        let selectors = &self.listing;
        let mut extraction = Extraction::default();

        for (index, block) in document.select(&selectors.block).enumerate() {
            let release = child_text(block, &selectors.date);
            if release.is_empty() {
                extraction.gap(index, GapReason::MissingDate);
                continue;
            }

            let published_at = match reconstruct_listing_date(&release, now) {
                Some(date) => date,
                None => {
                    extraction.gap(index, GapReason::UnparsableDate(release));
                    continue;
                }
            };

            let series_href = child_attr(block, &selectors.series_link, "href").unwrap_or_default();
            let handle = match SeriesHandle::from_series_link(&series_href, &self.series_prefix) {
                Ok(handle) => handle,
                Err(err) => {
                    extraction.gap(index, GapReason::InvalidHandle(err));
                    continue;
                }
            };
            if handle.as_str() == MAIN_FEED_NAME {
                extraction.gap(index, GapReason::ReservedHandle(handle.to_string()));
                continue;
            }

            let source_link = match child_attr(block, &selectors.chapter_link, "href")
                .and_then(|href| self.resolve(&href))
            {
                Some(link) => link,
                None => {
                    extraction.gap(index, GapReason::MissingLink);
                    continue;
                }
            };

            let latest = block
                .select(&selectors.latest)
                .next()
                .map(|span| span.text().collect::<String>())
                .unwrap_or_default();
            let first_line = latest.trim().lines().next().unwrap_or_default().trim();
            let chapter_label = first_line
                .strip_prefix(LATEST_PREFIX)
                .unwrap_or(first_line)
                .trim()
                .to_string();

            extraction.records.push(ChapterEntry {
                series_name: child_text(block, &selectors.name),
                chapter_label,
                source_link,
                published_at,
                handle,
            });
        }

        extraction
    }

    /// Extracts page metadata and the first chapter rows from a series page
    pub fn extract_series_page(&self, html: &str) -> SeriesPage {
        let document = Html::parse_document(html);
        let selectors = &self.series;
        let root = document.root_element();

        let image = document
            .select(&selectors.image)
            .next()
            .and_then(|img| img.value().attr("src"))
            .and_then(|src| self.resolve(src));

        let mut chapters = Extraction::default();

        for (index, row) in document.select(&selectors.row).take(SERIES_ROW_CAP).enumerate() {
            let label = child_text(row, &selectors.label);
            if label.is_empty() {
                chapters.gap(index, GapReason::MissingLabel);
                continue;
            }

            let link_element = row.select(&selectors.chapter_link).next();
            let href = link_element
                .and_then(|a| a.value().attr("href"))
                .unwrap_or_default();
            let link_text = link_element.map(normalized_text).unwrap_or_default();
            if href.contains(PAYWALL_MARKER) || link_text.to_lowercase().contains(PAYWALL_MARKER) {
                chapters.gap(index, GapReason::Paywalled);
                continue;
            }

            let link = match self.resolve(href) {
                Some(link) => link,
                None => {
                    chapters.gap(index, GapReason::MissingLink);
                    continue;
                }
            };

            let raw_date = child_text(row, &selectors.date);
            if raw_date.is_empty() {
                chapters.gap(index, GapReason::MissingDate);
                continue;
            }
            let published_at = match parse_full_date(&raw_date) {
                Some(date) => date,
                None => {
                    chapters.gap(index, GapReason::UnparsableDate(raw_date));
                    continue;
                }
            };

            chapters.records.push(SeriesChapter {
                label,
                link,
                published_at,
            });
        }

        SeriesPage {
            title: child_text(root, &selectors.title),
            description: child_text(root, &selectors.description),
            author: child_text(root, &selectors.author),
            image,
            chapters,
        }
    }

    /// Resolves an href against the base URL; empty or unresolvable hrefs yield `None`
    fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }
        self.base_url.join(href).ok().map(|url| url.to_string())
    }
}

/// Whitespace-collapsed text of an element
fn normalized_text(element: ElementRef) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

fn child_text(element: ElementRef, selector: &Selector) -> String {
    element
        .select(selector)
        .next()
        .map(normalized_text)
        .unwrap_or_default()
}

fn child_attr(element: ElementRef, selector: &Selector, attr: &str) -> Option<String> {
    element
        .select(selector)
        .next()
        .and_then(|e| e.value().attr(attr))
        .map(str::to_string)
}

fn midnight_utc(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Parses a complete `Month Day, Year` date at midnight UTC
fn parse_full_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .ok()
        .and_then(midnight_utc)
}

/// Parses a year-less `Month Day` listing date relative to `now`
fn reconstruct_listing_date(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let year = now.year();
    let current = parse_full_date(&format!("{}, {}", raw, year))?;

    if current > now + Duration::days(1) {
        let previous = parse_full_date(&format!("{}, {}", raw, year - 1))?;
        tracing::debug!(
            date = raw,
            year = year - 1,
            "Listing date is in the future, using previous year"
        );
        return Some(previous);
    }

    Some(current)
}
