use serde::Deserialize;

/// Main configuration structure for sj-feeds
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub feed: FeedConfig,
}

/// Where the listing and series pages live
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Scheme and host every relative link is resolved against
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Path of the aggregate free-chapter listing page
    #[serde(rename = "listing-path", default = "default_listing_path")]
    pub listing_path: String,

    /// Path prefix of per-series pages; what follows it is the series handle
    #[serde(rename = "series-path-prefix", default = "default_series_path_prefix")]
    pub series_path_prefix: String,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Listing entries older than this many days are ignored
    #[serde(rename = "lookback-days", default = "default_lookback_days")]
    pub lookback_days: u32,

    /// Minimum time between two series page requests (milliseconds)
    #[serde(rename = "politeness-delay-ms", default = "default_politeness_delay_ms")]
    pub politeness_delay_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Extra attempts for a series page after a transport failure
    #[serde(rename = "series-retries", default = "default_series_retries")]
    pub series_retries: u32,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// When ingestion runs are triggered
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Times of day, `HH:MM`, in `time_zone`
    #[serde(rename = "run-times", default = "default_run_times")]
    pub run_times: Vec<String>,

    /// IANA time zone name; UTC when omitted
    #[serde(rename = "time-zone", default)]
    pub time_zone: Option<String>,

    /// Whether to run once immediately when the scheduler starts
    #[serde(rename = "run-on-start", default = "default_true")]
    pub run_on_start: bool,

    /// Deadline for a whole run (seconds)
    #[serde(rename = "run-timeout-secs", default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving `main.xml` and `{handle}.xml`
    #[serde(rename = "feed-dir")]
    pub feed_dir: String,

    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Feed-level metadata for the aggregate feed and provisional series feeds
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_title")]
    pub title: String,
    #[serde(default = "default_feed_description")]
    pub description: String,
    #[serde(default = "default_feed_author")]
    pub author: String,
}

impl SourceConfig {
    /// Absolute URL of the listing page
    pub fn listing_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.listing_path)
    }

    /// Absolute URL of the page for one series
    pub fn series_url(&self, handle: &str) -> String {
        format!(
            "{}{}{}",
            self.base_url.trim_end_matches('/'),
            self.series_path_prefix,
            handle
        )
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            listing_path: default_listing_path(),
            series_path_prefix: default_series_path_prefix(),
        }
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            politeness_delay_ms: default_politeness_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            series_retries: default_series_retries(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            run_times: default_run_times(),
            time_zone: None,
            run_on_start: true,
            run_timeout_secs: default_run_timeout_secs(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            title: default_feed_title(),
            description: default_feed_description(),
            author: default_feed_author(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.viz.com".to_string()
}

fn default_listing_path() -> String {
    "/read/shonenjump/section/free-chapters".to_string()
}

fn default_series_path_prefix() -> String {
    "/shonenjump/chapters/".to_string()
}

fn default_lookback_days() -> u32 {
    21
}

fn default_politeness_delay_ms() -> u64 {
    3000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_series_retries() -> u32 {
    1
}

fn default_user_agent() -> String {
    format!("sj-feeds/{}", env!("CARGO_PKG_VERSION"))
}

fn default_run_times() -> Vec<String> {
    vec!["10:00".to_string(), "12:00".to_string(), "14:00".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_run_timeout_secs() -> u64 {
    1800
}

fn default_feed_title() -> String {
    "Weekly Shonen Jump".to_string()
}

fn default_feed_description() -> String {
    "The world's most popular manga!".to_string()
}

fn default_feed_author() -> String {
    "Shonen Jump | VIZ".to_string()
}
