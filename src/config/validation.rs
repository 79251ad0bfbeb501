use crate::config::types::{
    Config, CrawlerConfig, FeedConfig, OutputConfig, ScheduleConfig, SourceConfig,
};
use crate::ConfigError;
use chrono::NaiveTime;
use chrono_tz::Tz;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_crawler_config(&config.crawler)?;
    validate_schedule_config(&config.schedule)?;
    validate_output_config(&config.output)?;
    validate_feed_config(&config.feed)?;
    Ok(())
}

/// Parses a `HH:MM` time of day
pub fn parse_run_time(raw: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| ConfigError::InvalidRunTime(raw.to_string()))
}

/// Resolves the configured time zone, falling back to UTC when none is set
pub fn resolve_time_zone(name: Option<&str>) -> Result<Tz, ConfigError> {
    match name {
        None => Ok(Tz::UTC),
        Some(name) => name
            .trim()
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimeZone(name.to_string())),
    }
}

/// Validates source configuration
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if !config.listing_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "listing-path must start with '/', got '{}'",
            config.listing_path
        )));
    }

    if !config.series_path_prefix.starts_with('/') || !config.series_path_prefix.ends_with('/') {
        return Err(ConfigError::Validation(format!(
            "series-path-prefix must start and end with '/', got '{}'",
            config.series_path_prefix
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.lookback_days < 1 || config.lookback_days > 365 {
        return Err(ConfigError::Validation(format!(
            "lookback-days must be between 1 and 365, got {}",
            config.lookback_days
        )));
    }

    if config.politeness_delay_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "politeness-delay-ms must be >= 100ms, got {}ms",
            config.politeness_delay_ms
        )));
    }

    if config.request_timeout_secs < 1 || config.request_timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-secs must be between 1 and 300, got {}",
            config.request_timeout_secs
        )));
    }

    if config.series_retries > 5 {
        return Err(ConfigError::Validation(format!(
            "series-retries must be <= 5, got {}",
            config.series_retries
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates schedule configuration
fn validate_schedule_config(config: &ScheduleConfig) -> Result<(), ConfigError> {
    if config.run_times.is_empty() {
        return Err(ConfigError::Validation(
            "run-times must contain at least one HH:MM entry".to_string(),
        ));
    }

    for raw in &config.run_times {
        parse_run_time(raw)?;
    }

    resolve_time_zone(config.time_zone.as_deref())?;

    if config.run_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "run-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.feed_dir.is_empty() {
        return Err(ConfigError::Validation(
            "feed-dir cannot be empty".to_string(),
        ));
    }

    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_feed_config(config: &FeedConfig) -> Result<(), ConfigError> {
    if config.title.trim().is_empty() {
        return Err(ConfigError::Validation(
            "feed title cannot be empty".to_string(),
        ));
    }
    Ok(())
}
