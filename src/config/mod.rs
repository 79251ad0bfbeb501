//! Configuration module for sj-feeds
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sj_feeds::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sj-feeds.toml")).unwrap();
//! println!("Looking back {} days", config.crawler.lookback_days);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, FeedConfig, OutputConfig, ScheduleConfig, SourceConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{parse_run_time, resolve_time_zone};
