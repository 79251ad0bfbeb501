//! sj-feeds main entry point
//!
//! This is the command-line interface for the sj-feeds chapter feed publisher.

use anyhow::Context;
use chrono::{TimeZone, Utc};
use clap::Parser;
use sj_feeds::config::{load_config_with_hash, Config};
use sj_feeds::crawler::{Coordinator, Schedule, Scheduler};
use sj_feeds::output::FileFeedSink;
use sj_feeds::storage::{open_storage, Storage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// sj-feeds: Atom feeds for free manga chapters
///
/// sj-feeds reads the publisher's free-chapter listing at scheduled times,
/// follows every recently updated series to its own page, and writes one
/// aggregate feed plus one feed per series.
#[derive(Parser, Debug)]
#[command(name = "sj-feeds")]
#[command(version)]
#[command(about = "Atom feeds for free manga chapters", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Perform a single ingestion run now and exit
    #[arg(long, conflicts_with_all = ["dry_run", "list_series"])]
    once: bool,

    /// Validate config and show the resolved settings and upcoming runs
    #[arg(long, conflicts_with_all = ["once", "list_series"])]
    dry_run: bool,

    /// Print every stored series and exit
    #[arg(long, conflicts_with_all = ["once", "dry_run"])]
    list_series: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.list_series {
        handle_list_series(&config)
    } else {
        handle_ingest(config, cli.once).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sj_feeds=info,warn"),
            1 => EnvFilter::new("sj_feeds=debug,info"),
            2 => EnvFilter::new("sj_feeds=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: prints resolved settings and upcoming runs
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let schedule = Schedule::from_config(&config.schedule)?;

    println!("=== sj-feeds Dry Run ===\n");

    println!("Source:");
    println!("  Listing: {}", config.source.listing_url());
    println!("  Series pages: {}{{handle}}", config.source.series_url(""));

    println!("\nCrawler:");
    println!("  Lookback: {} days", config.crawler.lookback_days);
    println!("  Politeness delay: {}ms", config.crawler.politeness_delay_ms);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Series retries: {}", config.crawler.series_retries);
    println!("  User agent: {}", config.crawler.user_agent);

    println!("\nOutput:");
    println!("  Feeds: {}", config.output.feed_dir);
    println!("  Database: {}", config.output.database_path);

    println!("\nSchedule ({}):", schedule.time_zone());
    for fire in schedule.upcoming(Utc::now(), 5) {
        println!("  - {}", fire.with_timezone(&schedule.time_zone()));
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --list-series mode: prints stored series records
fn handle_list_series(config: &Config) -> anyhow::Result<()> {
    let storage = open_storage(Path::new(&config.output.database_path))
        .context("Failed to open series database")?;

    let records = storage.list_all_series()?;
    println!("{} series in {}\n", records.len(), config.output.database_path);

    for record in &records {
        let updated = Utc
            .timestamp_opt(record.last_update, 0)
            .single()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| record.last_update.to_string());
        println!("{:<32} {:<40} {}", record.handle.as_str(), record.name, updated);
        println!("  {}", record.url);
    }

    if let Some(run) = storage.latest_run()? {
        println!(
            "\nLast run #{}: {} ({} of {} series succeeded)",
            run.id, run.status, run.succeeded, run.attempted
        );
    }

    Ok(())
}

/// Handles the main ingestion operation, once or on schedule
async fn handle_ingest(config: Config, once: bool) -> anyhow::Result<()> {
    let storage = open_storage(Path::new(&config.output.database_path))
        .context("Failed to open series database")?;
    let sink = FileFeedSink::new(&config.output.feed_dir);

    let coordinator = Arc::new(Coordinator::new(config, Arc::new(storage), Arc::new(sink))?);

    if once {
        let summary = coordinator.run().await?;
        tracing::info!(
            "Run completed: {} of {} series updated",
            summary.succeeded,
            summary.attempted
        );
        return Ok(());
    }

    let scheduler = Scheduler::new(coordinator)?;

    tokio::select! {
        _ = scheduler.run_forever() => {}
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            tracing::info!("Interrupted, shutting down");
        }
    }

    Ok(())
}
