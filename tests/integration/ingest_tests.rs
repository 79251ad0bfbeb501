//! Integration tests for the ingestion pipeline
//!
//! These tests use wiremock to stand in for the publisher's site and run the
//! full listing → series cycle against real SQLite storage and feed files.

use chrono::{DateTime, TimeZone, Utc};
use sj_feeds::config::{
    Config, CrawlerConfig, FeedConfig, OutputConfig, ScheduleConfig, SourceConfig,
};
use sj_feeds::crawler::{Coordinator, FailureStage};
use sj_feeds::output::FileFeedSink;
use sj_feeds::storage::{SqliteStorage, Storage};
use sj_feeds::{FeedsError, RunState, SeriesHandle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING_PATH: &str = "/read/shonenjump/section/free-chapters";

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, dir: &Path) -> Config {
    Config {
        source: SourceConfig {
            base_url: base_url.to_string(),
            ..SourceConfig::default()
        },
        crawler: CrawlerConfig {
            politeness_delay_ms: 100, // Very short for testing
            series_retries: 0,
            ..CrawlerConfig::default()
        },
        schedule: ScheduleConfig::default(),
        output: OutputConfig {
            feed_dir: dir.join("rss").to_string_lossy().into_owned(),
            database_path: dir.join("feeds.db").to_string_lossy().into_owned(),
        },
        feed: FeedConfig::default(),
    }
}

fn run_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
}

fn listing_block(name: &str, handle: &str, chapter: u32, date: &str) -> String {
    format!(
        r#"<div class="o_sortable">
             <a class="o_chapters-link" href="/shonenjump/chapters/{handle}">
               <div class="type-center">{name}</div>
             </a>
             <a class="o_inner-link" href="/shonenjump/{handle}-chapter-{chapter}/chapter/{chapter}0">
               <span>Latest: {chapter}
               </span>
             </a>
             <span class="type-bs--sm">{date}</span>
           </div>"#
    )
}

fn chapter_row(label: &str, href: &str, link_text: &str, date: &str) -> String {
    format!(
        r#"<div class="o_sortable">
             <a class="o_chapter-container" href="{href}">{link_text}</a>
             <table><tr><td class="ch-num-list-spacing">{label}</td></tr></table>
             <div class="style-italic">{date}</div>
           </div>"#
    )
}

fn series_page(title: &str, rows: &[String]) -> String {
    format!(
        r#"<html><body>
             <img class="o_hero-media" src="/img/{title}.jpg">
             <h2 class="type-lg">{title}</h2>
             <div class="line-solid type-md">All about {title}.</div>
             <span class="disp-bl--bm">Story and Art by Someone</span>
             {}
           </body></html>"#,
        rows.join("\n")
    )
}

async fn mount_page(server: &MockServer, route: &str, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

/// Listing with two fresh series, one stale one, and one block without a date
async fn mount_listing(server: &MockServer) {
    let listing = format!(
        "<html><body>{}{}{}{}</body></html>",
        listing_block("Foo", "foo", 12, "March 1"),
        listing_block("Bar", "bar", 40, "March 8"),
        listing_block("Old", "old", 3, "January 5"),
        listing_block("Foo", "foo", 12, "")
    );
    mount_page(server, LISTING_PATH, 200, listing).await;
}

async fn mount_foo(server: &MockServer) {
    let rows = vec![
        chapter_row("Ch. 12", "/ch/foo-12", "Read", "March 1, 2024"),
        chapter_row("Ch. 11", "/ch/foo-11", "Join to Read", "February 23, 2024"),
        chapter_row("Ch. 10", "/ch/foo-10", "Read", "February 16, 2024"),
        chapter_row("Ch. 9", "/ch/foo-9", "Read", "February 9, 2024"),
        chapter_row("Ch. 8", "/join to read", "Read", "February 2, 2024"),
    ];
    mount_page(server, "/shonenjump/chapters/foo", 200, series_page("Foo", &rows)).await;
}

fn coordinator(config: Config) -> (Arc<Coordinator>, Arc<SqliteStorage>) {
    let storage = Arc::new(SqliteStorage::new(Path::new(&config.output.database_path)).unwrap());
    let sink = Arc::new(FileFeedSink::new(&config.output.feed_dir));
    let coordinator = Coordinator::new(config, storage.clone(), sink).unwrap();
    (Arc::new(coordinator), storage)
}

fn read_feed(dir: &Path, name: &str) -> String {
    std::fs::read_to_string(dir.join("rss").join(format!("{}.xml", name))).unwrap()
}

#[tokio::test]
async fn test_full_ingestion_run() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    mount_listing(&server).await;
    mount_foo(&server).await;
    mount_page(
        &server,
        "/shonenjump/chapters/bar",
        200,
        series_page("Bar", &[chapter_row("Ch. 40", "/ch/bar-40", "Read", "March 8, 2024")]),
    )
    .await;

    let (coordinator, storage) = coordinator(create_test_config(&server.uri(), temp.path()));
    let summary = coordinator.run_at(run_time()).await.unwrap();

    assert_eq!(summary.listing_entries, 3);
    assert_eq!(summary.retained, 2);
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(coordinator.state(), RunState::Done);

    let main = read_feed(temp.path(), "main");
    assert!(main.contains("<title>Foo - 12</title>"));
    assert!(main.contains("<title>Bar - 40</title>"));
    assert!(!main.contains("Old - 3"));
    assert!(main.contains(&format!(
        "{}/shonenjump/foo-chapter-12/chapter/120",
        server.uri()
    )));

    // Foo: first four rows only, the paywalled one skipped
    let foo = read_feed(temp.path(), "foo");
    assert_eq!(foo.matches("<entry>").count(), 3);
    assert!(foo.contains("<title>Foo - Ch. 12</title>"));
    assert!(!foo.contains("Ch. 11"));
    assert!(!foo.contains("Ch. 8"));
    assert!(foo.contains("<subtitle>All about Foo.</subtitle>"));
    assert!(foo.contains(&format!("<icon>{}/img/Foo.jpg</icon>", server.uri())));
    let order: Vec<_> = ["Ch. 12", "Ch. 10", "Ch. 9"]
        .iter()
        .map(|label| foo.find(&format!("Foo - {}<", label)).unwrap())
        .collect();
    assert!(order.windows(2).all(|w| w[0] < w[1]));

    let records = storage.list_all_series().unwrap();
    assert_eq!(records.len(), 2);
    let foo_record = storage
        .get_series(&SeriesHandle::new("foo").unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(foo_record.name, "Foo");
    assert_eq!(
        foo_record.url,
        format!("{}/shonenjump/chapters/foo", server.uri())
    );
    assert_eq!(foo_record.last_update, run_time().timestamp());
    assert_eq!(
        foo_record.image,
        Some(format!("{}/img/Foo.jpg", server.uri()))
    );

    let run = storage.latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunState::Done);
    assert_eq!((run.attempted, run.succeeded), (2, 2));
}

#[tokio::test]
async fn test_series_failure_does_not_fail_run() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    mount_listing(&server).await;
    mount_foo(&server).await;
    mount_page(&server, "/shonenjump/chapters/bar", 500, String::new()).await;

    let (coordinator, storage) = coordinator(create_test_config(&server.uri(), temp.path()));
    let summary = coordinator.run_at(run_time()).await.unwrap();

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].handle, "bar");
    assert_eq!(summary.failures[0].stage, FailureStage::Fetch);

    assert!(storage
        .get_series(&SeriesHandle::new("bar").unwrap())
        .unwrap()
        .is_none());
    assert!(!temp.path().join("rss").join("bar.xml").exists());

    // The aggregate feed still lists Bar's chapter
    assert!(read_feed(temp.path(), "main").contains("Bar - 40"));
    assert!(temp.path().join("rss").join("foo.xml").exists());
}

#[tokio::test]
async fn test_listing_failure_aborts_run() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    mount_page(&server, LISTING_PATH, 500, String::new()).await;

    let (coordinator, storage) = coordinator(create_test_config(&server.uri(), temp.path()));
    let result = coordinator.run_at(run_time()).await;

    assert!(matches!(result, Err(FeedsError::Transport(_))));
    assert_eq!(coordinator.state(), RunState::Aborted);
    assert!(!temp.path().join("rss").join("main.xml").exists());
    assert!(storage.list_all_series().unwrap().is_empty());
    assert_eq!(
        storage.latest_run().unwrap().unwrap().status,
        RunState::Aborted
    );
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let listing = format!(
        "<html><body>{}{}{}</body></html>",
        listing_block("Foo", "foo", 12, "March 1"),
        listing_block("Bar", "bar", 40, "March 8"),
        listing_block("Baz", "baz", 7, "March 5")
    );
    mount_page(&server, LISTING_PATH, 200, listing).await;
    mount_foo(&server).await;
    mount_page(
        &server,
        "/shonenjump/chapters/bar",
        200,
        series_page("Bar", &[chapter_row("Ch. 40", "/ch/bar-40", "Read", "March 8, 2024")]),
    )
    .await;
    // Every row paywalled: the series feed has no entries
    mount_page(
        &server,
        "/shonenjump/chapters/baz",
        200,
        series_page("Baz", &[chapter_row("Ch. 7", "/ch/baz-7", "Join to Read", "March 5, 2024")]),
    )
    .await;

    let (coordinator, storage) = coordinator(create_test_config(&server.uri(), temp.path()));
    let names = ["main", "foo", "bar", "baz"];
    let stable_fields = |storage: &SqliteStorage| -> Vec<_> {
        storage
            .list_all_series()
            .unwrap()
            .into_iter()
            .map(|r| (r.handle, r.name, r.url, r.image))
            .collect()
    };

    coordinator.run_at(run_time()).await.unwrap();
    let first: Vec<_> = names.iter().map(|name| read_feed(temp.path(), name)).collect();
    let first_records = stable_fields(storage.as_ref());

    // Same source HTML, later run
    coordinator
        .run_at(run_time() + chrono::Duration::hours(2))
        .await
        .unwrap();
    let second: Vec<_> = names.iter().map(|name| read_feed(temp.path(), name)).collect();

    assert_eq!(first, second);
    assert_eq!(first[3].matches("<entry>").count(), 0);
    assert_eq!(stable_fields(storage.as_ref()), first_records);
    assert_eq!(first_records.len(), 3);
}

#[tokio::test]
async fn test_empty_feeds_do_not_depend_on_run_time() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    mount_page(
        &server,
        LISTING_PATH,
        200,
        listing_block("Foo", "foo", 12, "March 8"),
    )
    .await;
    mount_page(
        &server,
        "/shonenjump/chapters/foo",
        200,
        series_page("Foo", &[chapter_row("Ch. 12", "/ch/foo-12", "Join to Read", "March 8, 2024")]),
    )
    .await;

    let (ingest, _storage) = coordinator(create_test_config(&server.uri(), temp.path()));

    ingest.run_at(run_time()).await.unwrap();
    let first = read_feed(temp.path(), "foo");
    ingest
        .run_at(run_time() + chrono::Duration::hours(2))
        .await
        .unwrap();
    let second = read_feed(temp.path(), "foo");

    assert_eq!(first, second);
    assert!(first.contains("<updated>1970-01-01T00:00:00Z</updated>"));

    // A listing with nothing inside the window gives an empty, equally stable main feed
    let stale = MockServer::start().await;
    let stale_dir = TempDir::new().unwrap();
    mount_page(
        &stale,
        LISTING_PATH,
        200,
        listing_block("Old", "old", 3, "January 5"),
    )
    .await;
    let (stale_ingest, _stale_storage) =
        coordinator(create_test_config(&stale.uri(), stale_dir.path()));

    stale_ingest.run_at(run_time()).await.unwrap();
    let first_main = read_feed(stale_dir.path(), "main");
    stale_ingest
        .run_at(run_time() + chrono::Duration::hours(2))
        .await
        .unwrap();

    assert_eq!(read_feed(stale_dir.path(), "main"), first_main);
    assert_eq!(first_main.matches("<entry>").count(), 0);
}

#[tokio::test]
async fn test_runs_do_not_overlap() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body></body></html>")
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let (coordinator, _storage) = coordinator(create_test_config(&server.uri(), temp.path()));
    let mut states = coordinator.subscribe();

    let background = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.run_at(run_time()).await })
    };

    states.changed().await.unwrap();
    assert_eq!(*states.borrow(), RunState::FetchingListing);
    assert!(coordinator.is_running());

    // A second caller waits for the first run instead of interleaving with it
    let second = coordinator.run_at(run_time()).await.unwrap();
    let first = background.await.unwrap().unwrap();

    assert_eq!(first.attempted, 0);
    assert_eq!(second.attempted, 0);
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(coordinator.state(), RunState::Done);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}
