//! Integration tests for aggregation: one tick end to end, feed rotation,
//! the failure threshold and cancellation.
//!
//! Each test gets its own in-memory SQLite database and wiremock server.

use gator::aggregator::{
    scrape_next_feed, AggregateError, Scheduler, SchedulerError, SchedulerState, FAILURE_THRESHOLD,
};
use gator::feed::{build_client, FetchError};
use gator::storage::{Database, Feed};
use pretty_assertions::assert_eq;
use std::time::Duration;
use tokio::sync::watch;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EXAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
    <title>Example</title>
    <link>https://example.com/</link>
    <description>Example feed</description>
    <item>
        <title>A &amp;amp; B</title>
        <link>https://example.com/a</link>
        <pubDate>Mon, 02 Jan 2006 15:04:05 -0700</pubDate>
    </item>
    <item>
        <title>C</title>
        <link>https://example.com/c</link>
        <description>Third letter</description>
    </item>
</channel></rss>"#;

fn rss_response() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(EXAMPLE_RSS)
        .insert_header("Content-Type", "application/rss+xml")
}

async fn setup(feeds: &[(&str, &str)]) -> (Database, Vec<Feed>) {
    let db = Database::open(":memory:").await.unwrap();
    let user = db.create_user("alice").await.unwrap();
    let mut created = Vec::new();
    for (name, url) in feeds {
        created.push(db.create_feed(name, url, user.id).await.unwrap());
    }
    (db, created)
}

/// Wait until the mock server has seen at least `count` requests.
async fn wait_for_requests(server: &MockServer, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let seen = server.received_requests().await.unwrap_or_default().len();
            if seen >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("mock server did not receive enough requests");
}

// ============================================================================
// Single tick
// ============================================================================

#[tokio::test]
async fn test_tick_stores_unescaped_posts_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss"))
        .respond_with(rss_response())
        .mount(&server)
        .await;

    let url = format!("{}/rss", server.uri());
    let (db, feeds) = setup(&[("Example", &url)]).await;
    let client = build_client().unwrap();

    let first = scrape_next_feed(&db, &client).await.unwrap();
    assert_eq!(first.feed_id, feeds[0].id);
    assert_eq!(first.items, 2);
    assert_eq!(first.inserted, 2);

    let second = scrape_next_feed(&db, &client).await.unwrap();
    assert_eq!(second.inserted, 0);

    let posts = db.get_posts_for_feed(feeds[0].id).await.unwrap();
    let titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["A & B", "C"]);
    assert_eq!(posts[0].published_at, Some(1_136_239_445_000));
    assert_eq!(posts[0].description, None);
    assert_eq!(posts[1].published_at, None);
    assert_eq!(posts[1].description.as_deref(), Some("Third letter"));
}

#[tokio::test]
async fn test_ticks_rotate_through_feeds_oldest_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(rss_response())
        .mount(&server)
        .await;

    let urls: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|p| format!("{}/{}", server.uri(), p))
        .collect();
    let (db, _) = setup(&[("a", &urls[0]), ("b", &urls[1]), ("c", &urls[2])]).await;
    let client = build_client().unwrap();

    let mut order = Vec::new();
    for _ in 0..4 {
        order.push(scrape_next_feed(&db, &client).await.unwrap().feed_name);
    }
    assert_eq!(order, vec!["a", "b", "c", "a"]);
}

#[tokio::test]
async fn test_feed_is_claimed_even_when_fetch_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let url = format!("{}/broken", server.uri());
    let (db, _) = setup(&[("Broken", &url)]).await;
    let client = build_client().unwrap();

    let err = scrape_next_feed(&db, &client).await.unwrap_err();
    assert!(matches!(
        err,
        AggregateError::Fetch {
            source: FetchError::HttpStatus(500),
            ..
        }
    ));

    let feed = db.get_feed_by_url(&url).await.unwrap();
    assert!(feed.last_fetched_at.is_some());
}

#[tokio::test]
async fn test_empty_store_reports_no_feeds() {
    let (db, _) = setup(&[]).await;
    let client = build_client().unwrap();

    let err = scrape_next_feed(&db, &client).await.unwrap_err();
    assert!(matches!(err, AggregateError::NoFeeds));
}

// ============================================================================
// Scheduler
// ============================================================================

#[tokio::test]
async fn test_three_consecutive_failures_are_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let url = format!("{}/rss", server.uri());
    let (db, _) = setup(&[("Broken", &url)]).await;
    let mut scheduler = Scheduler::new(db, build_client().unwrap(), Duration::from_millis(10));
    let (_tx, rx) = watch::channel(false);

    let err = scheduler.run(rx).await.unwrap_err();
    let SchedulerError::TooManyFailures { failures, last } = err;
    assert_eq!(failures, FAILURE_THRESHOLD);
    assert!(matches!(last, AggregateError::Fetch { .. }));
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
}

#[tokio::test]
async fn test_success_resets_failure_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(rss_response())
        .mount(&server)
        .await;

    let url = format!("{}/rss", server.uri());
    let (db, feeds) = setup(&[("Flaky", &url)]).await;
    let mut scheduler = Scheduler::new(
        db.clone(),
        build_client().unwrap(),
        Duration::from_millis(10),
    );
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        let result = scheduler.run(rx).await;
        (result, scheduler)
    });

    // Two failures, then successes; the threshold is never reached
    wait_for_requests(&server, 5).await;
    tx.send(true).unwrap();

    let (result, scheduler) = handle.await.unwrap();
    assert!(result.is_ok());
    assert_eq!(scheduler.consecutive_failures(), 0);
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert_eq!(db.get_posts_for_feed(feeds[0].id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_cancel_waits_for_in_flight_tick() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(rss_response().set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/rss", server.uri());
    let (db, feeds) = setup(&[("Slow", &url)]).await;
    let mut scheduler = Scheduler::new(db.clone(), build_client().unwrap(), Duration::from_secs(60));
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(async move { scheduler.run(rx).await });

    // Cancel while the response is still delayed
    wait_for_requests(&server, 1).await;
    tx.send(true).unwrap();

    handle.await.unwrap().unwrap();
    assert_eq!(db.get_posts_for_feed(feeds[0].id).await.unwrap().len(), 2);
}
