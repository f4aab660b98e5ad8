use event_harvester::config::{
    Config, CrawlerConfig, HttpConfig, OutputConfig, RulesConfig, TargetEntry,
};
use event_harvester::crawler::{Coordinator, RecordingSleeper};
use event_harvester::storage::{EventStore, RunStatus, SqliteStorage};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling one listing query
fn create_test_config(target_url: String, db_path: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_pages: 5,
            request_delay_ms: 0,
            max_empty_pages: 3,
        },
        http: HttpConfig::default(),
        output: OutputConfig {
            database_path: db_path.display().to_string(),
            batch_size: 50,
        },
        rules: RulesConfig::default(),
        targets: vec![TargetEntry {
            url: target_url,
            max_pages: None,
        }],
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

const LISTING_PAGE: &str = r#"<html><body>
    <div class="search-results">
        <a data-testid="event-card-link" href="/e/jazz-night-tickets-1001"><h3>Jazz Night</h3></a>
        <a data-testid="event-card-link" href="/e/poetry-slam-tickets-2002?utm_source=list"><h3>Poetry Slam</h3></a>
        <a data-testid="event-card-link" href="/e/jazz-night-tickets-1001#tickets"><h3>Jazz Night</h3></a>
    </div>
</body></html>"#;

const EMPTY_LISTING_PAGE: &str =
    r#"<html><body><p>No events match your search.</p></body></html>"#;

const JAZZ_PAGE: &str = r#"<html><body>
    <h1 data-testid="event-title">Jazz Night</h1>
    <div data-testid="event-start-date">Saturday, October 12 · 7pm</div>
    <div data-testid="event-venue">The Blue Room</div>
    <div data-testid="event-description"><p>Live music.</p><p>Doors at 6.</p></div>
    <a data-testid="organizer-name" href="/o/blue-room-1">Blue Room Presents</a>
    <div data-testid="ticket-price">$15</div>
</body></html>"#;

const POETRY_PAGE: &str = r#"<html><body>
    <h1>Poetry Slam</h1>
    <time>Sunday, October 13</time>
    <div class="price">Free</div>
</body></html>"#;

/// Mounts a directory whose first listing page holds two events and whose
/// later pages are empty
async fn mount_directory(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/d/online/"))
        .and(query_param("page", "1"))
        .respond_with(html(LISTING_PAGE))
        .mount(mock_server)
        .await;

    for page in ["2", "3", "4"] {
        Mock::given(method("GET"))
            .and(path("/d/online/"))
            .and(query_param("page", page))
            .respond_with(html(EMPTY_LISTING_PAGE))
            .mount(mock_server)
            .await;
    }

    // Three empty pages in a row end the crawl before page 5
    Mock::given(method("GET"))
        .and(path("/d/online/"))
        .and(query_param("page", "5"))
        .respond_with(html(EMPTY_LISTING_PAGE))
        .expect(0)
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/e/jazz-night-tickets-1001"))
        .respond_with(html(JAZZ_PAGE))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/e/poetry-slam-tickets-2002"))
        .respond_with(html(POETRY_PAGE))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_full_harvest_single_target() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_directory(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("events.db");
    let config = create_test_config(format!("{}/d/online/", base_url), &db_path);

    let sleeper = Arc::new(RecordingSleeper::new());
    let mut coordinator = Coordinator::with_sleeper(config, "hash-1", sleeper.clone())
        .expect("Failed to create coordinator");
    let report = coordinator.run().await.expect("Harvest failed");

    assert_eq!(report.pages_visited, 4);
    assert_eq!(report.records_scraped, 2);
    assert_eq!(report.failed_details, 0);
    assert_eq!(report.summary.inserted, 2);
    assert_eq!(report.summary.updated, 0);
    assert_eq!(report.summary.errored, 0);
    // after page 1, after both details, after empty pages 2 and 3
    assert_eq!(sleeper.slept().len(), 5);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_events().unwrap(), 2);

    let jazz = storage
        .get_event(&format!("{}/e/jazz-night-tickets-1001", base_url))
        .unwrap()
        .expect("Jazz Night should be stored");
    assert_eq!(jazz.title, "Jazz Night");
    assert_eq!(jazz.date_text.as_deref(), Some("Saturday, October 12 · 7pm"));
    assert_eq!(jazz.location.as_deref(), Some("The Blue Room"));
    assert_eq!(jazz.description.as_deref(), Some("Live music.\nDoors at 6."));
    assert_eq!(jazz.organizer.as_deref(), Some("Blue Room Presents"));
    assert_eq!(jazz.price.as_deref(), Some("$15"));

    // Missing fields are stored as the empty sentinel, not dropped
    let poetry = storage
        .get_event(&format!("{}/e/poetry-slam-tickets-2002", base_url))
        .unwrap()
        .expect("Poetry Slam should be stored");
    assert_eq!(poetry.date_text.as_deref(), Some("Sunday, October 13"));
    assert_eq!(poetry.description.as_deref(), Some(""));
    assert_eq!(poetry.location.as_deref(), Some(""));
    assert_eq!(poetry.price.as_deref(), Some("Free"));

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "hash-1");
    assert_eq!(run.pages_visited, 4);
    assert_eq!(run.records_scraped, 2);
    assert_eq!(run.inserted, 2);
}

#[tokio::test]
async fn test_second_harvest_updates_instead_of_duplicating() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_directory(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("events.db");

    let first_config = create_test_config(format!("{}/d/online/", base_url), &db_path);
    let mut first = Coordinator::with_sleeper(first_config, "h", Arc::new(RecordingSleeper::new()))
        .expect("Failed to create coordinator");
    first.run().await.expect("First harvest failed");

    let second_config = create_test_config(format!("{}/d/online/", base_url), &db_path);
    let mut second =
        Coordinator::with_sleeper(second_config, "h", Arc::new(RecordingSleeper::new()))
            .expect("Failed to create coordinator");
    let report = second.run().await.expect("Second harvest failed");

    assert_eq!(report.summary.inserted, 0);
    assert_eq!(report.summary.updated, 2);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_events().unwrap(), 2);

    let jazz = storage
        .get_event(&format!("{}/e/jazz-night-tickets-1001", base_url))
        .unwrap()
        .unwrap();
    assert!(jazz.last_updated_at > jazz.first_seen_at);
}

#[tokio::test]
async fn test_unreachable_directory_completes_empty_run() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("events.db");
    let mut config = create_test_config(format!("{}/d/online/", mock_server.uri()), &db_path);
    config.http.max_retries = 1;

    let mut coordinator =
        Coordinator::with_sleeper(config, "h", Arc::new(RecordingSleeper::new()))
            .expect("Failed to create coordinator");
    let report = coordinator.run().await.expect("Harvest failed");

    // three failed listing pages count as three empty pages
    assert_eq!(report.pages_visited, 3);
    assert_eq!(report.records_scraped, 0);
    assert_eq!(report.summary.total(), 0);

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 6);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_events().unwrap(), 0);
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_failed_detail_page_skipped() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/d/online/"))
        .and(query_param("page", "1"))
        .respond_with(html(LISTING_PAGE))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/e/jazz-night-tickets-1001"))
        .respond_with(html(JAZZ_PAGE))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/e/poetry-slam-tickets-2002"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("events.db");
    let mut config = create_test_config(format!("{}/d/online/", base_url), &db_path);
    config.targets[0].max_pages = Some(1);

    let mut coordinator =
        Coordinator::with_sleeper(config, "h", Arc::new(RecordingSleeper::new()))
            .expect("Failed to create coordinator");
    let report = coordinator.run().await.expect("Harvest failed");

    assert_eq!(report.pages_visited, 1);
    assert_eq!(report.records_scraped, 1);
    assert_eq!(report.failed_details, 1);
    assert_eq!(report.summary.inserted, 1);
}
