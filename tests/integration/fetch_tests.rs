use event_harvester::config::HttpConfig;
use event_harvester::crawler::{EventSource, FetchCause, Fetcher, RecordingSleeper, SiteScanner};
use event_harvester::extract::load_rules;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

#[tokio::test]
async fn test_server_error_retried_until_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/e/broken-event-tickets-1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&mock_server)
        .await;

    let sleeper = Arc::new(RecordingSleeper::new());
    let fetcher = Fetcher::with_sleeper(&HttpConfig::default(), sleeper.clone()).unwrap();
    let url = Url::parse(&format!("{}/e/broken-event-tickets-1", mock_server.uri())).unwrap();

    let failure = fetcher.fetch(&url).await.unwrap_err();

    assert_eq!(failure.attempts, 4);
    assert_eq!(failure.cause, FetchCause::Status(500));
    assert_eq!(
        sleeper.slept(),
        vec![
            Duration::from_secs(2),
            Duration::from_secs(3),
            Duration::from_secs(5)
        ]
    );
}

#[tokio::test]
async fn test_success_after_transient_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/e/flaky-event-tickets-2"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/e/flaky-event-tickets-2"))
        .respond_with(html("<html><body><h1>Back up</h1></body></html>"))
        .mount(&mock_server)
        .await;

    let sleeper = Arc::new(RecordingSleeper::new());
    let fetcher = Fetcher::with_sleeper(&HttpConfig::default(), sleeper.clone()).unwrap();
    let url = Url::parse(&format!("{}/e/flaky-event-tickets-2", mock_server.uri())).unwrap();

    let document = fetcher.fetch(&url).await.unwrap();

    assert_eq!(document.status_code, 200);
    assert!(document.body.contains("Back up"));
    assert_eq!(sleeper.slept(), vec![Duration::from_secs(2)]);
}

#[tokio::test]
async fn test_not_found_counts_as_failure_with_configured_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/e/gone-event-tickets-3"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&mock_server)
        .await;

    let config = HttpConfig {
        max_retries: 1,
        ..HttpConfig::default()
    };
    let sleeper = Arc::new(RecordingSleeper::new());
    let fetcher = Fetcher::with_sleeper(&config, sleeper.clone()).unwrap();
    let url = Url::parse(&format!("{}/e/gone-event-tickets-3", mock_server.uri())).unwrap();

    let failure = fetcher.fetch(&url).await.unwrap_err();

    assert_eq!(failure.attempts, 2);
    assert_eq!(failure.cause, FetchCause::Status(404));
    assert_eq!(sleeper.slept().len(), 1);
}

#[tokio::test]
async fn test_browser_headers_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .and(header_exists("accept-language"))
        .and(header("upgrade-insecure-requests", "1"))
        .respond_with(html("<html></html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher =
        Fetcher::with_sleeper(&HttpConfig::default(), Arc::new(RecordingSleeper::new())).unwrap();
    let url = Url::parse(&format!("{}/page", mock_server.uri())).unwrap();

    assert!(fetcher.fetch(&url).await.is_ok());
}

#[tokio::test]
async fn test_site_scanner_resolves_listing_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/d/online/"))
        .and(query_param("page", "1"))
        .respond_with(html(
            r#"<html><body>
                <a data-testid="event-card-link" href="/e/jazz-night-tickets-1001?aff=ebdssbdestsearch">
                    <h3>Jazz Night</h3>
                </a>
                <a data-testid="event-card-link" href="/d/online/music/">Browse music</a>
            </body></html>"#,
        ))
        .mount(&mock_server)
        .await;

    let fetcher =
        Fetcher::with_sleeper(&HttpConfig::default(), Arc::new(RecordingSleeper::new())).unwrap();
    let scanner = SiteScanner::new(fetcher, load_rules(None).unwrap());
    let page = Url::parse(&format!("{}/d/online/?page=1", base_url)).unwrap();

    let listings = scanner.listings(&page).await;

    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].title, "Jazz Night");
    assert_eq!(
        listings[0].address.as_str(),
        format!("{}/e/jazz-night-tickets-1001", base_url)
    );
}

#[tokio::test]
async fn test_site_scanner_unavailable_detail_is_none() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    let sleeper = Arc::new(RecordingSleeper::new());
    let fetcher = Fetcher::with_sleeper(&HttpConfig::default(), sleeper.clone()).unwrap();
    let scanner = SiteScanner::new(fetcher, load_rules(None).unwrap());
    let address = Url::parse(&format!("{}/e/lost-event-tickets-9", mock_server.uri())).unwrap();

    assert!(scanner.detail(&address).await.is_none());
    assert_eq!(sleeper.slept().len(), 3);
}

#[tokio::test]
async fn test_refused_connection_retried_until_exhausted() {
    // Bind then release a port so nothing is listening on it
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = HttpConfig {
        max_retries: 2,
        ..HttpConfig::default()
    };
    let sleeper = Arc::new(RecordingSleeper::new());
    let fetcher = Fetcher::with_sleeper(&config, sleeper.clone()).unwrap();
    let url = Url::parse(&format!("http://127.0.0.1:{}/e/closed-event-tickets-4", port)).unwrap();

    let failure = fetcher.fetch(&url).await.unwrap_err();

    assert_eq!(failure.attempts, 3);
    assert_eq!(failure.cause, FetchCause::Connect);
    assert_eq!(
        sleeper.slept(),
        vec![Duration::from_secs(2), Duration::from_secs(3)]
    );
}

#[tokio::test]
async fn test_slow_response_times_out_and_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/e/slow-event-tickets-5"))
        .respond_with(html("<html></html>").set_delay(Duration::from_secs(3)))
        .expect(2)
        .mount(&mock_server)
        .await;

    let config = HttpConfig {
        timeout_secs: 1,
        max_retries: 1,
        ..HttpConfig::default()
    };
    let sleeper = Arc::new(RecordingSleeper::new());
    let fetcher = Fetcher::with_sleeper(&config, sleeper.clone()).unwrap();
    let url = Url::parse(&format!("{}/e/slow-event-tickets-5", mock_server.uri())).unwrap();

    let failure = fetcher.fetch(&url).await.unwrap_err();

    assert_eq!(failure.attempts, 2);
    assert_eq!(failure.cause, FetchCause::Timeout);
    assert_eq!(sleeper.slept(), vec![Duration::from_secs(2)]);
}
