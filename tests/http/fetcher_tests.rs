// Fetcher behaviour against a mock server: offset pagination, status
// handling and the retry client.

use chargetap::config::Retry;
use chargetap::http::Http;
use chargetap::http::fetcher::{
    ErrorFilter, PageOutcome, PaginatedFetcher, Pagination, RecordPath,
};
use chargetap::utils::http_retry::build_client_with_retry;
use serde_json::json;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(server: &MockServer) -> PaginatedFetcher {
    let client = build_client_with_retry(Http::new(server.uri()).build_client(), &Retry::disabled());
    PaginatedFetcher::new(client, format!("{}/api/v2", server.uri()))
        .with_pagination(Pagination::chargebee())
        .with_page_size(2)
        .with_record_path(RecordPath::chargebee("subscription"))
}

#[tokio::test]
async fn test_follows_next_offset_until_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/subscriptions"))
        .and(query_param("limit", "2"))
        .and(query_param_is_missing("offset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [{"subscription": {"id": "a"}}, {"subscription": {"id": "b"}}],
            "next_offset": "tok-1"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/subscriptions"))
        .and(query_param("offset", "tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [{"subscription": {"id": "c"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let f = fetcher(&server);
    let records = f.fetch_all("subscriptions", &[]).await.unwrap();

    let ids: Vec<_> = records.iter().map(|r| r["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    let stats = f.stats();
    assert_eq!(stats.success_count, 2);
    assert_eq!(stats.total_items, 3);
}

#[tokio::test]
async fn test_repeated_offset_is_a_pagination_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/subscriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [{"subscription": {"id": "a"}}],
            "next_offset": "same"
        })))
        .mount(&server)
        .await;

    let err = fetcher(&server)
        .fetch_all("subscriptions", &[])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Pagination error"));
}

#[tokio::test]
async fn test_ignored_status_yields_no_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/subscriptions/x/retrieve_with_scheduled_changes"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let f = fetcher(&server).with_error_filter(ErrorFilter::new().ignore(404));
    let outcome = f
        .fetch_page("subscriptions/x/retrieve_with_scheduled_changes", &[], None)
        .await
        .unwrap();
    assert!(matches!(outcome, PageOutcome::Ignored { status: 404 }));

    let records = f
        .fetch_all("subscriptions/x/retrieve_with_scheduled_changes", &[])
        .await
        .unwrap();
    assert!(records.is_empty());
    assert_eq!(f.stats().ignored_count, 2);
}

#[tokio::test]
async fn test_failing_status_carries_the_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/subscriptions"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_request"))
        .mount(&server)
        .await;

    let err = fetcher(&server)
        .fetch_all("subscriptions", &[])
        .await
        .unwrap_err();
    match err {
        chargetap::errors::ChargetapError::HttpStatus { status, body, url } => {
            assert_eq!(status, 400);
            assert_eq!(body, "invalid_request");
            assert!(url.ends_with("/api/v2/subscriptions"));
        }
        other => panic!("expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/subscriptions"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/subscriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [{"subscription": {"id": "a"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let retry = Retry {
        max_retries: 2,
        min_delay_ms: 1,
        max_delay_ms: 5,
    };
    let client = build_client_with_retry(Http::new(server.uri()).build_client(), &retry);
    let f = PaginatedFetcher::new(client, format!("{}/api/v2", server.uri()))
        .with_pagination(Pagination::chargebee())
        .with_record_path(RecordPath::chargebee("subscription"));

    let records = f.fetch_all("subscriptions", &[]).await.unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_max_retries_counts_requests_after_the_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/subscriptions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let retry = Retry {
        max_retries: 1,
        min_delay_ms: 1,
        max_delay_ms: 5,
    };
    let client = build_client_with_retry(Http::new(server.uri()).build_client(), &retry);
    let f = PaginatedFetcher::new(client, format!("{}/api/v2", server.uri()));

    let err = f.fetch_all("subscriptions", &[]).await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_disabled_retry_sends_a_single_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/subscriptions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = fetcher(&server)
        .fetch_all("subscriptions", &[])
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_bad_request_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/subscriptions"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let retry = Retry {
        max_retries: 3,
        min_delay_ms: 1,
        max_delay_ms: 5,
    };
    let client = build_client_with_retry(Http::new(server.uri()).build_client(), &retry);
    let f = PaginatedFetcher::new(client, format!("{}/api/v2", server.uri()));

    assert_eq!(
        f.fetch_all("subscriptions", &[]).await.unwrap_err().status(),
        Some(400)
    );
}
