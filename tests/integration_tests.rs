//! Integration tests using a mock HTTP server
//!
//! Exercises the full flow: requester → paginator → cursor → checkpoints.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use syncline::cursor::DatetimeCursor;
use syncline::decode::FieldPathSelector;
use syncline::engine::{Message, StreamReader};
use syncline::http::{
    DefaultErrorHandler, HttpRequester, HttpRequesterConfig, Requester, RequestSpec,
};
use syncline::pagination::{CursorPagination, OffsetIncrement, PaginationStrategy, Paginator};
use syncline::retriever::{AsyncJobConfig, AsyncRetriever, Retriever, SimpleRetriever};
use syncline::types::RequestOption;
use syncline::StreamSlice;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn requester_for(server: &MockServer) -> Arc<HttpRequester> {
    init_tracing();
    Arc::new(HttpRequester::with_config(
        HttpRequesterConfig::with_base_url(server.uri()).no_rate_limit(),
    ))
}

fn records(range: std::ops::Range<usize>) -> Vec<serde_json::Value> {
    range.map(|i| json!({"id": i})).collect()
}

// ============================================================================
// HttpRequester Tests
// ============================================================================

#[tokio::test]
async fn test_requester_decodes_json_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [{"id": 1, "name": "Alice"}, {"id": 2, "name": "Bob"}]
        })))
        .mount(&server)
        .await;

    let requester = requester_for(&server);
    let response = requester.send(&RequestSpec::get("/api/users")).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body["users"][0]["name"], "Alice");
}

#[tokio::test]
async fn test_requester_sends_headers_and_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/protected"))
        .and(header("Authorization", "Bearer test-token"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let requester = requester_for(&server);
    let request = RequestSpec::get("/api/protected")
        .header("Authorization", "Bearer test-token")
        .query("limit", "5");

    let response = requester.send(&request).await.unwrap();
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_requester_returns_error_statuses_for_classification() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let requester = requester_for(&server);
    let response = requester.send(&RequestSpec::get("/api/missing")).await.unwrap();

    // Non-2xx comes back as a decoded response, not an Err
    assert_eq!(response.status, 404);
    assert_eq!(response.text, "not found");
}

#[tokio::test]
async fn test_requester_keeps_raw_text_for_non_json_bodies() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/export"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"id\": 1}\n{\"id\": 2}\n"))
        .mount(&server)
        .await;

    let requester = requester_for(&server);
    let response = requester.send(&RequestSpec::get("/api/export")).await.unwrap();

    assert!(response.body.is_null());
    assert!(response.text.contains("{\"id\": 2}"));
}

// ============================================================================
// SimpleRetriever End-to-End Tests
// ============================================================================

#[tokio::test]
async fn test_offset_pagination_request_grid() {
    let server = MockServer::start().await;

    for (offset, page) in [
        ("0", records(0..50)),
        ("50", records(50..100)),
        ("100", records(100..113)),
    ] {
        Mock::given(method("GET"))
            .and(path("/items"))
            .and(query_param("offset", offset))
            .and(query_param("limit", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": page})))
            .expect(1)
            .mount(&server)
            .await;
    }

    let paginator = Paginator::new(
        PaginationStrategy::Offset(OffsetIncrement::new(50)),
        RequestOption::request_parameter("offset"),
    )
    .with_page_size_option(RequestOption::request_parameter("limit"));

    let retriever = SimpleRetriever::new(
        "items",
        requester_for(&server),
        RequestSpec::get("/items"),
        Box::new(FieldPathSelector::with_path("items")),
    )
    .with_paginator(paginator);

    let mut reader = StreamReader::new("items", retriever);
    let result = reader.read().await;

    assert!(result.is_success());
    assert_eq!(result.records().len(), 113);
    // The mock .expect(1) guards verify exactly three requests went out
}

#[tokio::test]
async fn test_retriever_retries_transient_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": [{"id": 1}]})),
        )
        .mount(&server)
        .await;

    let retriever = SimpleRetriever::new(
        "flaky",
        requester_for(&server),
        RequestSpec::get("/flaky"),
        Box::new(FieldPathSelector::with_path("data")),
    )
    .with_config(
        syncline::retriever::RetrieverConfig::new()
            .with_max_retries(3)
            .with_backoff(syncline::http::BackoffStrategy::constant(
                Duration::from_millis(10),
            )),
    );

    let mut reader = StreamReader::new("flaky", retriever);
    let result = reader.read().await;

    assert!(result.is_success());
    assert_eq!(result.records().len(), 1);
}

#[tokio::test]
async fn test_ignored_status_reads_as_empty_stream() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forbidden"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let retriever = SimpleRetriever::new(
        "forbidden",
        requester_for(&server),
        RequestSpec::get("/forbidden"),
        Box::new(FieldPathSelector::with_path("data")),
    )
    .with_error_handler(Box::new(DefaultErrorHandler::new().ignoring(vec![403])));

    let mut reader = StreamReader::new("forbidden", retriever);
    let result = reader.read().await;

    assert!(result.is_success());
    assert!(result.records().is_empty());
    // The zero-record run still checkpoints once
    assert_eq!(result.checkpoints().len(), 1);
}

#[tokio::test]
async fn test_incremental_sync_with_window_injection() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/events"))
        .and(query_param("since", "2024-01-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 1, "updated_at": "2024-01-01"}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/events"))
        .and(query_param("since", "2024-01-02"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 2, "updated_at": "2024-01-02"}]
        })))
        .mount(&server)
        .await;

    let cursor = DatetimeCursor::new("2024-01-01", "updated_at", "%Y-%m-%d")
        .unwrap()
        .with_end("2024-01-02")
        .unwrap()
        .with_step("P1D", "P1D")
        .unwrap()
        .with_start_time_option(RequestOption::request_parameter("since"))
        .with_end_time_option(RequestOption::request_parameter("until"));

    let retriever = SimpleRetriever::new(
        "events",
        requester_for(&server),
        RequestSpec::get("/events"),
        Box::new(FieldPathSelector::with_path("data")),
    )
    .with_cursor(Box::new(cursor));

    let mut reader = StreamReader::new("events", retriever);
    let result = reader.read().await;

    assert!(result.is_success());
    assert_eq!(result.records().len(), 2);

    // One checkpoint per slice; the last reflects the newest record
    let checkpoints = result.checkpoints();
    assert_eq!(checkpoints.len(), 2);
    assert_eq!(*checkpoints[1], json!({"updated_at": "2024-01-02"}));
}

#[tokio::test]
async fn test_cursor_pagination_token_in_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 1}],
            "next": "tok_2"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 2}],
            "next": null
        })))
        .mount(&server)
        .await;

    let paginator = Paginator::new(
        PaginationStrategy::Cursor(CursorPagination::from_response("next")),
        RequestOption::body_json("cursor"),
    );

    let mut retriever = SimpleRetriever::new(
        "search",
        requester_for(&server),
        RequestSpec::post("/search").json(json!({"q": "all"})),
        Box::new(FieldPathSelector::with_path("data")),
    )
    .with_paginator(paginator);

    let slice = StreamSlice::default();
    let results: Vec<_> = {
        use futures::StreamExt;
        retriever.read_records(&slice).collect().await
    };

    let values: Vec<_> = results.into_iter().collect::<syncline::Result<_>>().unwrap();
    assert_eq!(values, vec![json!({"id": 1}), json!({"id": 2})]);
}

#[tokio::test]
async fn test_per_partition_sync_over_parent_records() {
    use syncline::cursor::{CursorFactory, PerPartitionCursor};
    use syncline::partition::ParentRouter;

    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/children"))
        .and(query_param("parent_id", "p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 10, "updated_at": "2024-01-10"}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/children"))
        .and(query_param("parent_id", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 20, "updated_at": "2024-01-20"}]
        })))
        .mount(&server)
        .await;

    let router = ParentRouter::new(
        vec![json!({"id": "p1"}), json!({"id": "p2"})],
        "id",
        "parent_id",
    )
    .with_request_option(RequestOption::request_parameter("parent_id"));

    let prototype = DatetimeCursor::new("2024-01-01", "updated_at", "%Y-%m-%d")
        .unwrap()
        .with_end("2024-01-31")
        .unwrap();
    let cursor = PerPartitionCursor::new(Box::new(router), CursorFactory::new(prototype));

    let retriever = SimpleRetriever::new(
        "children",
        requester_for(&server),
        RequestSpec::get("/children"),
        Box::new(FieldPathSelector::with_path("data")),
    )
    .with_cursor(Box::new(cursor));

    let mut reader = StreamReader::new("children", retriever);
    let result = reader.read().await;

    assert!(result.is_success());
    assert_eq!(result.records().len(), 2);

    // One checkpoint per partition slice; the final one carries both
    // partitions' cursors
    let checkpoints = result.checkpoints();
    assert_eq!(checkpoints.len(), 2);
    let states = checkpoints[1]["states"].as_array().unwrap();
    assert_eq!(states.len(), 2);
}

// ============================================================================
// AsyncRetriever End-to-End Tests
// ============================================================================

#[tokio::test]
async fn test_async_job_extraction_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bulk/jobs"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "j1"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/bulk/jobs/j1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"state": "JobComplete"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/bulk/jobs/j1/results"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("{\"id\": 1}\n{\"id\": 2}\n{\"id\": 3}\n"),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/bulk/jobs/j1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let config = AsyncJobConfig::new(
        RequestSpec::post("/bulk/jobs"),
        "/bulk/jobs/{job_id}",
        "/bulk/jobs/{job_id}/results",
    )
    .with_polling(Duration::from_millis(10), Duration::from_secs(5))
    .with_cleanup_path("/bulk/jobs/{job_id}");

    let retriever = AsyncRetriever::new(
        "bulk_export",
        requester_for(&server),
        config,
        Box::new(syncline::decode::JsonlDecoder::new()),
    );

    let mut reader = StreamReader::new("bulk_export", retriever);
    let result = reader.read().await;

    assert!(result.is_success());
    assert_eq!(result.records().len(), 3);
}

#[tokio::test]
async fn test_async_job_server_failure_surfaces_with_context() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bulk/jobs"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "j2"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/bulk/jobs/j2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "Failed"})))
        .mount(&server)
        .await;

    let config = AsyncJobConfig::new(
        RequestSpec::post("/bulk/jobs"),
        "/bulk/jobs/{job_id}",
        "/bulk/jobs/{job_id}/results",
    )
    .with_polling(Duration::from_millis(10), Duration::from_secs(5));

    let retriever = AsyncRetriever::new(
        "bulk_export",
        requester_for(&server),
        config,
        Box::new(syncline::decode::JsonlDecoder::new()),
    );

    let mut reader = StreamReader::new("bulk_export", retriever);
    let result = reader.read().await;

    assert!(!result.is_success());
    let has_error_log = result.messages.iter().any(|m| {
        matches!(m, Message::Log { message, .. } if message.contains("bulk_export"))
    });
    assert!(has_error_log);
}
