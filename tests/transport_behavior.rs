//! Behavior-driven tests for the shared transport
//!
//! These tests verify HOW outbound calls behave under rate limiting and
//! transient upstream failure: budgeted callers suspend instead of failing,
//! transient statuses retry with backoff, and caller errors surface at once.

use std::time::Duration;

use polyscope_tests::{
    Arc, HttpError, HttpRequest, HttpResponse, RateBudget, RetryConfig, ScriptedHttpClient,
    SourceError, SourceErrorKind, Transport,
};
use polyscope_core::transport::TransportError;

fn fast_transport(client: Arc<ScriptedHttpClient>, max_retries: u32) -> Transport {
    Transport::new(
        client,
        RateBudget::per_minute(10_000),
        RetryConfig::fixed(Duration::from_millis(1), max_retries),
    )
}

// =============================================================================
// Rate Budget: Suspend, Never Fail
// =============================================================================

#[tokio::test]
async fn when_the_budget_is_spent_the_next_call_waits_for_the_window() {
    // Given: a budget of 2 calls per 200ms, already spent
    let budget = RateBudget::new(Duration::from_millis(200), 2);
    budget.acquire().await;
    budget.acquire().await;

    // When: a third caller asks for a slot
    let started = std::time::Instant::now();
    budget.acquire().await;

    // Then: the caller suspended until the window rolled; no error occurred
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[tokio::test]
async fn when_many_calls_share_one_transport_they_share_one_budget() {
    // Given: a transport allowing 3 calls per 300ms
    let client = Arc::new(ScriptedHttpClient::new(Vec::new()));
    let transport = Transport::new(
        Arc::clone(&client) as Arc<dyn polyscope_tests::HttpClient>,
        RateBudget::new(Duration::from_millis(300), 3),
        RetryConfig::no_retry(),
    );

    // When: four requests run back to back
    let started = std::time::Instant::now();
    for _ in 0..4 {
        transport
            .execute(HttpRequest::get("https://example.test/x"))
            .await
            .expect("all calls eventually succeed");
    }

    // Then: every call completed, and the fourth paid the window wait
    assert_eq!(client.request_count(), 4);
    assert!(started.elapsed() >= Duration::from_millis(50));
}

// =============================================================================
// Retry: Transient Failures
// =============================================================================

#[tokio::test]
async fn when_the_upstream_stumbles_twice_the_third_attempt_succeeds() {
    // Given: two 500s followed by a healthy answer
    let client = Arc::new(ScriptedHttpClient::new(vec![
        Ok(HttpResponse {
            status: 500,
            body: String::new(),
        }),
        Ok(HttpResponse {
            status: 500,
            body: String::new(),
        }),
        Ok(HttpResponse::ok_json(r#"{"ok":true}"#)),
    ]));
    let transport = fast_transport(Arc::clone(&client), 3);

    // When: the request is executed
    let response = transport
        .execute(HttpRequest::get("https://example.test/x"))
        .await
        .expect("third attempt succeeds");

    // Then: the caller sees only the final success
    assert_eq!(response.status, 200);
    assert_eq!(client.request_count(), 3);
}

#[tokio::test]
async fn when_an_uncommon_5xx_answers_it_is_still_treated_as_transient() {
    // Given: a 505 followed by a healthy answer
    let client = Arc::new(ScriptedHttpClient::new(vec![
        Ok(HttpResponse {
            status: 505,
            body: String::new(),
        }),
        Ok(HttpResponse::ok_json(r#"{"ok":true}"#)),
    ]));
    let transport = fast_transport(Arc::clone(&client), 3);

    // When: the request is executed
    let response = transport
        .execute(HttpRequest::get("https://example.test/x"))
        .await
        .expect("server-side failures are transient");

    // Then: the retry recovered; the 505 never surfaced
    assert_eq!(response.status, 200);
    assert_eq!(client.request_count(), 2);
}

#[tokio::test]
async fn when_every_attempt_fails_the_final_cause_is_reported() {
    let client = Arc::new(ScriptedHttpClient::new(vec![
        Ok(HttpResponse {
            status: 503,
            body: String::new(),
        });
        4
    ]));
    let transport = fast_transport(Arc::clone(&client), 3);

    let err = transport
        .execute(HttpRequest::get("https://example.test/x"))
        .await
        .expect_err("retries must run out");

    assert!(matches!(
        err,
        TransportError::RetriesExhausted { attempts: 4, .. }
    ));
    assert_eq!(client.request_count(), 4);
}

#[tokio::test]
async fn when_the_request_itself_is_wrong_no_retry_is_attempted() {
    // Given: a 400 answer, which retrying can never fix
    let client = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse {
        status: 400,
        body: String::from("bad token id"),
    })]));
    let transport = fast_transport(Arc::clone(&client), 3);

    // When: the request is executed
    let err = transport
        .execute(HttpRequest::get("https://example.test/x"))
        .await
        .expect_err("caller error");

    // Then: exactly one attempt was made
    assert!(matches!(err, TransportError::Status { status: 400, .. }));
    assert_eq!(client.request_count(), 1);
}

#[tokio::test]
async fn when_retryable_network_errors_persist_they_exhaust_like_statuses() {
    let client = Arc::new(ScriptedHttpClient::new(vec![
        Err(HttpError::new("connection reset"));
        3
    ]));
    let transport = fast_transport(Arc::clone(&client), 2);

    let err = transport
        .execute(HttpRequest::get("https://example.test/x"))
        .await
        .expect_err("network never recovers");

    assert!(matches!(
        err,
        TransportError::RetriesExhausted { attempts: 3, .. }
    ));
}

// =============================================================================
// Error Translation: Transport to Source
// =============================================================================

#[tokio::test]
async fn when_rate_limit_answers_persist_the_source_error_says_so() {
    // Given: nothing but 429s
    let client = Arc::new(ScriptedHttpClient::new(vec![
        Ok(HttpResponse {
            status: 429,
            body: String::new(),
        });
        3
    ]));
    let transport = fast_transport(client, 2);

    // When: the exhausted transport error is translated for callers
    let err = transport
        .execute(HttpRequest::get("https://example.test/x"))
        .await
        .expect_err("must exhaust");
    let source_err = SourceError::from(err);

    // Then: the classification names the rate limit, and stays retryable
    assert_eq!(source_err.kind(), SourceErrorKind::RateLimited);
    assert!(source_err.retryable());
}

#[tokio::test]
async fn when_the_upstream_stays_down_the_source_error_is_unavailable() {
    let client = Arc::new(ScriptedHttpClient::new(vec![
        Ok(HttpResponse {
            status: 502,
            body: String::new(),
        });
        2
    ]));
    let transport = fast_transport(client, 1);

    let err = transport
        .execute(HttpRequest::get("https://example.test/x"))
        .await
        .expect_err("must exhaust");

    assert_eq!(SourceError::from(err).kind(), SourceErrorKind::Unavailable);
}
