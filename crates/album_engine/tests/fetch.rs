use std::time::Duration;

use album_core::{FetchSettings, NetworkErrorKind, RetryPolicy, SkipReason};
use album_engine::{fetch_with_retry, DocumentFetcher, ReqwestFetcher, UserAgentRotator};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher_with_agent(settings: FetchSettings) -> ReqwestFetcher {
    ReqwestFetcher::with_user_agents(settings, UserAgentRotator::new(vec!["agent-under-test".into()]))
        .expect("client builds")
}

#[tokio::test]
async fn fetcher_returns_html_with_browser_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s"))
        .and(header("user-agent", "agent-under-test"))
        .and(header("cache-control", "no-cache"))
        .and(header("accept-language", "zh-CN,zh;q=0.9,en;q=0.8"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><body>正文</body></html>", "text/html; charset=utf-8"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher_with_agent(FetchSettings::default());
    let html = fetcher
        .fetch(&format!("{}/s", server.uri()))
        .await
        .expect("fetch ok");
    assert_eq!(html, "<html><body>正文</body></html>");
}

#[tokio::test]
async fn http_error_status_is_classified_and_not_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = fetcher_with_agent(FetchSettings::default());
    let err = fetcher
        .fetch(&format!("{}/missing", server.uri()))
        .await
        .expect_err("404 must fail");
    assert_eq!(err.kind, NetworkErrorKind::HttpStatus(404));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn slow_response_is_classified_as_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout_ms: 200,
        ..FetchSettings::default()
    };
    let fetcher = fetcher_with_agent(settings);
    let err = fetcher
        .fetch(&format!("{}/slow", server.uri()))
        .await
        .expect_err("must time out");
    assert_eq!(err.kind, NetworkErrorKind::Timeout);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(2048)))
        .mount(&server)
        .await;

    let settings = FetchSettings {
        max_bytes: 1024,
        ..FetchSettings::default()
    };
    let fetcher = fetcher_with_agent(settings);
    let err = fetcher
        .fetch(&format!("{}/big", server.uri()))
        .await
        .expect_err("body over the limit");
    assert_eq!(err.kind, NetworkErrorKind::Other);
}

#[tokio::test]
async fn retry_wrapper_makes_one_attempt_for_http_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher_with_agent(FetchSettings::default());
    let policy = RetryPolicy {
        max_retries: 3,
        base_delay_ms: 0,
    };
    let reason = fetch_with_retry(&fetcher, &format!("{}/gone", server.uri()), &policy)
        .await
        .expect_err("404 is skipped");
    assert!(matches!(
        reason,
        SkipReason::Fetch(ref err) if err.kind == NetworkErrorKind::HttpStatus(404)
    ));
}
