use std::sync::atomic::Ordering;
use std::time::Duration;

use verdict_client::ReqwestTransport;
use verdict_core::config::FetchConfig;
use verdict_core::error::AppError;
use verdict_core::models::FetchOutcome;
use verdict_core::traits::{PageFetcher, Transport};

use crate::integration::common::{http_fetcher, quick_policy, refused_addr, spawn_server};

#[tokio::test]
async fn test_fetches_html_page() {
    let server = spawn_server().await;
    let (fetcher, reporter) = http_fetcher(&FetchConfig::default());

    let page = fetcher
        .fetch(&server.url("/page"), &quick_policy(3))
        .await
        .unwrap()
        .into_page()
        .unwrap();

    assert!(page.body.contains("Opinions released this term"));
    assert!(page.content_type().unwrap().starts_with("text/html"));
    assert_eq!(reporter.count("FetchSucceeded"), 1);
    assert_eq!(reporter.count("UnexpectedContentType"), 0);
}

#[tokio::test]
async fn test_retries_server_error_then_succeeds() {
    let server = spawn_server().await;
    let (fetcher, reporter) = http_fetcher(&FetchConfig::default());

    let outcome = fetcher
        .fetch(&server.url("/flaky"), &quick_policy(3))
        .await
        .unwrap();

    assert!(matches!(outcome, FetchOutcome::Success(_)));
    assert_eq!(server.hits.flaky.load(Ordering::SeqCst), 2);
    assert_eq!(reporter.backoff_waits(), vec![Duration::from_millis(10)]);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = spawn_server().await;
    let (fetcher, reporter) = http_fetcher(&FetchConfig::default());

    let err = fetcher
        .fetch(&server.url("/missing"), &quick_policy(3))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::HttpStatus { status: 404, .. }));
    assert_eq!(server.hits.missing.load(Ordering::SeqCst), 1);
    assert_eq!(reporter.count("PermanentFailure"), 1);
}

#[tokio::test]
async fn test_persistent_server_error_exhausts_retries() {
    let server = spawn_server().await;
    let (fetcher, reporter) = http_fetcher(&FetchConfig::default());

    let outcome = fetcher
        .fetch(&server.url("/unavailable"), &quick_policy(3))
        .await
        .unwrap();

    assert!(matches!(outcome, FetchOutcome::RetriesExhausted { attempts: 3 }));
    assert_eq!(server.hits.unavailable.load(Ordering::SeqCst), 3);
    assert_eq!(reporter.count("RetriesExhausted"), 1);
}

#[tokio::test]
async fn test_empty_body_is_invalid_input() {
    let server = spawn_server().await;
    let (fetcher, _) = http_fetcher(&FetchConfig::default());

    let err = fetcher
        .fetch(&server.url("/empty"), &quick_policy(1))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn test_redirect_loop_is_permanent() {
    let server = spawn_server().await;
    let (fetcher, _) = http_fetcher(&FetchConfig::default());

    let err = fetcher
        .fetch(&server.url("/loop"), &quick_policy(3))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::TooManyRedirects(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_follows_redirects() {
    let server = spawn_server().await;
    let (fetcher, _) = http_fetcher(&FetchConfig::default());

    let page = fetcher
        .fetch(&server.url("/moved"), &quick_policy(1))
        .await
        .unwrap()
        .into_page()
        .unwrap();

    assert!(page.body.contains("<h1>Opinions</h1>"));
}

#[tokio::test]
async fn test_timeout_is_transient() {
    let server = spawn_server().await;
    let config = FetchConfig::default().with_timeout(Duration::from_millis(200));
    let (fetcher, reporter) = http_fetcher(&config);

    let outcome = fetcher
        .fetch(&server.url("/slow"), &quick_policy(2))
        .await
        .unwrap();

    assert!(matches!(outcome, FetchOutcome::RetriesExhausted { attempts: 2 }));
    assert_eq!(reporter.count("AttemptFailed"), 2);
    assert!(reporter.contains("timed out"));
}

#[tokio::test]
async fn test_refused_connection_is_transient() {
    let addr = refused_addr().await;
    let transport = ReqwestTransport::new().unwrap();

    let err = transport.get(&format!("http://{addr}/")).await.unwrap_err();

    assert!(matches!(err, AppError::NetworkError(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_sends_configured_headers() {
    let server = spawn_server().await;
    let config = FetchConfig::default()
        .with_user_agent("verdict-test/1.0")
        .with_header("X-Trace", "abc123");
    let (fetcher, _) = http_fetcher(&config);

    let page = fetcher
        .fetch(&server.url("/headers"), &quick_policy(1))
        .await
        .unwrap()
        .into_page()
        .unwrap();

    assert!(page.body.contains("user-agent: verdict-test/1.0"));
    assert!(page.body.contains("x-trace: abc123"));
    assert!(page.body.contains("upgrade-insecure-requests: 1"));
    assert!(page.body.contains("accept-language: "));
}

#[tokio::test]
async fn test_non_html_content_type_only_warns() {
    let server = spawn_server().await;
    let (fetcher, reporter) = http_fetcher(&FetchConfig::default());

    let page = fetcher
        .fetch(&server.url("/json"), &quick_policy(1))
        .await
        .unwrap()
        .into_page()
        .unwrap();

    assert_eq!(page.body, r#"{"ok":true}"#);
    assert_eq!(reporter.count("UnexpectedContentType"), 1);
}
