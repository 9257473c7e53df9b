use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use tokio::net::TcpListener;

use verdict_client::{Extractor, HttpFetcher, ReqwestTransport};
use verdict_core::config::FetchConfig;
use verdict_core::models::RetryPolicy;
use verdict_core::testutil::RecordingReporter;

pub const PAGE_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>Listing</title></head>
<body>
    <h1>Opinions</h1>
    <p>Opinions released this term are listed below.</p>
    <p></p>
    <a href="https://other.org/about">About</a>
    <a href="/opinions/1">First</a>
    <a href="opinions/2">Second</a>
</body>
</html>"#;

pub const YEAR_HTML: &str = r#"<html><body>
    <a href="/court/us-supreme-court/years/2018">2018</a>
    <a href="/us-supreme-court/18-1234.html">A v. B</a>
    <a href="/us-supreme-court/18-99.html">C v. D</a>
</body></html>"#;

/// Request counters per route.
#[derive(Clone, Default)]
pub struct Hits {
    pub flaky: Arc<AtomicUsize>,
    pub missing: Arc<AtomicUsize>,
    pub unavailable: Arc<AtomicUsize>,
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub hits: Hits,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

/// Serve the test routes on an ephemeral local port.
pub async fn spawn_server() -> TestServer {
    let hits = Hits::default();
    let app = Router::new()
        .route("/page", get(|| async { Html(PAGE_HTML) }))
        .route("/years/2019", get(|| async { Html(YEAR_HTML) }))
        .route("/flaky", get(flaky))
        .route("/missing", get(missing))
        .route("/unavailable", get(unavailable))
        .route("/empty", get(|| async { Html("") }))
        .route("/loop", get(|| async { Redirect::temporary("/loop") }))
        .route("/moved", get(|| async { Redirect::permanent("/page") }))
        .route("/slow", get(slow))
        .route("/headers", get(echo_headers))
        .route("/json", get(|| async { axum::Json(serde_json::json!({"ok": true})) }))
        .with_state(hits.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });

    TestServer { addr, hits }
}

/// An address nothing is listening on.
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    listener.local_addr().expect("Failed to read local addr")
}

pub fn quick_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy::new(max_retries, 0.01).expect("valid policy")
}

pub fn http_fetcher(config: &FetchConfig) -> (HttpFetcher<RecordingReporter>, RecordingReporter) {
    let reporter = RecordingReporter::new();
    let fetcher = ReqwestTransport::with_config(config)
        .expect("Failed to build transport")
        .into_fetcher(reporter.clone());
    (fetcher, reporter)
}

pub fn http_extractor() -> (
    Extractor<HttpFetcher<RecordingReporter>, RecordingReporter>,
    RecordingReporter,
) {
    let (fetcher, reporter) = http_fetcher(&FetchConfig::default());
    let extractor = Extractor::new(fetcher, reporter.clone()).with_policy(quick_policy(2));
    (extractor, reporter)
}

async fn flaky(State(hits): State<Hits>) -> Response {
    if hits.flaky.fetch_add(1, Ordering::SeqCst) == 0 {
        StatusCode::SERVICE_UNAVAILABLE.into_response()
    } else {
        Html(PAGE_HTML).into_response()
    }
}

async fn missing(State(hits): State<Hits>) -> StatusCode {
    hits.missing.fetch_add(1, Ordering::SeqCst);
    StatusCode::NOT_FOUND
}

async fn unavailable(State(hits): State<Hits>) -> StatusCode {
    hits.unavailable.fetch_add(1, Ordering::SeqCst);
    StatusCode::BAD_GATEWAY
}

async fn slow() -> Html<&'static str> {
    tokio::time::sleep(Duration::from_secs(3)).await;
    Html(PAGE_HTML)
}

async fn echo_headers(headers: HeaderMap) -> impl IntoResponse {
    let mut lines: Vec<String> = headers
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value.to_str().unwrap_or_default()))
        .collect();
    lines.sort();
    (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        format!("<html><body><pre>{}</pre></body></html>", lines.join("\n")),
    )
}
