//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::AppError;
use crate::events::{Level, ScrapeEvent, ScrapeReporter};
use crate::models::{FetchOutcome, FetchedPage, RawResponse, RetryPolicy};
use crate::traits::{PageFetcher, Transport};

/// A 200 response with an HTML content type.
pub fn html_response(body: &str) -> RawResponse {
    RawResponse {
        status: 200,
        headers: vec![(
            "Content-Type".to_string(),
            "text/html; charset=utf-8".to_string(),
        )],
        body: body.to_string(),
    }
}

/// A response with the given status and a short HTML body.
pub fn status_response(status: u16) -> RawResponse {
    RawResponse {
        status,
        headers: vec![("Content-Type".to_string(), "text/html".to_string())],
        body: format!("<html><body>status {status}</body></html>"),
    }
}

// ---------------------------------------------------------------------------
// MockTransport
// ---------------------------------------------------------------------------

/// Mock transport that replays a queue of responses.
#[derive(Clone)]
pub struct MockTransport {
    /// Each call pops the first element. If empty, returns a default page.
    responses: Arc<Mutex<Vec<Result<RawResponse, AppError>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockTransport {
    pub fn new(html: &str) -> Self {
        Self::with_responses(vec![Ok(html_response(html))])
    }

    pub fn with_responses(responses: Vec<Result<RawResponse, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, AppError> {
        self.calls.lock().unwrap().push(url.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(html_response("<html><body>default</body></html>"))
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockPageFetcher
// ---------------------------------------------------------------------------

/// Mock page fetcher that returns configurable outcomes without retrying.
#[derive(Clone)]
pub struct MockPageFetcher {
    outcomes: Arc<Mutex<Vec<Result<FetchOutcome, AppError>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockPageFetcher {
    /// Succeeds once with the given HTML body.
    pub fn new(html: &str) -> Self {
        Self::with_outcomes(vec![Ok(FetchOutcome::Success(FetchedPage {
            url: String::new(),
            headers: vec![("Content-Type".to_string(), "text/html".to_string())],
            body: html.to_string(),
        }))])
    }

    pub fn exhausted() -> Self {
        Self::with_outcomes(vec![Ok(FetchOutcome::RetriesExhausted { attempts: 3 })])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_outcomes(vec![Err(error)])
    }

    pub fn with_outcomes(outcomes: Vec<Result<FetchOutcome, AppError>>) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(outcomes)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl PageFetcher for MockPageFetcher {
    async fn fetch(&self, url: &str, _policy: &RetryPolicy) -> Result<FetchOutcome, AppError> {
        self.calls.lock().unwrap().push(url.to_string());
        let mut outcomes = self.outcomes.lock().unwrap();
        let outcome = if outcomes.is_empty() {
            Ok(FetchOutcome::RetriesExhausted { attempts: 1 })
        } else {
            outcomes.remove(0)
        };
        // Stamp the requested URL onto canned pages.
        outcome.map(|outcome| match outcome {
            FetchOutcome::Success(mut page) => {
                if page.url.is_empty() {
                    page.url = url.to_string();
                }
                FetchOutcome::Success(page)
            }
            other => other,
        })
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// An owned snapshot of a reported event.
#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub level: Level,
    /// Variant name, e.g. `BackoffWait`.
    pub name: String,
    pub detail: String,
    pub wait: Option<Duration>,
}

/// Reporter that captures every event for later assertions.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|e| e.name == name).count()
    }

    pub fn backoff_waits(&self) -> Vec<Duration> {
        self.events().iter().filter_map(|e| e.wait).collect()
    }

    /// True if any captured diagnostic mentions `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.events().iter().any(|e| e.detail.contains(needle))
    }
}

impl ScrapeReporter for RecordingReporter {
    fn report(&self, event: ScrapeEvent<'_>) {
        let debug = format!("{event:?}");
        let name = debug
            .split(|c: char| c == ' ' || c == '{')
            .next()
            .unwrap_or_default()
            .to_string();
        let detail = match event {
            ScrapeEvent::AttemptFailed { error, .. }
            | ScrapeEvent::PermanentFailure { error, .. }
            | ScrapeEvent::ParseFailed { error, .. }
            | ScrapeEvent::ExtractionFailed { error, .. } => format!("{debug}: {error}"),
            _ => debug,
        };
        let wait = match event {
            ScrapeEvent::BackoffWait { wait, .. } => Some(wait),
            _ => None,
        };
        self.events.lock().unwrap().push(RecordedEvent {
            level: event.level(),
            name,
            detail,
            wait,
        });
    }
}
