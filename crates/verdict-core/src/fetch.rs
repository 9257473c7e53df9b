//! Retrying page fetcher.
//!
//! Wraps any [`Transport`] with scheme validation, status classification,
//! and exponential backoff. Transient failures (timeouts, dropped
//! connections, 5xx) are retried until the policy runs out, at which point
//! the fetch resolves to [`FetchOutcome::RetriesExhausted`] instead of an
//! error. Everything else is returned as `Err` on the spot.

use crate::error::AppError;
use crate::events::{ScrapeEvent, ScrapeReporter};
use crate::models::{FetchOutcome, FetchedPage, RetryPolicy};
use crate::traits::{PageFetcher, Transport};

/// URL prefixes the fetcher accepts.
pub const ACCEPTED_SCHEMES: [&str; 2] = ["http://", "https://"];

const HTML_CONTENT_TYPES: [&str; 2] = ["text/html", "application/xhtml+xml"];

/// Reject anything that does not start with an accepted scheme prefix.
pub fn validate_url(url: &str) -> Result<(), AppError> {
    if ACCEPTED_SCHEMES
        .iter()
        .any(|scheme| url.starts_with(scheme))
    {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!("Invalid URL format: {url}")))
    }
}

/// True if the declared content type looks like an HTML document.
pub fn is_html_content_type(content_type: &str) -> bool {
    let lowered = content_type.to_ascii_lowercase();
    HTML_CONTENT_TYPES.iter().any(|ct| lowered.contains(ct))
}

/// [`PageFetcher`] that retries transient transport failures with backoff.
#[derive(Clone)]
pub struct RetryingFetcher<T, R> {
    transport: T,
    reporter: R,
}

impl<T, R> RetryingFetcher<T, R>
where
    T: Transport,
    R: ScrapeReporter + Clone,
{
    pub fn new(transport: T, reporter: R) -> Self {
        Self {
            transport,
            reporter,
        }
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// One request, classified. `Ok` only for a 2xx with a non-empty body.
    async fn attempt(&self, url: &str) -> Result<FetchedPage, AppError> {
        let response = self.transport.get(url).await?;

        if !(200..300).contains(&response.status) {
            return Err(AppError::HttpStatus {
                status: response.status,
                url: url.to_string(),
            });
        }

        let content_type = response.header("content-type");
        if !content_type.is_some_and(is_html_content_type) {
            self.reporter.report(ScrapeEvent::UnexpectedContentType { url, content_type });
        }

        if response.body.is_empty() {
            return Err(AppError::InvalidInput("Empty response received".into()));
        }

        Ok(FetchedPage {
            url: url.to_string(),
            headers: response.headers,
            body: response.body,
        })
    }
}

impl<T, R> PageFetcher for RetryingFetcher<T, R>
where
    T: Transport,
    R: ScrapeReporter + Clone,
{
    async fn fetch(&self, url: &str, policy: &RetryPolicy) -> Result<FetchOutcome, AppError> {
        if let Err(error) = validate_url(url) {
            self.reporter
                .report(ScrapeEvent::PermanentFailure { url, error: &error });
            return Err(error);
        }

        let max_attempts = policy.max_retries;
        for attempt in 1..=max_attempts {
            if let Some(wait) = policy.delay_before(attempt) {
                self.reporter.report(ScrapeEvent::BackoffWait {
                    url,
                    next_attempt: attempt,
                    wait,
                });
                tokio::time::sleep(wait).await;
            }

            self.reporter.report(ScrapeEvent::FetchAttempt {
                url,
                attempt,
                max_attempts,
            });

            match self.attempt(url).await {
                Ok(page) => {
                    self.reporter.report(ScrapeEvent::FetchSucceeded {
                        url,
                        attempt,
                        bytes: page.body.len(),
                    });
                    return Ok(FetchOutcome::Success(page));
                }
                Err(error) => {
                    self.reporter.report(ScrapeEvent::AttemptFailed {
                        url,
                        attempt,
                        error: &error,
                    });
                    if !error.is_retryable() {
                        self.reporter
                            .report(ScrapeEvent::PermanentFailure { url, error: &error });
                        return Err(error);
                    }
                }
            }
        }

        self.reporter.report(ScrapeEvent::RetriesExhausted {
            url,
            attempts: max_attempts,
        });
        Ok(FetchOutcome::RetriesExhausted {
            attempts: max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::{RawResponse, MAX_BACKOFF};
    use crate::testutil::*;

    const URL: &str = "https://example.com";

    fn fetcher(
        transport: MockTransport,
    ) -> (RetryingFetcher<MockTransport, RecordingReporter>, RecordingReporter) {
        let reporter = RecordingReporter::new();
        (RetryingFetcher::new(transport, reporter.clone()), reporter)
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, 0.01).unwrap()
    }

    #[test]
    fn test_validate_url_accepts_http_and_https() {
        assert!(validate_url("http://example.com").is_ok());
        assert!(validate_url("https://example.com/a?b=c").is_ok());
        assert!(matches!(
            validate_url("invalid-url"),
            Err(AppError::InvalidInput(_))
        ));
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("").is_err());
    }

    #[test]
    fn test_html_content_types() {
        assert!(is_html_content_type("text/html; charset=utf-8"));
        assert!(is_html_content_type("Application/XHTML+XML"));
        assert!(!is_html_content_type("application/json"));
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let transport = MockTransport::new("<html><body>hi</body></html>");
        let (fetcher, reporter) = fetcher(transport.clone());

        let outcome = fetcher.fetch(URL, &fast_policy(3)).await.unwrap();
        let page = outcome.into_page().unwrap();

        assert_eq!(page.body, "<html><body>hi</body></html>");
        assert_eq!(page.url, URL);
        assert_eq!(transport.call_count(), 1);
        assert!(reporter.backoff_waits().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_url_is_never_requested() {
        let transport = MockTransport::new("<html></html>");
        let (fetcher, reporter) = fetcher(transport.clone());

        let err = fetcher.fetch("invalid-url", &fast_policy(3)).await.unwrap_err();

        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(transport.call_count(), 0);
        assert!(reporter.contains("Invalid URL format"));
    }

    #[tokio::test]
    async fn test_empty_body_is_invalid_input_not_exhaustion() {
        let transport = MockTransport::with_responses(vec![Ok(html_response(""))]);
        let (fetcher, reporter) = fetcher(transport.clone());

        let err = fetcher.fetch(URL, &fast_policy(1)).await.unwrap_err();

        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(reporter.contains("Empty response received"));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_two_timeouts_then_success_doubles_the_wait() {
        let transport = MockTransport::with_responses(vec![
            Err(AppError::Timeout(10)),
            Err(AppError::Timeout(10)),
            Ok(html_response("<html><body>ok</body></html>")),
        ]);
        let (fetcher, reporter) = fetcher(transport.clone());

        let outcome = fetcher.fetch(URL, &fast_policy(3)).await.unwrap();

        assert!(matches!(outcome, FetchOutcome::Success(_)));
        assert_eq!(transport.call_count(), 3);
        let waits = reporter.backoff_waits();
        assert_eq!(waits.len(), 2);
        assert_eq!(waits[0], Duration::from_millis(10));
        assert_eq!(waits[1], waits[0] * 2);
        assert!(reporter.contains("timed out"));
    }

    #[tokio::test]
    async fn test_exhausted_retries_are_a_soft_outcome() {
        let transport = MockTransport::with_responses(vec![
            Err(AppError::Timeout(10)),
            Err(AppError::NetworkError("connection refused".into())),
            Err(AppError::Timeout(10)),
        ]);
        let (fetcher, reporter) = fetcher(transport.clone());

        let outcome = fetcher.fetch(URL, &fast_policy(3)).await.unwrap();

        assert_eq!(outcome, FetchOutcome::RetriesExhausted { attempts: 3 });
        assert_eq!(transport.call_count(), 3);
        assert_eq!(reporter.count("RetriesExhausted"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_backoff_waits_at_most_the_cap() {
        let transport = MockTransport::with_responses(vec![
            Err(AppError::Timeout(10)),
            Err(AppError::Timeout(10)),
        ]);
        let (fetcher, reporter) = fetcher(transport.clone());
        let policy = RetryPolicy::new(2, 1e20).unwrap();

        let outcome = fetcher.fetch(URL, &policy).await.unwrap();

        assert_eq!(outcome, FetchOutcome::RetriesExhausted { attempts: 2 });
        assert_eq!(transport.call_count(), 2);
        assert_eq!(reporter.backoff_waits(), vec![MAX_BACKOFF]);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let transport = MockTransport::with_responses(vec![
            Ok(status_response(404)),
            Ok(html_response("<html></html>")),
        ]);
        let (fetcher, reporter) = fetcher(transport.clone());

        let err = fetcher.fetch(URL, &fast_policy(3)).await.unwrap_err();

        assert!(matches!(err, AppError::HttpStatus { status: 404, .. }));
        assert_eq!(transport.call_count(), 1);
        assert_eq!(reporter.count("PermanentFailure"), 1);
    }

    #[tokio::test]
    async fn test_server_error_then_success_is_retried_once() {
        let transport = MockTransport::with_responses(vec![
            Ok(status_response(503)),
            Ok(html_response("<html><body>back</body></html>")),
        ]);
        let (fetcher, _reporter) = fetcher(transport.clone());

        let outcome = fetcher.fetch(URL, &fast_policy(3)).await.unwrap();

        assert!(matches!(outcome, FetchOutcome::Success(_)));
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_redirect_loop_is_not_retried() {
        let transport = MockTransport::with_responses(vec![Err(AppError::TooManyRedirects(
            "loop".into(),
        ))]);
        let (fetcher, _reporter) = fetcher(transport.clone());

        let err = fetcher.fetch(URL, &fast_policy(3)).await.unwrap_err();

        assert!(matches!(err, AppError::TooManyRedirects(_)));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unexpected_error_is_not_retried() {
        let transport =
            MockTransport::with_responses(vec![Err(AppError::HttpError("builder".into()))]);
        let (fetcher, _reporter) = fetcher(transport.clone());

        assert!(fetcher.fetch(URL, &fast_policy(3)).await.is_err());
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_non_html_content_type_only_warns() {
        let transport = MockTransport::with_responses(vec![Ok(RawResponse {
            status: 200,
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: "{}".into(),
        })]);
        let (fetcher, reporter) = fetcher(transport);

        let outcome = fetcher.fetch(URL, &fast_policy(1)).await.unwrap();

        assert!(matches!(outcome, FetchOutcome::Success(_)));
        assert_eq!(reporter.count("UnexpectedContentType"), 1);
    }
}
