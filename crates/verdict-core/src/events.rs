use std::time::Duration;

use crate::error::AppError;

/// Events emitted while fetching, parsing, and extracting.
#[derive(Debug, Clone, Copy)]
pub enum ScrapeEvent<'a> {
    FetchAttempt {
        url: &'a str,
        attempt: u32,
        max_attempts: u32,
    },
    FetchSucceeded {
        url: &'a str,
        attempt: u32,
        bytes: usize,
    },
    UnexpectedContentType {
        url: &'a str,
        content_type: Option<&'a str>,
    },
    AttemptFailed {
        url: &'a str,
        attempt: u32,
        error: &'a AppError,
    },
    BackoffWait {
        url: &'a str,
        next_attempt: u32,
        wait: Duration,
    },
    RetriesExhausted {
        url: &'a str,
        attempts: u32,
    },
    PermanentFailure {
        url: &'a str,
        error: &'a AppError,
    },
    DocumentParsed {
        url: &'a str,
    },
    MissingBody {
        url: &'a str,
    },
    ParseFailed {
        url: &'a str,
        error: &'a AppError,
    },
    ExtractionFailed {
        url: &'a str,
        error: &'a AppError,
    },
}

/// Diagnostic level of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl ScrapeEvent<'_> {
    /// Warning for retryable or soft failures, error for anything raised.
    pub fn level(&self) -> Level {
        match self {
            ScrapeEvent::FetchAttempt { .. }
            | ScrapeEvent::FetchSucceeded { .. }
            | ScrapeEvent::DocumentParsed { .. } => Level::Info,
            ScrapeEvent::UnexpectedContentType { .. }
            | ScrapeEvent::BackoffWait { .. }
            | ScrapeEvent::RetriesExhausted { .. }
            | ScrapeEvent::MissingBody { .. }
            | ScrapeEvent::ParseFailed { .. } => Level::Warn,
            ScrapeEvent::AttemptFailed { error, .. } => {
                if error.is_retryable() {
                    Level::Warn
                } else {
                    Level::Error
                }
            }
            ScrapeEvent::PermanentFailure { .. } | ScrapeEvent::ExtractionFailed { .. } => {
                Level::Error
            }
        }
    }
}

/// Trait for receiving scrape events (decoupled logging).
pub trait ScrapeReporter: Send + Sync {
    fn report(&self, event: ScrapeEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl ScrapeReporter for SilentReporter {}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ScrapeReporter for TracingReporter {
    fn report(&self, event: ScrapeEvent<'_>) {
        match event {
            ScrapeEvent::FetchAttempt {
                url,
                attempt,
                max_attempts,
            } => {
                tracing::info!(%url, %attempt, %max_attempts, "Fetching URL");
            }
            ScrapeEvent::FetchSucceeded {
                url,
                attempt,
                bytes,
            } => {
                tracing::info!(%url, %attempt, %bytes, "Fetched URL");
            }
            ScrapeEvent::UnexpectedContentType { url, content_type } => {
                tracing::warn!(%url, ?content_type, "Expected HTML content");
            }
            ScrapeEvent::AttemptFailed {
                url,
                attempt,
                error,
            } => {
                if error.is_retryable() {
                    tracing::warn!(%url, %attempt, %error, kind = %error.kind(), "Fetch attempt failed");
                } else {
                    tracing::error!(%url, %attempt, %error, kind = %error.kind(), "Fetch attempt failed");
                }
            }
            ScrapeEvent::BackoffWait {
                url,
                next_attempt,
                wait,
            } => {
                tracing::warn!(
                    %url,
                    %next_attempt,
                    wait_ms = %wait.as_millis(),
                    "Waiting before retrying"
                );
            }
            ScrapeEvent::RetriesExhausted { url, attempts } => {
                tracing::warn!(%url, %attempts, "Failed to fetch URL after all attempts");
            }
            ScrapeEvent::PermanentFailure { url, error } => {
                tracing::error!(%url, %error, kind = %error.kind(), "Fetch failed permanently");
            }
            ScrapeEvent::DocumentParsed { url } => {
                tracing::info!(%url, "Parsed HTML document");
            }
            ScrapeEvent::MissingBody { url } => {
                tracing::warn!(%url, "No <body> element found in the HTML");
            }
            ScrapeEvent::ParseFailed { url, error } => {
                tracing::warn!(%url, %error, "Could not parse HTML content");
            }
            ScrapeEvent::ExtractionFailed { url, error } => {
                tracing::error!(%url, %error, "Structured extraction failed");
            }
        }
    }
}

impl<R: ScrapeReporter + ?Sized> ScrapeReporter for std::sync::Arc<R> {
    fn report(&self, event: ScrapeEvent<'_>) {
        (**self).report(event);
    }
}
