use std::fmt;

use thiserror::Error;

/// Application-wide error types for verdict.
#[derive(Error, Debug)]
pub enum AppError {
    /// Caller supplied something unusable (bad URL, empty body, bad policy).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Connection refused, reset, or aborted.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// Redirect loop or redirect limit exceeded.
    #[error("Too many redirects: {0}")]
    TooManyRedirects(String),

    /// Any other request failure.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The fetched body could not be turned into a document.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A CSS selector failed to parse.
    #[error("Invalid selector '{selector}': {message}")]
    SelectorError { selector: String, message: String },

    /// Structured extraction failed.
    #[error("Extraction error: {0}")]
    ExtractionError(String),

    /// Configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Coarse failure classes that drive retry and propagation decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Raised immediately, never retried.
    InvalidInput,
    /// Retried with backoff; degrades to a soft outcome once exhausted.
    Transient,
    /// Raised immediately, never retried.
    Permanent,
    /// Absorbed into an error-shaped result by the extractor.
    Extraction,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InvalidInput => "invalid_input",
            FailureKind::Transient => "transient",
            FailureKind::Permanent => "permanent",
            FailureKind::Extraction => "extraction",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl AppError {
    /// Classify this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            AppError::InvalidInput(_) | AppError::ConfigError(_) => FailureKind::InvalidInput,
            AppError::Timeout(_) | AppError::NetworkError(_) => FailureKind::Transient,
            AppError::HttpStatus { status, .. } if (500..600).contains(status) => {
                FailureKind::Transient
            }
            AppError::ParseError(_)
            | AppError::SelectorError { .. }
            | AppError::ExtractionError(_)
            | AppError::SerializationError(_) => FailureKind::Extraction,
            AppError::HttpStatus { .. }
            | AppError::TooManyRedirects(_)
            | AppError::HttpError(_) => FailureKind::Permanent,
        }
    }

    /// Returns true if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.kind() == FailureKind::Transient
    }
}
