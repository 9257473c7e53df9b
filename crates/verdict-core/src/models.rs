use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;

/// Message stored in the error-shaped result when no document could be fetched.
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch URL";

/// Longest single backoff wait; larger computed waits are clamped to it.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60 * 60);

/// Retry configuration with exponential backoff.
///
/// Attempt 1 runs immediately; attempt `n >= 2` waits
/// `backoff_factor * 2^(n-2)` seconds first, capped at [`MAX_BACKOFF`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: 0.5,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_factor: f64) -> Result<Self, AppError> {
        if max_retries == 0 {
            return Err(AppError::InvalidInput(
                "max_retries must be at least 1".into(),
            ));
        }
        if !backoff_factor.is_finite() || backoff_factor <= 0.0 {
            return Err(AppError::InvalidInput(format!(
                "backoff_factor must be a positive number, got {backoff_factor}"
            )));
        }
        Ok(Self {
            max_retries,
            backoff_factor,
        })
    }

    /// Delay to wait before the given 1-indexed attempt, `None` for the first.
    pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
        if attempt < 2 {
            return None;
        }
        let exponent = i32::try_from(attempt - 2).unwrap_or(i32::MAX);
        let wait = Duration::try_from_secs_f64(self.backoff_factor * 2f64.powi(exponent))
            .unwrap_or(MAX_BACKOFF);
        Some(wait.min(MAX_BACKOFF))
    }

    /// Sum of every backoff wait a fully exhausted fetch sleeps through.
    pub fn total_backoff(&self) -> Duration {
        (2..=self.max_retries)
            .filter_map(|attempt| self.delay_before(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

/// Raw transport response: any status, headers as sent, decoded body.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A successfully fetched page.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl FetchedPage {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Result of a fetch that did not raise.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(FetchedPage),
    /// Every attempt hit a transient failure. Not an error: no content is available.
    RetriesExhausted { attempts: u32 },
}

impl FetchOutcome {
    pub fn into_page(self) -> Option<FetchedPage> {
        match self {
            FetchOutcome::Success(page) => Some(page),
            FetchOutcome::RetriesExhausted { .. } => None,
        }
    }
}

/// One element pulled out of a document by selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedElement {
    /// Trimmed text content, never empty.
    pub text: String,
    pub element_type: String,
    /// Tag name plus zero-based match index, e.g. `p-3`.
    pub location: String,
    /// Requested attributes that were present on the element.
    #[serde(flatten)]
    pub attributes: BTreeMap<String, String>,
}

impl ExtractedElement {
    pub fn new(text: impl Into<String>, element_type: &str, index: usize) -> Self {
        Self {
            text: text.into(),
            element_type: element_type.to_string(),
            location: format!("{element_type}-{index}"),
            attributes: BTreeMap::new(),
        }
    }
}

/// A link collected from a case page's citation section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalLink {
    pub text: String,
    pub url: String,
    pub title: String,
}

/// Header metadata of a court case page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub court: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub external_links: Vec<ExternalLink>,
}

/// One row of a per-year case listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseListing {
    pub case_url: String,
    pub docket: String,
    pub year: i32,
}

/// Result of structured extraction.
///
/// Serializes untagged, so a failure renders as `{"error": .., "url": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtractionOutcome {
    /// Extracted fields in configuration order.
    Fields(Map<String, Value>),
    Failed { error: String, url: String },
}

impl ExtractionOutcome {
    pub fn failed(error: impl Into<String>, url: &str) -> Self {
        ExtractionOutcome::Failed {
            error: error.into(),
            url: url.to_string(),
        }
    }

    /// The outcome used when no document could be obtained.
    pub fn fetch_failed(url: &str) -> Self {
        Self::failed(FETCH_FAILED_MESSAGE, url)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ExtractionOutcome::Failed { .. })
    }

    pub fn fields(&self) -> Option<&Map<String, Value>> {
        match self {
            ExtractionOutcome::Fields(fields) => Some(fields),
            ExtractionOutcome::Failed { .. } => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields().and_then(|fields| fields.get(field))
    }
}
