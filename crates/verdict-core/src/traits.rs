use std::future::Future;

use crate::error::AppError;
use crate::models::{FetchOutcome, RawResponse, RetryPolicy};

/// Issues a single HTTP GET.
///
/// Returns a [`RawResponse`] for every status code; only failures below
/// HTTP (timeouts, refused connections, redirect loops) are errors.
pub trait Transport: Send + Sync + Clone {
    fn get(&self, url: &str) -> impl Future<Output = Result<RawResponse, AppError>> + Send;
}

/// Fetches a page under a retry policy.
///
/// `Ok(FetchOutcome::RetriesExhausted)` means no content is available;
/// `Err` means the request can never succeed as issued.
pub trait PageFetcher: Send + Sync + Clone {
    fn fetch(
        &self,
        url: &str,
        policy: &RetryPolicy,
    ) -> impl Future<Output = Result<FetchOutcome, AppError>> + Send;
}
