use std::error::Error as StdError;
use std::io::ErrorKind;

use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use verdict_core::config::FetchConfig;
use verdict_core::error::AppError;
use verdict_core::events::{ScrapeReporter, TracingReporter};
use verdict_core::fetch::RetryingFetcher;
use verdict_core::models::RawResponse;
use verdict_core::traits::Transport;

/// Redirect hops followed before a request counts as a redirect loop.
pub const MAX_REDIRECTS: usize = 10;

/// Retrying fetcher over the reqwest transport.
pub type HttpFetcher<R = TracingReporter> = RetryingFetcher<ReqwestTransport, R>;

/// HTTP transport using reqwest.
///
/// Sends the configured header set and enforces the configured timeout on
/// every request. Non-success statuses are returned as responses; the
/// retrying fetcher decides what they mean.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, AppError> {
        Self::with_config(&FetchConfig::default())
    }

    pub fn with_config(config: &FetchConfig) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| AppError::ConfigError(format!("Invalid header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                AppError::ConfigError(format!("Invalid value for header '{name}': {e}"))
            })?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: config.timeout.as_secs(),
        })
    }

    /// Wrap this transport in a retrying fetcher reporting through `reporter`.
    pub fn into_fetcher<R: ScrapeReporter + Clone>(self, reporter: R) -> HttpFetcher<R> {
        RetryingFetcher::new(self, reporter)
    }

    fn classify(&self, error: reqwest::Error) -> AppError {
        if error.is_timeout() {
            AppError::Timeout(self.timeout_secs)
        } else if error.is_redirect() {
            AppError::TooManyRedirects(error.to_string())
        } else if error.is_connect() {
            AppError::NetworkError(format!("Connection failed: {error}"))
        } else if is_connection_drop(&error) {
            AppError::NetworkError(format!("Connection dropped: {error}"))
        } else {
            AppError::HttpError(error.to_string())
        }
    }
}

impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, AppError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response.text().await.map_err(|e| self.classify(e))?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// Walk the source chain looking for a reset or aborted socket.
fn is_connection_drop(error: &(dyn StdError + 'static)) -> bool {
    let mut source = error.source();
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        source = err.source();
    }
    false
}
