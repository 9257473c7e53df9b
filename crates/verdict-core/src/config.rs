use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;
use crate::models::RetryPolicy;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Request settings shared by every fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    pub user_agent: String,
    /// Headers sent with every request, in addition to `User-Agent`.
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: default_headers(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

fn default_headers() -> Vec<(String, String)> {
    [
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
        ("Accept-Language", "en-US,en;q=0.5"),
        ("Connection", "keep-alive"),
        ("Upgrade-Insecure-Requests", "1"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl FetchConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Add a header, replacing any existing header of the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Replace the whole header set.
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    /// Read overrides from environment variables.
    ///
    /// - `VERDICT_USER_AGENT` (optional)
    /// - `VERDICT_TIMEOUT_SECS` (optional, defaults to 10)
    pub fn from_env() -> Result<Self, AppError> {
        let mut config = Self::default();
        if let Ok(user_agent) = std::env::var("VERDICT_USER_AGENT") {
            config.user_agent = user_agent;
        }
        if let Some(secs) = parse_env::<u64>("VERDICT_TIMEOUT_SECS")? {
            if secs == 0 {
                return Err(AppError::ConfigError(
                    "VERDICT_TIMEOUT_SECS must be at least 1".into(),
                ));
            }
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

impl RetryPolicy {
    /// Read the policy from environment variables.
    ///
    /// - `VERDICT_MAX_RETRIES` (optional, defaults to 3)
    /// - `VERDICT_BACKOFF_FACTOR` (optional, defaults to 0.5)
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();
        let max_retries = parse_env("VERDICT_MAX_RETRIES")?.unwrap_or(defaults.max_retries);
        let backoff_factor =
            parse_env("VERDICT_BACKOFF_FACTOR")?.unwrap_or(defaults.backoff_factor);
        Self::new(max_retries, backoff_factor).map_err(|e| AppError::ConfigError(e.to_string()))
    }
}

fn parse_env<T: FromStr>(name: &str) -> Result<Option<T>, AppError> {
    match std::env::var(name) {
        Err(_) => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AppError::ConfigError(format!("Invalid {name} '{raw}'"))),
    }
}
