//! Provider fetch errors, split by retry classification

use thiserror::Error;

/// Errors raised while talking to the external market-data provider.
///
/// Only `RateLimited` is retried; everything else aborts the fetch for
/// that ticker immediately.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("rate limited by provider")]
    RateLimited,

    #[error("provider returned HTTP {0}")]
    Http(reqwest::StatusCode),

    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("no data returned for {0}")]
    NoData(String),

    #[error("malformed provider response: {0}")]
    Parse(String),
}

impl FetchError {
    /// True when the error is transient and the fetch should back off
    /// and try again.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, FetchError::RateLimited)
    }
}
