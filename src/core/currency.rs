//! FX rate provider seam

use crate::core::error::FetchError;
use async_trait::async_trait;

/// Source of same-day conversion rates between two ISO 4217 codes.
#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64, FetchError>;
}
