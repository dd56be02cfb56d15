//! Daily price series types and the market-data provider seam

use crate::core::error::FetchError;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily OHLCV row, plus the provider-reported cash adjustments
/// (dividends and split ratios) for that day. Serde names match the
/// on-disk CSV header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Open")]
    pub open: f64,
    #[serde(rename = "High")]
    pub high: f64,
    #[serde(rename = "Low")]
    pub low: f64,
    #[serde(rename = "Close")]
    pub close: f64,
    #[serde(rename = "Volume")]
    pub volume: f64,
    #[serde(rename = "Dividends", default)]
    pub dividends: f64,
    #[serde(rename = "Stock Splits", default)]
    pub splits: f64,
}

/// An ordered, date-keyed daily series for one provider ticker.
/// Weekends and holidays are simply absent; gap filling happens at
/// consumption time, never in storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Build a series from rows, sorting by date and dropping
    /// duplicate dates (first occurrence wins).
    pub fn from_bars(mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        PriceSeries { bars }
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// The subset of the series at or before `as_of`.
    pub fn truncate_to(&self, as_of: NaiveDate) -> PriceSeries {
        PriceSeries {
            bars: self
                .bars
                .iter()
                .filter(|b| b.date <= as_of)
                .cloned()
                .collect(),
        }
    }

    /// Last known close at or before `date`, if any row qualifies.
    pub fn last_close_at_or_before(&self, date: NaiveDate) -> Option<f64> {
        self.bars
            .iter()
            .rev()
            .find(|b| b.date <= date)
            .map(|b| b.close)
    }

    /// Rows strictly after `date`, deduplicated against the existing
    /// tail. This is the incremental-append filter.
    pub fn rows_after(bars: Vec<PriceBar>, date: NaiveDate) -> Vec<PriceBar> {
        let mut new: Vec<PriceBar> = bars.into_iter().filter(|b| b.date > date).collect();
        new.sort_by_key(|b| b.date);
        new.dedup_by_key(|b| b.date);
        new
    }
}

/// External daily market-data provider: full or windowed history, and a
/// last-price quote used for ticker-existence validation.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily bars from `start` (or the full available history when
    /// `None`) through today.
    async fn history(
        &self,
        ticker: &str,
        start: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, FetchError>;

    /// Last traded price. An `Err` means the ticker does not exist or
    /// could not be verified.
    async fn quote(&self, ticker: &str) -> Result<f64, FetchError>;
}
