//! Portfolio analytics: valuation snapshots, NAV and return history,
//! monthly time-weighted returns, and per-currency ledger summaries.
//!
//! Everything in here is pure computation over the ledgers, a resolved
//! FX rate map, and the on-disk price cache. Network access stays in
//! the provider layer.

pub mod aggregates;
pub mod calendar;
pub mod nav;
pub mod snapshot;
pub mod twr;

#[cfg(test)]
pub(crate) mod testutil {
    use crate::core::error::FetchError;
    use crate::core::price::{MarketDataProvider, PriceBar};
    use crate::marketdata::{PriceCache, RetryPolicy};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::path::Path;
    use std::sync::Arc;

    /// Provider that refuses every call. Analytics tests only read
    /// pre-seeded series files and must never reach the network.
    pub struct NoFetchProvider;

    #[async_trait]
    impl MarketDataProvider for NoFetchProvider {
        async fn history(
            &self,
            ticker: &str,
            _start: Option<NaiveDate>,
        ) -> Result<Vec<PriceBar>, FetchError> {
            Err(FetchError::NoData(ticker.to_string()))
        }

        async fn quote(&self, ticker: &str) -> Result<f64, FetchError> {
            Err(FetchError::NoData(ticker.to_string()))
        }
    }

    pub fn price_cache(dir: &Path) -> PriceCache {
        PriceCache::new(
            dir.to_path_buf(),
            Arc::new(NoFetchProvider),
            RetryPolicy::default(),
        )
    }

    /// Seed one ticker's series file with (date, close) rows.
    pub fn seed_series(dir: &Path, ticker: &str, rows: &[(&str, f64)]) {
        let mut writer = csv::Writer::from_path(dir.join(format!("{ticker}.csv"))).unwrap();
        for (date, close) in rows {
            writer
                .serialize(PriceBar {
                    date: date.parse().unwrap(),
                    open: *close,
                    high: *close,
                    low: *close,
                    close: *close,
                    volume: 0.0,
                    dividends: 0.0,
                    splits: 0.0,
                })
                .unwrap();
        }
        writer.flush().unwrap();
    }
}
