//! Persistent daily price cache with full and incremental refresh
//!
//! One CSV series per provider ticker, owned exclusively by this
//! module. Refresh is resumable: tickers with an existing readable
//! series only fetch rows after their last cached date. Full fetches
//! for distinct tickers run concurrently on a bounded pool; failures
//! are logged per ticker and never abort the batch.

use crate::core::error::FetchError;
use crate::core::exchange::Exchange;
use crate::core::price::{MarketDataProvider, PriceBar, PriceSeries};
use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use futures::StreamExt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const MAX_FULL_FETCH_WORKERS: usize = 10;

/// Retry budget for one fetch task. Backoff sleep grows linearly with
/// the attempt number.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            backoff_base: Duration::from_secs(15),
        }
    }
}

/// Per-fetch-task state machine. Terminal outcomes are the returned
/// `Ok` (success) or `Err` (rate-limit budget exhausted, or any
/// permanent provider error, which skips the backoff path entirely).
enum FetchState {
    Attempting(u32),
    Backoff(u32),
}

pub async fn fetch_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut state = FetchState::Attempting(1);
    loop {
        state = match state {
            FetchState::Attempting(attempt) => match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_rate_limit() && attempt < policy.max_retries => {
                    warn!("Rate limited (attempt {attempt}/{}); backing off", policy.max_retries);
                    FetchState::Backoff(attempt)
                }
                Err(e) => return Err(e),
            },
            FetchState::Backoff(attempt) => {
                tokio::time::sleep(policy.backoff_base * attempt).await;
                FetchState::Attempting(attempt + 1)
            }
        };
    }
}

/// Owns the on-disk price series and the external provider behind it.
pub struct PriceCache {
    dir: PathBuf,
    provider: Arc<dyn MarketDataProvider>,
    retry: RetryPolicy,
}

impl PriceCache {
    pub fn new(dir: PathBuf, provider: Arc<dyn MarketDataProvider>, retry: RetryPolicy) -> Self {
        PriceCache {
            dir,
            provider,
            retry,
        }
    }

    fn series_path(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{ticker}.csv"))
    }

    /// The stored series for a pair, truncated to `as_of` when given.
    /// A missing or unreadable file yields an empty series, never an
    /// error: callers treat "no data" as "cannot value this holding".
    pub fn read(&self, symbol: &str, exchange: Exchange, as_of: Option<NaiveDate>) -> PriceSeries {
        let path = self.series_path(&exchange.ticker(symbol));
        if !path.exists() {
            return PriceSeries::default();
        }
        let series = match read_series(&path) {
            Ok(series) => series,
            Err(e) => {
                warn!("Could not read price series '{}': {}", path.display(), e);
                return PriceSeries::default();
            }
        };
        match as_of {
            Some(date) => series.truncate_to(date),
            None => series,
        }
    }

    /// Bring the cached series for every pair up to date. Missing (or
    /// force-refreshed) tickers get a concurrent full fetch; the rest
    /// get a sequential incremental fetch.
    pub async fn ensure_fresh(&self, pairs: &[(String, Exchange)], force_refresh: bool) {
        self.ensure_fresh_with(pairs, force_refresh, &|| ()).await;
    }

    /// Same as [`ensure_fresh`](Self::ensure_fresh), invoking `update`
    /// once per completed ticker for progress reporting.
    pub async fn ensure_fresh_with(
        &self,
        pairs: &[(String, Exchange)],
        force_refresh: bool,
        update: &(dyn Fn() + Sync),
    ) {
        let mut full_fetch_tickers: Vec<String> = Vec::new();
        let mut partial_tickers: Vec<String> = Vec::new();

        for (symbol, exchange) in pairs {
            let ticker = exchange.ticker(symbol);
            if full_fetch_tickers.contains(&ticker) || partial_tickers.contains(&ticker) {
                continue;
            }
            let path = self.series_path(&ticker);

            if force_refresh || !path.exists() {
                if path.exists() {
                    if let Err(e) = fs::remove_file(&path) {
                        warn!("Could not remove old cache file '{}': {}", path.display(), e);
                    }
                }
                full_fetch_tickers.push(ticker);
            } else {
                partial_tickers.push(ticker);
            }
        }

        if !full_fetch_tickers.is_empty() {
            let workers = full_fetch_tickers.len().min(MAX_FULL_FETCH_WORKERS);
            info!(
                "Starting parallel fetch for {} tickers (workers={})",
                full_fetch_tickers.len(),
                workers
            );
            futures::stream::iter(full_fetch_tickers.iter().map(|ticker| async move {
                self.full_fetch(ticker).await;
                update();
            }))
            .buffer_unordered(workers)
            .collect::<Vec<()>>()
            .await;
        }

        for ticker in &partial_tickers {
            self.incremental_fetch(ticker).await;
            update();
        }
    }

    /// Fetch the entire available history and overwrite the series.
    async fn full_fetch(&self, ticker: &str) {
        let result = fetch_with_backoff(&self.retry, || self.provider.history(ticker, None)).await;
        match result {
            Ok(bars) if bars.is_empty() => {
                info!("Provider returned no history for {ticker}");
            }
            Ok(bars) => match self.write_series(ticker, bars) {
                Ok(rows) => info!("Fetched and cached {rows} rows for {ticker}"),
                Err(e) => error!("Failed to write cache for {ticker}: {e}"),
            },
            Err(e) => {
                error!("Failed to fetch data for {ticker}: {e}");
            }
        }
    }

    /// Fetch only rows after the last cached date and append them.
    /// Falls back to a full fetch when the cached file is unreadable
    /// or empty.
    async fn incremental_fetch(&self, ticker: &str) {
        let path = self.series_path(ticker);

        let cached = match read_series(&path) {
            Ok(cached) => cached,
            Err(e) => {
                warn!(
                    "Could not read cached series '{}': {}. Re-fetching full history.",
                    path.display(),
                    e
                );
                self.full_fetch(ticker).await;
                return;
            }
        };

        let Some(last_date) = cached.last_date() else {
            info!("Cached series for {ticker} is empty. Re-fetching full history.");
            self.full_fetch(ticker).await;
            return;
        };

        let start = last_date
            .checked_add_days(Days::new(1))
            .unwrap_or(last_date);
        let fetched =
            match fetch_with_backoff(&self.retry, || self.provider.history(ticker, Some(start)))
                .await
            {
                Ok(bars) => bars,
                Err(e) => {
                    error!("Failed to fetch new data for {ticker}: {e}");
                    return;
                }
            };

        let new_rows = PriceSeries::rows_after(fetched, last_date);
        if new_rows.is_empty() {
            return;
        }

        match append_series(&path, &new_rows) {
            Ok(()) => info!("Appended {} new rows to cache for {ticker}", new_rows.len()),
            Err(e) => error!("Failed to append new data to '{}': {}", path.display(), e),
        }
    }

    fn write_series(&self, ticker: &str, bars: Vec<PriceBar>) -> Result<usize> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create cache directory: {}", self.dir.display()))?;
        let series = PriceSeries::from_bars(bars);
        let path = self.series_path(ticker);
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to open '{}'", path.display()))?;
        for bar in series.bars() {
            writer.serialize(bar)?;
        }
        writer.flush()?;
        Ok(series.len())
    }
}

fn read_series(path: &Path) -> Result<PriceSeries> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open '{}'", path.display()))?;
    let mut bars = Vec::new();
    for row in reader.deserialize() {
        bars.push(row?);
    }
    Ok(PriceSeries::from_bars(bars))
}

fn append_series(path: &Path, bars: &[PriceBar]) -> Result<()> {
    let file = fs::OpenOptions::new()
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open '{}' for append", path.display()))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    for bar in bars {
        writer.serialize(bar)?;
    }
    writer.flush()?;
    Ok(())
}
