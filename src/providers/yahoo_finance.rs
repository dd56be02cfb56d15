use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::core::currency::CurrencyRateProvider;
use crate::core::error::FetchError;
use crate::core::price::{MarketDataProvider, PriceBar};

const USER_AGENT: &str = "navtrack/0.1";

#[derive(Deserialize, Debug)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
    events: Option<Events>,
}

#[derive(Deserialize, Debug)]
struct ChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<QuoteBlock>,
}

#[derive(Deserialize, Debug, Default)]
struct QuoteBlock {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<f64>>>,
}

#[derive(Deserialize, Debug)]
struct Events {
    dividends: Option<HashMap<String, DividendEvent>>,
    splits: Option<HashMap<String, SplitEvent>>,
}

#[derive(Deserialize, Debug)]
struct DividendEvent {
    amount: f64,
    date: i64,
}

#[derive(Deserialize, Debug)]
struct SplitEvent {
    numerator: Option<f64>,
    denominator: Option<f64>,
    date: i64,
}

/// Timestamps arrive in the exchange's local offset; normalize to a
/// timezone-naive UTC calendar day before any storage or comparison.
fn naive_day(ts: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp(ts, 0).map(|dt| dt.date_naive())
}

fn extract_bars(item: &ChartItem) -> Vec<PriceBar> {
    let (Some(timestamps), Some(quote)) = (
        item.timestamp.as_ref(),
        item.indicators.as_ref().and_then(|inds| inds.quote.first()),
    ) else {
        return Vec::new();
    };

    let mut dividends_by_day: HashMap<NaiveDate, f64> = HashMap::new();
    let mut splits_by_day: HashMap<NaiveDate, f64> = HashMap::new();
    if let Some(events) = &item.events {
        for ev in events.dividends.iter().flat_map(|m| m.values()) {
            if let Some(day) = naive_day(ev.date) {
                *dividends_by_day.entry(day).or_default() += ev.amount;
            }
        }
        for ev in events.splits.iter().flat_map(|m| m.values()) {
            if let (Some(day), Some(num), Some(den)) =
                (naive_day(ev.date), ev.numerator, ev.denominator)
            {
                if den != 0.0 {
                    splits_by_day.insert(day, num / den);
                }
            }
        }
    }

    let column = |col: &Option<Vec<Option<f64>>>, i: usize| -> Option<f64> {
        col.as_ref().and_then(|v| v.get(i).copied().flatten())
    };

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let Some(date) = naive_day(*ts) else { continue };
        // Rows with no close are half-days or bad ticks; skip them.
        let Some(close) = column(&quote.close, i) else {
            continue;
        };
        bars.push(PriceBar {
            date,
            open: column(&quote.open, i).unwrap_or(close),
            high: column(&quote.high, i).unwrap_or(close),
            low: column(&quote.low, i).unwrap_or(close),
            close,
            volume: column(&quote.volume, i).unwrap_or(0.0),
            dividends: dividends_by_day.get(&date).copied().unwrap_or(0.0),
            splits: splits_by_day.get(&date).copied().unwrap_or(0.0),
        });
    }
    bars
}

/// Daily history and quote lookups against the Yahoo Finance chart API.
pub struct YahooFinanceProvider {
    base_url: String,
    client: reqwest::Client,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str) -> Self {
        YahooFinanceProvider {
            base_url: base_url.to_string(),
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
        }
    }

    async fn fetch_chart(&self, url: &str) -> Result<ChartItem, FetchError> {
        debug!("Requesting chart data from {}", url);
        let response = self.client.get(url).send().await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(FetchError::Http(response.status()));
        }

        let text = response.text().await?;
        let data: ChartResponse = serde_json::from_str(&text)
            .map_err(|e| FetchError::Parse(format!("{url}: {e}")))?;

        data.chart
            .result
            .and_then(|items| items.into_iter().next())
            .ok_or_else(|| FetchError::NoData(url.to_string()))
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    #[instrument(name = "YahooHistoryFetch", skip(self), fields(ticker = %ticker))]
    async fn history(
        &self,
        ticker: &str,
        start: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, FetchError> {
        let window = match start {
            // End one day past "today" so today's bar is included.
            Some(from) => {
                let period1 = from
                    .and_hms_opt(0, 0, 0)
                    .map(|dt| dt.and_utc().timestamp())
                    .unwrap_or(0);
                let period2 = (Utc::now() + Duration::days(1)).timestamp();
                format!("period1={period1}&period2={period2}")
            }
            None => "range=max".to_string(),
        };
        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&events=div%7Csplit&{}",
            self.base_url, ticker, window
        );

        let item = self.fetch_chart(&url).await?;
        Ok(extract_bars(&item))
    }

    async fn quote(&self, ticker: &str) -> Result<f64, FetchError> {
        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&range=1d",
            self.base_url, ticker
        );
        let item = self.fetch_chart(&url).await?;
        item.meta
            .regular_market_price
            .ok_or_else(|| FetchError::NoData(ticker.to_string()))
    }
}

/// Spot FX rates via the synthetic `{from}{to}=X` chart tickers.
pub struct YahooCurrencyProvider {
    base_url: String,
    client: reqwest::Client,
}

impl YahooCurrencyProvider {
    pub fn new(base_url: &str) -> Self {
        YahooCurrencyProvider {
            base_url: base_url.to_string(),
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl CurrencyRateProvider for YahooCurrencyProvider {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64, FetchError> {
        let pair = format!("{from}{to}=X");
        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&range=1d",
            self.base_url, pair
        );
        debug!("Requesting currency rate from {}", url);

        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(FetchError::Http(response.status()));
        }

        let text = response.text().await?;
        let data: ChartResponse =
            serde_json::from_str(&text).map_err(|e| FetchError::Parse(format!("{pair}: {e}")))?;

        data.chart
            .result
            .and_then(|items| items.into_iter().next())
            .and_then(|item| item.meta.regular_market_price)
            .ok_or_else(|| FetchError::NoData(pair))
    }
}
