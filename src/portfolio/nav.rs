//! Daily NAV and return-percentage history
//!
//! The valuation axis is a contiguous daily range: from the first
//! trade (or an explicit start) through today (or an explicit end).
//! Prices are carried forward across weekends and holidays within the
//! axis, but never seeded from before it. Symbols with no cached
//! prices are excluded from valuation rather than failing the whole
//! series.

use crate::core::ledger::{Transaction, symbol_currency, symbol_exchanges};
use crate::core::price::MarketDataProvider;
use crate::fx::FxRates;
use crate::marketdata::PriceCache;
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavPoint {
    pub date: NaiveDate,
    pub total_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    pub return_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkPoint {
    pub date: NaiveDate,
    pub benchmark_return: f64,
}

struct SymbolHolding {
    /// FX-adjusted closes within the axis, ascending by date.
    closes: Vec<(NaiveDate, f64)>,
    /// Share deltas, ascending by date. Trades before the axis start
    /// still count toward the running position.
    trades: Vec<(NaiveDate, f64)>,
}

/// Daily portfolio value in the display currency, one point per
/// calendar day of the axis.
///
/// With an explicit `start`, trades dated before it still feed the
/// opening position, so the series begins from the shares actually
/// held on that day rather than from zero.
pub fn value_history(
    txs: &[Transaction],
    fx: &FxRates,
    prices: &PriceCache,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<NavPoint> {
    let Some(first_trade) = txs.iter().map(|tx| tx.date).min() else {
        return Vec::new();
    };
    let axis_start = start.unwrap_or(first_trade);
    let axis_end = end.unwrap_or_else(|| Local::now().date_naive());
    if axis_end < axis_start {
        return Vec::new();
    }

    let mut holdings: Vec<SymbolHolding> = Vec::new();
    for (symbol, exchange) in symbol_exchanges(txs) {
        let series = prices.read(&symbol, exchange, Some(axis_end));
        if series.is_empty() {
            debug!("No cached prices for {symbol}; excluded from valuation");
            continue;
        }
        let rate = symbol_currency(txs, &symbol)
            .and_then(|c| fx.get(c))
            .copied()
            .unwrap_or(1.0);
        let closes: Vec<(NaiveDate, f64)> = series
            .bars()
            .iter()
            .filter(|b| b.date >= axis_start)
            .map(|b| (b.date, b.close * rate))
            .collect();
        if closes.is_empty() {
            continue;
        }
        let mut trades: Vec<(NaiveDate, f64)> = txs
            .iter()
            .filter(|tx| tx.symbol == symbol)
            .map(|tx| (tx.date, tx.shares))
            .collect();
        trades.sort_by_key(|(date, _)| *date);
        holdings.push(SymbolHolding { closes, trades });
    }
    if holdings.is_empty() {
        return Vec::new();
    }

    let mut price_idx = vec![0usize; holdings.len()];
    let mut trade_idx = vec![0usize; holdings.len()];
    let mut shares = vec![0f64; holdings.len()];
    let mut last_price: Vec<Option<f64>> = vec![None; holdings.len()];

    let mut out = Vec::new();
    let mut day = axis_start;
    loop {
        let mut total = 0.0;
        for (i, holding) in holdings.iter().enumerate() {
            while price_idx[i] < holding.closes.len() && holding.closes[price_idx[i]].0 <= day {
                last_price[i] = Some(holding.closes[price_idx[i]].1);
                price_idx[i] += 1;
            }
            while trade_idx[i] < holding.trades.len() && holding.trades[trade_idx[i]].0 <= day {
                shares[i] += holding.trades[trade_idx[i]].1;
                trade_idx[i] += 1;
            }
            if let Some(price) = last_price[i] {
                total += shares[i] * price;
            }
        }
        out.push(NavPoint {
            date: day,
            total_value: total,
        });
        if day == axis_end {
            break;
        }
        let Some(next) = day.succ_opt() else { break };
        day = next;
    }
    out
}

/// Daily return percentage against the cumulative FX-converted cost
/// basis. Days before any cost has accrued report 0.
pub fn return_history(
    txs: &[Transaction],
    fx: &FxRates,
    prices: &PriceCache,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<ReturnPoint> {
    let nav = value_history(txs, fx, prices, start, end);
    if nav.is_empty() {
        return Vec::new();
    }

    let mut cost_by_date: HashMap<NaiveDate, f64> = HashMap::new();
    for tx in txs {
        let rate = fx.get(&tx.currency).copied().unwrap_or(1.0);
        *cost_by_date.entry(tx.date).or_default() += tx.trade_cost * rate;
    }

    let mut cumulative_cost = 0.0;
    nav.into_iter()
        .map(|point| {
            cumulative_cost += cost_by_date.get(&point.date).copied().unwrap_or(0.0);
            let return_pct = if cumulative_cost != 0.0 {
                (point.total_value - cumulative_cost) / cumulative_cost * 100.0
            } else {
                0.0
            };
            ReturnPoint {
                date: point.date,
                return_pct,
            }
        })
        .collect()
}

/// Display tickers for the supported benchmark indices.
pub fn benchmark_ticker(name: &str) -> Option<&'static str> {
    match name {
        "sp500" => Some("^GSPC"),
        "asx200" => Some("^AXJO"),
        "allord" => Some("^AORD"),
        _ => None,
    }
}

/// Percentage return of a benchmark index from the first close in the
/// window. Unknown benchmarks and provider failures yield an empty
/// series.
pub async fn benchmark_return_history(
    provider: &dyn MarketDataProvider,
    benchmark: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<BenchmarkPoint> {
    let Some(ticker) = benchmark_ticker(benchmark) else {
        debug!("Unknown benchmark: {benchmark}");
        return Vec::new();
    };

    let bars = match provider.history(ticker, Some(start)).await {
        Ok(bars) => bars,
        Err(e) => {
            warn!("Failed to fetch benchmark {ticker}: {e}");
            return Vec::new();
        }
    };

    let closes: Vec<(NaiveDate, f64)> = bars
        .into_iter()
        .filter(|b| b.date <= end)
        .map(|b| (b.date, b.close))
        .collect();
    let Some(&(_, first_close)) = closes.first() else {
        warn!("No data for benchmark {ticker} between {start} and {end}");
        return Vec::new();
    };

    closes
        .into_iter()
        .map(|(date, close)| BenchmarkPoint {
            date,
            benchmark_return: (close - first_close) / first_close * 100.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::exchange::Exchange;
    use crate::portfolio::testutil::{price_cache, seed_series};
    use tempfile::tempdir;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn tx(symbol: &str, shares: f64, price: f64, day: &str, exchange: Exchange) -> Transaction {
        Transaction::new(symbol, shares, price, date(day), exchange, 0.0)
    }

    fn usd_fx() -> FxRates {
        FxRates::from([("USD".to_string(), 1.0)])
    }

    #[test]
    fn test_value_history_carries_prices_forward() {
        let dir = tempdir().unwrap();
        seed_series(
            dir.path(),
            "AAPL",
            &[("2024-01-02", 100.0), ("2024-01-03", 110.0)],
        );
        let prices = price_cache(dir.path());
        let txs = vec![tx("AAPL", 10.0, 100.0, "2024-01-02", Exchange::Nasdaq)];

        let nav = value_history(&txs, &usd_fx(), &prices, None, Some(date("2024-01-05")));

        let values: Vec<f64> = nav.iter().map(|p| p.total_value).collect();
        // Weekend gap after the 3rd holds the last close.
        assert_eq!(values, vec![1000.0, 1100.0, 1100.0, 1100.0]);
        assert_eq!(nav[0].date, date("2024-01-02"));
    }

    #[test]
    fn test_value_history_applies_fx_per_symbol() {
        let dir = tempdir().unwrap();
        seed_series(dir.path(), "AAPL", &[("2024-01-02", 100.0)]);
        seed_series(dir.path(), "BHP.AX", &[("2024-01-02", 40.0)]);
        let prices = price_cache(dir.path());
        let txs = vec![
            tx("AAPL", 1.0, 100.0, "2024-01-02", Exchange::Nasdaq),
            tx("BHP", 10.0, 40.0, "2024-01-02", Exchange::Asx),
        ];
        let fx = FxRates::from([("USD".to_string(), 1.0), ("AUD".to_string(), 0.5)]);

        let nav = value_history(&txs, &fx, &prices, None, Some(date("2024-01-02")));

        assert_eq!(nav.len(), 1);
        assert_eq!(nav[0].total_value, 100.0 + 10.0 * 40.0 * 0.5);
    }

    #[test]
    fn test_unpriced_symbol_is_excluded() {
        let dir = tempdir().unwrap();
        seed_series(dir.path(), "AAPL", &[("2024-01-02", 100.0)]);
        let prices = price_cache(dir.path());
        let txs = vec![
            tx("AAPL", 1.0, 100.0, "2024-01-02", Exchange::Nasdaq),
            tx("GHOST", 99.0, 1.0, "2024-01-02", Exchange::Nasdaq),
        ];

        let nav = value_history(&txs, &usd_fx(), &prices, None, Some(date("2024-01-02")));
        assert_eq!(nav[0].total_value, 100.0);
    }

    #[test]
    fn test_trades_before_explicit_start_open_the_position() {
        let dir = tempdir().unwrap();
        seed_series(
            dir.path(),
            "AAPL",
            &[("2024-02-01", 120.0), ("2024-02-02", 125.0)],
        );
        let prices = price_cache(dir.path());
        let txs = vec![tx("AAPL", 10.0, 100.0, "2024-01-02", Exchange::Nasdaq)];

        let nav = value_history(
            &txs,
            &usd_fx(),
            &prices,
            Some(date("2024-02-01")),
            Some(date("2024-02-02")),
        );

        // The January buy is held on the axis start day.
        let values: Vec<f64> = nav.iter().map(|p| p.total_value).collect();
        assert_eq!(values, vec![1200.0, 1250.0]);
    }

    #[test]
    fn test_value_is_zero_before_first_price_on_axis() {
        let dir = tempdir().unwrap();
        seed_series(dir.path(), "AAPL", &[("2024-01-03", 110.0)]);
        let prices = price_cache(dir.path());
        let txs = vec![tx("AAPL", 10.0, 100.0, "2024-01-02", Exchange::Nasdaq)];

        let nav = value_history(&txs, &usd_fx(), &prices, None, Some(date("2024-01-03")));
        assert_eq!(nav[0].total_value, 0.0);
        assert_eq!(nav[1].total_value, 1100.0);
    }

    #[test]
    fn test_prices_before_axis_start_are_not_seeded() {
        let dir = tempdir().unwrap();
        seed_series(
            dir.path(),
            "AAPL",
            &[("2024-01-02", 100.0), ("2024-01-10", 120.0)],
        );
        let prices = price_cache(dir.path());
        let txs = vec![tx("AAPL", 1.0, 100.0, "2024-01-02", Exchange::Nasdaq)];

        let nav = value_history(
            &txs,
            &usd_fx(),
            &prices,
            Some(date("2024-01-08")),
            Some(date("2024-01-10")),
        );
        // The close from the 2nd must not leak into the 8th/9th.
        let values: Vec<f64> = nav.iter().map(|p| p.total_value).collect();
        assert_eq!(values, vec![0.0, 0.0, 120.0]);
    }

    #[test]
    fn test_empty_ledger_or_no_prices_yield_empty_history() {
        let dir = tempdir().unwrap();
        let prices = price_cache(dir.path());

        assert!(value_history(&[], &usd_fx(), &prices, None, None).is_empty());

        let txs = vec![tx("AAPL", 1.0, 100.0, "2024-01-02", Exchange::Nasdaq)];
        assert!(
            value_history(&txs, &usd_fx(), &prices, None, Some(date("2024-01-05"))).is_empty()
        );
    }

    #[test]
    fn test_return_history_against_cumulative_cost() {
        let dir = tempdir().unwrap();
        seed_series(
            dir.path(),
            "AAPL",
            &[("2024-01-02", 100.0), ("2024-01-03", 110.0)],
        );
        let prices = price_cache(dir.path());
        let txs = vec![Transaction::new(
            "AAPL",
            10.0,
            100.0,
            date("2024-01-02"),
            Exchange::Nasdaq,
            5.0,
        )];

        let returns = return_history(&txs, &usd_fx(), &prices, None, Some(date("2024-01-03")));

        // Cost basis 1005: day one slightly under water, day two up.
        assert!((returns[0].return_pct - (-5.0 / 1005.0 * 100.0)).abs() < 1e-9);
        assert!((returns[1].return_pct - (95.0 / 1005.0 * 100.0)).abs() < 1e-9);
    }

    #[test]
    fn test_return_is_zero_while_cost_is_zero() {
        let dir = tempdir().unwrap();
        seed_series(dir.path(), "AAPL", &[("2024-01-02", 100.0)]);
        let prices = price_cache(dir.path());
        let txs = vec![tx("AAPL", 1.0, 100.0, "2024-01-03", Exchange::Nasdaq)];

        let returns = return_history(
            &txs,
            &usd_fx(),
            &prices,
            Some(date("2024-01-02")),
            Some(date("2024-01-03")),
        );
        assert_eq!(returns[0].return_pct, 0.0);
    }

    #[test]
    fn test_benchmark_ticker_mapping() {
        assert_eq!(benchmark_ticker("sp500"), Some("^GSPC"));
        assert_eq!(benchmark_ticker("asx200"), Some("^AXJO"));
        assert_eq!(benchmark_ticker("allord"), Some("^AORD"));
        assert_eq!(benchmark_ticker("none"), None);
    }

    #[tokio::test]
    async fn test_benchmark_return_is_relative_to_first_close() {
        use crate::core::error::FetchError;
        use crate::core::price::PriceBar;
        use async_trait::async_trait;

        struct Fixed;

        #[async_trait]
        impl MarketDataProvider for Fixed {
            async fn history(
                &self,
                _ticker: &str,
                _start: Option<NaiveDate>,
            ) -> Result<Vec<PriceBar>, FetchError> {
                Ok(vec![
                    PriceBar {
                        date: "2024-01-02".parse().unwrap(),
                        open: 200.0,
                        high: 200.0,
                        low: 200.0,
                        close: 200.0,
                        volume: 0.0,
                        dividends: 0.0,
                        splits: 0.0,
                    },
                    PriceBar {
                        date: "2024-01-03".parse().unwrap(),
                        open: 210.0,
                        high: 210.0,
                        low: 210.0,
                        close: 210.0,
                        volume: 0.0,
                        dividends: 0.0,
                        splits: 0.0,
                    },
                ])
            }

            async fn quote(&self, _ticker: &str) -> Result<f64, FetchError> {
                Err(FetchError::NoData("quote".to_string()))
            }
        }

        let points = benchmark_return_history(
            &Fixed,
            "sp500",
            "2024-01-02".parse().unwrap(),
            "2024-01-03".parse().unwrap(),
        )
        .await;

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].benchmark_return, 0.0);
        assert!((points[1].benchmark_return - 5.0).abs() < 1e-9);

        let none = benchmark_return_history(
            &Fixed,
            "none",
            "2024-01-02".parse().unwrap(),
            "2024-01-03".parse().unwrap(),
        )
        .await;
        assert!(none.is_empty());
    }
}
