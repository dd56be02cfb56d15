//! Monthly time-weighted returns and financial-year windows
//!
//! Daily returns strip out external cash flows (trades at value,
//! dividends) before chain-linking, so the series measures market
//! performance rather than contribution timing. The financial year
//! runs July through June.

use crate::core::ledger::{Dividend, Transaction};
use crate::fx::FxRates;
use crate::marketdata::PriceCache;
use crate::portfolio::nav::value_history;
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A July-to-June financial year window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FyWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FyWindow {
    /// Parse a label like "2023/2024" or "23/24". Anything without a
    /// slash (including the "All" sentinel) is no window.
    pub fn parse(label: &str) -> Option<FyWindow> {
        let (base, _) = label.split_once('/')?;
        let year: i32 = base.trim().parse().ok()?;
        let start_year = if base.trim().len() == 2 {
            2000 + year
        } else {
            year
        };
        Some(FyWindow {
            start: NaiveDate::from_ymd_opt(start_year, 7, 1)?,
            end: NaiveDate::from_ymd_opt(start_year + 1, 6, 30)?,
        })
    }

    pub fn label(&self) -> String {
        format!("{}/{}", self.start.year(), self.start.year() + 1)
    }
}

/// Financial-year label of the year containing `date`.
pub fn fiscal_year_label(date: NaiveDate) -> String {
    let start_year = if date.month() >= 7 {
        date.year()
    } else {
        date.year() - 1
    };
    format!("{}/{}", start_year, start_year + 1)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReturn {
    pub month: String,
    pub twr_pct: f64,
}

/// Dividend cash received per day, converted to the display currency.
/// Unknown currencies convert at 1.0.
pub fn daily_dividend_flows(divs: &[Dividend], fx: &FxRates) -> HashMap<NaiveDate, f64> {
    let mut flows: HashMap<NaiveDate, f64> = HashMap::new();
    for div in divs {
        let rate = fx.get(&div.currency).copied().unwrap_or(1.0);
        *flows.entry(div.date).or_default() += div.dividend_amount * rate;
    }
    flows
}

/// Chain-linked monthly TWR percentages over a full month range: the
/// window's months when given, otherwise the current calendar year.
/// Months without NAV data report 0.
pub fn monthly_time_weighted_returns(
    txs: &[Transaction],
    divs: &[Dividend],
    fx: &FxRates,
    prices: &PriceCache,
    window: Option<&FyWindow>,
) -> Vec<MonthlyReturn> {
    let nav = value_history(txs, fx, prices, None, window.map(|w| w.end));
    if nav.is_empty() {
        return Vec::new();
    }

    let mut trade_flows: HashMap<NaiveDate, f64> = HashMap::new();
    for tx in txs {
        let rate = fx.get(&tx.currency).copied().unwrap_or(1.0);
        *trade_flows.entry(tx.date).or_default() += tx.trade_value * rate;
    }
    let div_flows = daily_dividend_flows(divs, fx);

    // Chain-link (1 + r) per calendar month.
    let mut growth: HashMap<(i32, u32), f64> = HashMap::new();
    for pair in nav.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        let daily_return = if prev.total_value != 0.0 {
            let flow = trade_flows.get(&curr.date).copied().unwrap_or(0.0)
                + div_flows.get(&curr.date).copied().unwrap_or(0.0);
            (curr.total_value - prev.total_value - flow) / prev.total_value
        } else {
            0.0
        };
        *growth
            .entry((curr.date.year(), curr.date.month()))
            .or_insert(1.0) *= 1.0 + daily_return;
    }

    let months = match window {
        Some(w) => month_span(w.start, w.end),
        None => {
            let year = Local::now().year();
            (1..=12).map(|m| (year, m)).collect()
        }
    };

    months
        .into_iter()
        .map(|(year, month)| MonthlyReturn {
            month: month_label(year, month),
            twr_pct: growth
                .get(&(year, month))
                .map(|g| (g - 1.0) * 100.0)
                .unwrap_or(0.0),
        })
        .collect()
}

fn month_span(start: NaiveDate, end: NaiveDate) -> Vec<(i32, u32)> {
    let mut months = Vec::new();
    let (mut year, mut month) = (start.year(), start.month());
    while (year, month) <= (end.year(), end.month()) {
        months.push((year, month));
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    months
}

fn month_label(year: i32, month: u32) -> String {
    match NaiveDate::from_ymd_opt(year, month, 1) {
        Some(date) => date.format("%b-%y").to_string(),
        None => format!("{year}-{month:02}"),
    }
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

    fn usd_fx() -> FxRates {
        FxRates::from([("USD".to_string(), 1.0)])
    }

    fn window(start: &str, end: &str) -> FyWindow {
        FyWindow {
            start: date(start),
            end: date(end),
        }
    }

    #[test]
    fn test_fy_parse_long_and_short_labels() {
        let w = FyWindow::parse("2023/2024").unwrap();
        assert_eq!(w.start, date("2023-07-01"));
        assert_eq!(w.end, date("2024-06-30"));
        assert_eq!(FyWindow::parse("23/24"), Some(w));
        assert_eq!(w.label(), "2023/2024");

        assert_eq!(FyWindow::parse("All"), None);
        assert_eq!(FyWindow::parse("abc/def"), None);
    }

    #[test]
    fn test_fiscal_year_label_straddles_july() {
        assert_eq!(fiscal_year_label(date("2024-06-30")), "2023/2024");
        assert_eq!(fiscal_year_label(date("2024-07-01")), "2024/2025");
    }

    #[test]
    fn test_monthly_twr_chains_daily_returns() {
        let dir = tempdir().unwrap();
        seed_series(
            dir.path(),
            "AAPL",
            &[("2024-01-01", 100.0), ("2024-01-02", 110.0)],
        );
        let prices = price_cache(dir.path());
        let txs = vec![Transaction::new(
            "AAPL",
            1.0,
            100.0,
            date("2024-01-01"),
            Exchange::Nasdaq,
            0.0,
        )];

        let twr = monthly_time_weighted_returns(
            &txs,
            &[],
            &usd_fx(),
            &prices,
            Some(&window("2024-01-01", "2024-02-29")),
        );

        assert_eq!(twr.len(), 2);
        assert_eq!(twr[0].month, "Jan-24");
        assert!((twr[0].twr_pct - 10.0).abs() < 1e-9);
        // February holds the carried-forward price, so zero return.
        assert_eq!(twr[1].month, "Feb-24");
        assert!((twr[1].twr_pct).abs() < 1e-9);
    }

    #[test]
    fn test_dividend_flow_is_stripped_from_twr() {
        let dir = tempdir().unwrap();
        seed_series(
            dir.path(),
            "AAPL",
            &[("2024-01-01", 100.0), ("2024-01-02", 110.0)],
        );
        let prices = price_cache(dir.path());
        let txs = vec![Transaction::new(
            "AAPL",
            1.0,
            100.0,
            date("2024-01-01"),
            Exchange::Nasdaq,
            0.0,
        )];
        let divs = vec![Dividend::new("AAPL", date("2024-01-02"), 5.0, "USD")];

        let twr = monthly_time_weighted_returns(
            &txs,
            &divs,
            &usd_fx(),
            &prices,
            Some(&window("2024-01-01", "2024-01-31")),
        );

        // (110 - 100 - 5) / 100
        assert!((twr[0].twr_pct - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_trade_flow_uses_trade_value_not_cost() {
        let dir = tempdir().unwrap();
        seed_series(
            dir.path(),
            "AAPL",
            &[("2024-01-01", 100.0), ("2024-01-02", 100.0)],
        );
        let prices = price_cache(dir.path());
        // Second buy on day two is a pure inflow; with flat prices the
        // fee must not show up as negative performance.
        let txs = vec![
            Transaction::new("AAPL", 1.0, 100.0, date("2024-01-01"), Exchange::Nasdaq, 0.0),
            Transaction::new("AAPL", 1.0, 100.0, date("2024-01-02"), Exchange::Nasdaq, 9.5),
        ];

        let twr = monthly_time_weighted_returns(
            &txs,
            &[],
            &usd_fx(),
            &prices,
            Some(&window("2024-01-01", "2024-01-31")),
        );
        assert!((twr[0].twr_pct).abs() < 1e-9);
    }

    #[test]
    fn test_months_without_data_report_zero() {
        let dir = tempdir().unwrap();
        seed_series(dir.path(), "AAPL", &[("2023-12-01", 100.0)]);
        let prices = price_cache(dir.path());
        let txs = vec![Transaction::new(
            "AAPL",
            1.0,
            100.0,
            date("2023-12-01"),
            Exchange::Nasdaq,
            0.0,
        )];

        let twr = monthly_time_weighted_returns(
            &txs,
            &[],
            &usd_fx(),
            &prices,
            Some(&window("2023-07-01", "2024-06-30")),
        );

        assert_eq!(twr.len(), 12);
        assert_eq!(twr[0].month, "Jul-23");
        assert_eq!(twr[0].twr_pct, 0.0);
        assert_eq!(twr[11].month, "Jun-24");
    }

    #[test]
    fn test_empty_ledger_yields_empty_calendar() {
        let dir = tempdir().unwrap();
        let prices = price_cache(dir.path());
        let twr = monthly_time_weighted_returns(
            &[],
            &[],
            &usd_fx(),
            &prices,
            Some(&window("2023-07-01", "2024-06-30")),
        );
        assert!(twr.is_empty());
    }
}
