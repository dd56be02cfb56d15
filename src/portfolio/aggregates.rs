//! Per-symbol and per-currency ledger summaries
//!
//! Currency-keyed summaries are reported in their native currencies;
//! only `dividends_per_symbol` converts into the display currency,
//! because it feeds the valuation snapshot.

use crate::core::ledger::{Dividend, Transaction, round2, symbol_currency};
use crate::fx::FxRates;
use std::collections::HashMap;

/// Total dividend income per symbol, converted to the display
/// currency. Unknown currencies convert at 1.0.
pub fn dividends_per_symbol(divs: &[Dividend], fx: &FxRates) -> HashMap<String, f64> {
    let mut totals: HashMap<String, f64> = HashMap::new();
    for div in divs {
        let rate = fx.get(&div.currency).copied().unwrap_or(1.0);
        *totals.entry(div.symbol.clone()).or_default() += div.dividend_amount * rate;
    }
    totals.into_iter().map(|(k, v)| (k, round2(v))).collect()
}

pub fn total_dividends(per_symbol: &HashMap<String, f64>) -> f64 {
    round2(per_symbol.values().sum())
}

/// Dividend income grouped by the currency it was paid in, unconverted.
pub fn dividends_by_currency(divs: &[Dividend]) -> HashMap<String, f64> {
    let mut totals: HashMap<String, f64> = HashMap::new();
    for div in divs {
        *totals.entry(div.currency.clone()).or_default() += div.dividend_amount;
    }
    totals.into_iter().map(|(k, v)| (k, round2(v))).collect()
}

/// Cost basis still invested, per currency: the weighted-average buy
/// cost of each net-long symbol times its net shares. Closed and net
/// short positions carry no basis.
pub fn cost_basis_by_currency(txs: &[Transaction]) -> HashMap<String, f64> {
    let mut net_shares: HashMap<&str, f64> = HashMap::new();
    for tx in txs {
        *net_shares.entry(&tx.symbol).or_default() += tx.shares;
    }

    let mut summary: HashMap<String, f64> = HashMap::new();
    for (symbol, net) in net_shares {
        if net <= 0.0 {
            continue;
        }
        let (buy_shares, buy_cost) = txs
            .iter()
            .filter(|tx| tx.symbol == symbol && tx.is_buy())
            .fold((0.0, 0.0), |(s, c), tx| (s + tx.shares, c + tx.trade_cost));
        let avg_cost = if buy_shares != 0.0 {
            buy_cost / buy_shares
        } else {
            0.0
        };
        if let Some(currency) = symbol_currency(txs, symbol) {
            *summary.entry(currency.to_string()).or_default() += avg_cost * net;
        }
    }
    summary.into_iter().map(|(k, v)| (k, round2(v))).collect()
}

/// Proceeds returned by sell trades, per currency. Sell `trade_cost`
/// is negative in the ledger, so the sign flips here.
pub fn realized_proceeds_by_currency(txs: &[Transaction]) -> HashMap<String, f64> {
    let mut summary: HashMap<String, f64> = HashMap::new();
    for tx in txs.iter().filter(|tx| tx.is_sell()) {
        *summary.entry(tx.currency.clone()).or_default() -= tx.trade_cost;
    }
    summary.into_iter().map(|(k, v)| (k, round2(v))).collect()
}

/// Total broker fees paid, per currency.
pub fn broker_fees_by_currency(txs: &[Transaction]) -> HashMap<String, f64> {
    let mut summary: HashMap<String, f64> = HashMap::new();
    for tx in txs {
        *summary.entry(tx.currency.clone()).or_default() += tx.broker_fee;
    }
    summary.into_iter().map(|(k, v)| (k, round2(v))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::exchange::Exchange;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn tx(symbol: &str, shares: f64, price: f64, exchange: Exchange, fee: f64) -> Transaction {
        Transaction::new(symbol, shares, price, date("2024-01-02"), exchange, fee)
    }

    #[test]
    fn test_dividends_per_symbol_converts() {
        let divs = vec![
            Dividend::new("BHP", date("2024-01-05"), 100.0, "AUD"),
            Dividend::new("BHP", date("2024-04-05"), 50.0, "AUD"),
            Dividend::new("AAPL", date("2024-02-01"), 10.0, "USD"),
        ];
        let fx = FxRates::from([("AUD".to_string(), 0.65), ("USD".to_string(), 1.0)]);

        let per_symbol = dividends_per_symbol(&divs, &fx);
        assert_eq!(per_symbol["BHP"], 97.5);
        assert_eq!(per_symbol["AAPL"], 10.0);
        assert_eq!(total_dividends(&per_symbol), 107.5);
    }

    #[test]
    fn test_dividends_per_symbol_unknown_currency_converts_at_unity() {
        let divs = vec![Dividend::new("X", date("2024-01-05"), 7.0, "ZAR")];
        let per_symbol = dividends_per_symbol(&divs, &FxRates::new());
        assert_eq!(per_symbol["X"], 7.0);
    }

    #[test]
    fn test_dividends_by_currency_is_unconverted() {
        let divs = vec![
            Dividend::new("BHP", date("2024-01-05"), 100.0, "AUD"),
            Dividend::new("AAPL", date("2024-02-01"), 10.0, "USD"),
        ];
        let by_currency = dividends_by_currency(&divs);
        assert_eq!(by_currency["AUD"], 100.0);
        assert_eq!(by_currency["USD"], 10.0);
    }

    #[test]
    fn test_cost_basis_uses_weighted_average_of_buys() {
        // Two buys at different prices, one partial sell.
        let txs = vec![
            tx("AAPL", 10.0, 100.0, Exchange::Nasdaq, 0.0), // cost 1000
            tx("AAPL", 10.0, 200.0, Exchange::Nasdaq, 0.0), // cost 2000
            tx("AAPL", -5.0, 300.0, Exchange::Nasdaq, 0.0),
        ];
        // avg buy cost 150, net 15 shares.
        let basis = cost_basis_by_currency(&txs);
        assert_eq!(basis["USD"], 2250.0);
    }

    #[test]
    fn test_cost_basis_skips_closed_positions() {
        let txs = vec![
            tx("AAPL", 10.0, 100.0, Exchange::Nasdaq, 0.0),
            tx("AAPL", -10.0, 120.0, Exchange::Nasdaq, 0.0),
            tx("BHP", 5.0, 40.0, Exchange::Asx, 0.0),
        ];
        let basis = cost_basis_by_currency(&txs);
        assert!(!basis.contains_key("USD"));
        assert_eq!(basis["AUD"], 200.0);
    }

    #[test]
    fn test_realized_proceeds_flip_sign() {
        let txs = vec![
            tx("AAPL", 10.0, 100.0, Exchange::Nasdaq, 5.0),
            tx("AAPL", -4.0, 150.0, Exchange::Nasdaq, 5.0), // cost -595
        ];
        let proceeds = realized_proceeds_by_currency(&txs);
        assert_eq!(proceeds["USD"], 595.0);
    }

    #[test]
    fn test_broker_fees_grouped_by_currency() {
        let txs = vec![
            tx("AAPL", 10.0, 100.0, Exchange::Nasdaq, 9.5),
            tx("AAPL", -5.0, 110.0, Exchange::Nasdaq, 9.5),
            tx("BHP", 5.0, 40.0, Exchange::Asx, 20.0),
        ];
        let fees = broker_fees_by_currency(&txs);
        assert_eq!(fees["USD"], 19.0);
        assert_eq!(fees["AUD"], 20.0);
    }

    #[test]
    fn test_empty_ledgers_yield_empty_summaries() {
        assert!(cost_basis_by_currency(&[]).is_empty());
        assert!(realized_proceeds_by_currency(&[]).is_empty());
        assert!(broker_fees_by_currency(&[]).is_empty());
        assert!(dividends_per_symbol(&[], &FxRates::new()).is_empty());
    }
}
