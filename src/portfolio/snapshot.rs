//! Point-in-time portfolio valuation
//!
//! Values every open position as of a cutoff date using the last
//! cached close at or before it, converted to the display currency.
//! Closed positions and symbols with no usable price are left out.

use crate::core::ledger::{Transaction, round2};
use crate::fx::FxRates;
use crate::marketdata::PriceCache;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
pub struct HoldingSnapshot {
    pub symbol: String,
    pub shares: f64,
    /// Last close in the holding's native currency.
    pub price: f64,
    pub live_value: f64,
    pub trade_value: f64,
    pub trade_cost: f64,
    pub change_amount: f64,
    pub change_pct: f64,
    pub dividends: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PortfolioSnapshot {
    pub holdings: Vec<HoldingSnapshot>,
    pub total_value: f64,
    pub total_change_amount: f64,
    pub total_change_pct: f64,
}

/// Value the portfolio as of `as_of`. Only trades dated at or before
/// the cutoff count; money fields are in the display currency, rounded
/// to cents.
pub fn portfolio_snapshot(
    txs: &[Transaction],
    fx: &FxRates,
    prices: &PriceCache,
    as_of: NaiveDate,
    dividends_per_symbol: &HashMap<String, f64>,
) -> PortfolioSnapshot {
    let in_scope: Vec<&Transaction> = txs.iter().filter(|tx| tx.date <= as_of).collect();

    // Exchange of the most recent in-scope trade per symbol.
    let mut exchanges: HashMap<&str, crate::core::exchange::Exchange> = HashMap::new();
    for tx in &in_scope {
        exchanges.insert(tx.symbol.as_str(), tx.exchange);
    }

    let mut by_symbol: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
    for tx in &in_scope {
        by_symbol.entry(&tx.symbol).or_default().push(tx);
    }

    let mut holdings = Vec::new();
    let mut total_value = 0.0;
    let mut total_cost = 0.0;

    for (symbol, group) in by_symbol {
        let shares: f64 = group.iter().map(|tx| tx.shares).sum();
        if shares == 0.0 {
            continue;
        }

        let Some(&exchange) = exchanges.get(symbol) else {
            continue;
        };
        let series = prices.read(symbol, exchange, Some(as_of));
        let Some(price) = series.last_close_at_or_before(as_of) else {
            debug!("No price at or before {as_of} for {symbol}; skipped");
            continue;
        };

        let trade_value: f64 = group.iter().map(|tx| tx.trade_value).sum();
        let trade_cost: f64 = group.iter().map(|tx| tx.trade_cost).sum();
        let rate = fx.get(&group[0].currency).copied().unwrap_or(1.0);

        let trade_value_c = round2(trade_value * rate);
        let trade_cost_c = round2(trade_cost * rate);
        let live_value_c = round2(shares * price * rate);

        total_value += live_value_c;
        total_cost += trade_cost_c;

        let change_amount = round2(live_value_c - trade_cost_c);
        let change_pct = if trade_cost_c != 0.0 {
            round2(change_amount / trade_cost_c * 100.0)
        } else {
            0.0
        };

        holdings.push(HoldingSnapshot {
            symbol: symbol.to_string(),
            shares,
            price,
            live_value: live_value_c,
            trade_value: trade_value_c,
            trade_cost: trade_cost_c,
            change_amount,
            change_pct,
            dividends: round2(dividends_per_symbol.get(symbol).copied().unwrap_or(0.0)),
        });
    }

    let total_change_amount = round2(total_value - total_cost);
    let total_change_pct = if total_cost != 0.0 {
        round2(total_change_amount / total_cost * 100.0)
    } else {
        0.0
    };

    PortfolioSnapshot {
        holdings,
        total_value: round2(total_value),
        total_change_amount,
        total_change_pct,
    }
}
