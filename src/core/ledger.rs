//! Ledger record types: trades and dividend receipts
//!
//! Records are immutable once created. `trade_value` and `trade_cost`
//! are derived exactly once, at creation time, and persisted with the
//! record so they are never recomputed from stale inputs.

use crate::core::exchange::Exchange;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Round to two decimal places, the precision of all money amounts in
/// the ledger.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A settled buy or sell. Sells carry negative `shares`, which makes
/// `trade_value` and `trade_cost` negative as well.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub symbol: String,
    pub shares: f64,
    pub price: f64,
    pub trade_value: f64,
    pub currency: String,
    pub date: NaiveDate,
    pub exchange: Exchange,
    #[serde(default)]
    pub broker_fee: f64,
    pub trade_cost: f64,
}

impl Transaction {
    /// Build a new trade record. Currency comes from the exchange, and
    /// the derived money fields are fixed here.
    pub fn new(
        symbol: &str,
        shares: f64,
        price: f64,
        date: NaiveDate,
        exchange: Exchange,
        broker_fee: f64,
    ) -> Self {
        let trade_value = round2(shares * price);
        let trade_cost = round2(shares * price + broker_fee);
        Transaction {
            id: Uuid::new_v4().to_string(),
            symbol: symbol.trim().to_uppercase().replace('.', "-"),
            shares,
            price,
            trade_value,
            currency: exchange.currency().to_string(),
            date,
            exchange,
            broker_fee,
            trade_cost,
        }
    }

    pub fn is_buy(&self) -> bool {
        self.shares > 0.0
    }

    pub fn is_sell(&self) -> bool {
        self.shares < 0.0
    }

    /// Provider ticker for this holding.
    pub fn ticker(&self) -> String {
        self.exchange.ticker(&self.symbol)
    }
}

/// A dividend cash receipt, recorded in the currency it was paid in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dividend {
    pub id: String,
    pub symbol: String,
    pub date: NaiveDate,
    pub dividend_amount: f64,
    pub currency: String,
}

impl Dividend {
    pub fn new(symbol: &str, date: NaiveDate, dividend_amount: f64, currency: &str) -> Self {
        Dividend {
            id: Uuid::new_v4().to_string(),
            symbol: symbol.trim().to_uppercase().replace('.', "-"),
            date,
            dividend_amount,
            currency: currency.to_uppercase(),
        }
    }
}

/// Symbol -> exchange of its most recent trade. Later trades win, so a
/// relisted symbol follows its latest exchange.
pub fn symbol_exchanges(txs: &[Transaction]) -> std::collections::HashMap<String, Exchange> {
    let mut map = std::collections::HashMap::new();
    for tx in txs {
        map.insert(tx.symbol.clone(), tx.exchange);
    }
    map
}

/// Ledger currency of a symbol: the currency of its first trade.
pub fn symbol_currency<'a>(txs: &'a [Transaction], symbol: &str) -> Option<&'a str> {
    txs.iter()
        .find(|tx| tx.symbol == symbol)
        .map(|tx| tx.currency.as_str())
}
