//! Ledger mutation commands: record and delete trades and dividends.

use crate::App;
use crate::core::exchange::Exchange;
use crate::core::ledger::{Dividend, Transaction};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use console::style;

/// Record a trade. The ticker is verified against the provider before
/// anything is written, and the price cache is warmed for the new pair
/// so the next dashboard can value it.
pub async fn add_trade(
    app: &App,
    symbol: &str,
    shares: f64,
    price: f64,
    date: NaiveDate,
    exchange: Exchange,
    broker_fee: f64,
) -> Result<()> {
    let tx = Transaction::new(symbol, shares, price, date, exchange, broker_fee);

    let ticker = tx.ticker();
    app.market
        .quote(&ticker)
        .await
        .with_context(|| format!("Ticker '{ticker}' could not be verified"))?;

    app.ledger.append_transaction(&tx)?;
    app.prices
        .ensure_fresh(&[(tx.symbol.clone(), tx.exchange)], false)
        .await;

    let side = if tx.is_sell() { "sell" } else { "buy" };
    println!(
        "{} {side} of {} {} @ {} ({} {:.2})",
        style("Recorded").green(),
        tx.shares.abs(),
        tx.symbol,
        tx.price,
        tx.currency,
        tx.trade_cost
    );
    Ok(())
}

pub fn add_dividend(
    app: &App,
    symbol: &str,
    date: NaiveDate,
    amount: f64,
    currency: &str,
) -> Result<()> {
    let div = Dividend::new(symbol, date, amount, currency);
    app.ledger.append_dividend(&div)?;
    println!(
        "{} dividend of {} {:.2} for {}",
        style("Recorded").green(),
        div.currency,
        div.dividend_amount,
        div.symbol
    );
    Ok(())
}

pub fn delete_trades(app: &App, ids: &[String]) -> Result<()> {
    let before = app.ledger.load_transactions().len();
    app.ledger.delete_transactions(ids)?;
    let removed = before - app.ledger.load_transactions().len();
    println!("Deleted {removed} of {} requested trades.", ids.len());
    Ok(())
}

pub fn delete_dividends(app: &App, ids: &[String]) -> Result<()> {
    let before = app.ledger.load_dividends().len();
    app.ledger.delete_dividends(ids)?;
    let removed = before - app.ledger.load_dividends().len();
    println!("Deleted {removed} of {} requested dividends.", ids.len());
    Ok(())
}
