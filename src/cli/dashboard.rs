//! Dashboard rendering: valuation snapshot, per-currency summaries,
//! the monthly TWR calendar, and an optional benchmark comparison.

use super::ui;
use crate::App;
use crate::core::ledger::{Dividend, Transaction};
use crate::portfolio::snapshot::PortfolioSnapshot;
use crate::portfolio::twr::{FyWindow, MonthlyReturn};
use crate::portfolio::{aggregates, nav};
use anyhow::Result;
use chrono::{Local, NaiveDate};
use comfy_table::Cell;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

pub async fn run(
    app: &App,
    fy: Option<&str>,
    as_of: Option<NaiveDate>,
    benchmark: Option<&str>,
) -> Result<()> {
    let mut txs = app.ledger.load_transactions();
    txs.sort_by_key(|tx| tx.date);
    let divs = app.ledger.load_dividends();

    if txs.is_empty() {
        println!("No trades recorded. Record one with 'add-trade' first.");
        return Ok(());
    }

    let window = fy.and_then(FyWindow::parse);
    let as_of = as_of
        .or(window.map(|w| w.end))
        .unwrap_or_else(|| Local::now().date_naive());

    // Everything dated up to the window end (or all history) feeds the
    // calculations; the window itself only picks the TWR month range.
    let txs_calc: Vec<Transaction> = match window {
        Some(w) => txs.iter().filter(|tx| tx.date <= w.end).cloned().collect(),
        None => txs,
    };
    let divs_calc: Vec<Dividend> = match window {
        Some(w) => divs.iter().filter(|d| d.date <= w.end).cloned().collect(),
        None => divs,
    };
    if txs_calc.is_empty() {
        println!("No trades on or before {as_of}.");
        return Ok(());
    }

    let currencies: BTreeSet<String> = txs_calc
        .iter()
        .map(|tx| tx.currency.clone())
        .chain(divs_calc.iter().map(|d| d.currency.clone()))
        .collect();
    let fx = app.fx.resolve(&currencies, &app.config.currency).await;
    debug!("Resolved FX rates: {fx:?}");

    let dividends_per_symbol = aggregates::dividends_per_symbol(&divs_calc, &fx);
    let snapshot = crate::portfolio::snapshot::portfolio_snapshot(
        &txs_calc,
        &fx,
        &app.prices,
        as_of,
        &dividends_per_symbol,
    );

    print_holdings(&snapshot, &app.config.currency, as_of);

    ui::print_separator();
    print_currency_summaries(&txs_calc, &divs_calc);

    ui::print_separator();
    let calendar_json = app
        .calendar
        .get_or_compute(&txs_calc, &divs_calc, &fx, &app.prices, window.as_ref())
        .await;
    let calendar: Vec<MonthlyReturn> = serde_json::from_str(&calendar_json).unwrap_or_default();
    print_twr_calendar(&calendar, window.as_ref());

    let overall = nav::return_history(&txs_calc, &fx, &app.prices, None, Some(as_of));
    if let Some(last) = overall.last() {
        println!(
            "\nReturn on cost as of {as_of}: {}",
            ui::style_text(&format!("{:.2}%", last.return_pct), ui::StyleType::TotalValue)
        );
    }

    if let Some(bench) = benchmark.filter(|b| *b != "none") {
        print_benchmark(app, bench, &txs_calc, as_of).await;
    }

    Ok(())
}

fn print_holdings(snapshot: &PortfolioSnapshot, currency: &str, as_of: NaiveDate) {
    println!(
        "Portfolio as of {}\n",
        ui::style_text(&as_of.to_string(), ui::StyleType::Title)
    );

    if snapshot.holdings.is_empty() {
        println!("No open positions with price data.");
        return;
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Shares"),
        ui::header_cell("Price"),
        ui::header_cell(&format!("Value ({currency})")),
        ui::header_cell(&format!("Cost ({currency})")),
        ui::header_cell("Change"),
        ui::header_cell("Change %"),
        ui::header_cell("Dividends"),
    ]);

    for holding in &snapshot.holdings {
        table.add_row(vec![
            Cell::new(&holding.symbol),
            Cell::new(format!("{:.2}", holding.shares)),
            ui::money_cell(holding.price),
            ui::money_cell(holding.live_value),
            ui::money_cell(holding.trade_cost),
            ui::money_cell(holding.change_amount),
            ui::change_cell(holding.change_pct),
            ui::money_cell(holding.dividends),
        ]);
    }
    println!("{table}");

    println!(
        "\nTotal Value ({}): {}   Change: {} ({:.2}%)",
        ui::style_text(currency, ui::StyleType::TotalLabel),
        ui::style_text(
            &format!("{:.2}", snapshot.total_value),
            ui::StyleType::TotalValue
        ),
        ui::style_text(
            &format!("{:.2}", snapshot.total_change_amount),
            ui::StyleType::TotalLabel
        ),
        snapshot.total_change_pct
    );
}

fn print_currency_summaries(txs: &[Transaction], divs: &[Dividend]) {
    let invested = aggregates::cost_basis_by_currency(txs);
    let returned = aggregates::realized_proceeds_by_currency(txs);
    let fees = aggregates::broker_fees_by_currency(txs);
    let dividends = aggregates::dividends_by_currency(divs);

    let currencies: BTreeSet<&String> = invested
        .keys()
        .chain(returned.keys())
        .chain(fees.keys())
        .chain(dividends.keys())
        .collect();

    println!(
        "{}\n",
        ui::style_text("Summary by currency", ui::StyleType::Title)
    );
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("Invested"),
        ui::header_cell("Returned"),
        ui::header_cell("Broker fees"),
        ui::header_cell("Dividends"),
    ]);
    let amount = |map: &HashMap<String, f64>, currency: &String| {
        map.get(currency).copied().unwrap_or(0.0)
    };
    for currency in currencies {
        table.add_row(vec![
            Cell::new(currency),
            ui::money_cell(amount(&invested, currency)),
            ui::money_cell(amount(&returned, currency)),
            ui::money_cell(amount(&fees, currency)),
            ui::money_cell(amount(&dividends, currency)),
        ]);
    }
    println!("{table}");
}

fn print_twr_calendar(calendar: &[MonthlyReturn], window: Option<&FyWindow>) {
    let title = match window {
        Some(w) => format!("Monthly TWR, FY {}", w.label()),
        None => "Monthly TWR, current year".to_string(),
    };
    println!("{}\n", ui::style_text(&title, ui::StyleType::Title));

    if calendar.is_empty() {
        println!("No return data yet.");
        return;
    }

    let mut table = ui::new_styled_table();
    table.set_header(calendar.iter().map(|m| ui::header_cell(&m.month)));
    table.add_row(calendar.iter().map(|m| ui::change_cell(m.twr_pct)));
    println!("{table}");
}

async fn print_benchmark(app: &App, benchmark: &str, txs: &[Transaction], as_of: NaiveDate) {
    let Some(start) = txs.iter().map(|tx| tx.date).min() else {
        return;
    };
    let points = nav::benchmark_return_history(app.market.as_ref(), benchmark, start, as_of).await;
    match points.last() {
        Some(last) => println!(
            "Benchmark {benchmark} since {start}: {}",
            ui::style_text(
                &format!("{:.2}%", last.benchmark_return),
                ui::StyleType::TotalLabel
            )
        ),
        None => println!(
            "{}",
            ui::style_text(
                &format!("No benchmark data for '{benchmark}'."),
                ui::StyleType::Subtle
            )
        ),
    }
}
