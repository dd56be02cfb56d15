use super::ui;
use crate::App;
use crate::core::ledger::symbol_exchanges;
use anyhow::Result;
use console::style;

/// Bring the cached price series for every ledger symbol up to date.
pub async fn run(app: &App, force: bool) -> Result<()> {
    let txs = app.ledger.load_transactions();
    let pairs: Vec<_> = symbol_exchanges(&txs).into_iter().collect();

    if pairs.is_empty() {
        println!("No holdings to refresh. Record a trade with 'add-trade' first.");
        return Ok(());
    }

    let pb = ui::new_progress_bar(pairs.len() as u64, true);
    pb.set_message(if force {
        "Re-fetching full price history..."
    } else {
        "Refreshing price data..."
    });

    app.prices
        .ensure_fresh_with(&pairs, force, &|| pb.inc(1))
        .await;
    pb.finish_and_clear();

    println!(
        "{} ({} symbols)",
        style("Price cache refreshed.").green(),
        pairs.len()
    );
    Ok(())
}
