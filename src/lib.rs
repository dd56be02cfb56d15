pub mod cli;
pub mod core;
pub mod fx;
pub mod marketdata;
pub mod portfolio;
pub mod providers;
pub mod store;

use crate::core::cache::Cache;
use crate::core::config::AppConfig;
use crate::core::exchange::Exchange;
use crate::core::price::MarketDataProvider;
use crate::fx::FxResolver;
use crate::marketdata::{PriceCache, RetryPolicy};
use crate::portfolio::calendar::TwrCalendarCache;
use crate::providers::yahoo_finance::{YahooCurrencyProvider, YahooFinanceProvider};
use crate::store::kv::KvStore;
use crate::store::ledger::LedgerStore;
use crate::store::memory::MemoryCache;
use anyhow::Result;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A parsed top-level command, ready to run against a built [`App`].
#[derive(Debug, Clone)]
pub enum AppCommand {
    Refresh {
        force: bool,
    },
    Dashboard {
        fy: Option<String>,
        as_of: Option<NaiveDate>,
        benchmark: Option<String>,
    },
    AddTrade {
        symbol: String,
        shares: f64,
        price: f64,
        date: NaiveDate,
        exchange: Exchange,
        broker_fee: f64,
    },
    AddDividend {
        symbol: String,
        date: NaiveDate,
        amount: f64,
        currency: String,
    },
    DeleteTrades {
        ids: Vec<String>,
    },
    DeleteDividends {
        ids: Vec<String>,
    },
}

/// Shared application state handed to every command.
pub struct App {
    pub config: AppConfig,
    pub ledger: LedgerStore,
    pub prices: PriceCache,
    pub fx: FxResolver,
    pub calendar: TwrCalendarCache,
    pub market: Arc<dyn MarketDataProvider>,
}

pub async fn run_command(cmd: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("navtrack starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let base_url = config.yahoo_base_url();
    let market: Arc<dyn MarketDataProvider> = Arc::new(YahooFinanceProvider::new(base_url));
    let currency_provider = Arc::new(YahooCurrencyProvider::new(base_url));

    let retry = RetryPolicy {
        max_retries: config.max_retries,
        backoff_base: Duration::from_secs(config.backoff_base_seconds),
    };
    let prices = PriceCache::new(config.prices_dir()?, Arc::clone(&market), retry);
    let ledger = LedgerStore::new(config.transactions_path()?, config.dividends_path()?);

    let (fx_cache, calendar_cache) = open_caches(&config);
    let fx = FxResolver::new(currency_provider, fx_cache);
    let calendar = TwrCalendarCache::new(calendar_cache);

    let app = App {
        config,
        ledger,
        prices,
        fx,
        calendar,
        market,
    };

    match cmd {
        AppCommand::Refresh { force } => cli::refresh::run(&app, force).await,
        AppCommand::Dashboard {
            fy,
            as_of,
            benchmark,
        } => cli::dashboard::run(&app, fy.as_deref(), as_of, benchmark.as_deref()).await,
        AppCommand::AddTrade {
            symbol,
            shares,
            price,
            date,
            exchange,
            broker_fee,
        } => cli::ledger::add_trade(&app, &symbol, shares, price, date, exchange, broker_fee).await,
        AppCommand::AddDividend {
            symbol,
            date,
            amount,
            currency,
        } => cli::ledger::add_dividend(&app, &symbol, date, amount, &currency),
        AppCommand::DeleteTrades { ids } => cli::ledger::delete_trades(&app, &ids),
        AppCommand::DeleteDividends { ids } => cli::ledger::delete_dividends(&app, &ids),
    }
}

/// Persistent key-value collections for the FX day cache and the TWR
/// calendar. A keyspace that cannot be opened degrades to in-memory
/// caches for this run.
fn open_caches(
    config: &AppConfig,
) -> (Arc<dyn Cache<String, f64>>, Arc<dyn Cache<String, String>>) {
    let opened = config.cache_dir().and_then(|dir| {
        let store = KvStore::open(&dir)?;
        let fx = store.collection::<f64>("fx")?;
        let calendar = store.collection::<String>("pl_calendar")?;
        Ok((fx, calendar))
    });

    match opened {
        Ok((fx, calendar)) => (Arc::new(fx), Arc::new(calendar)),
        Err(e) => {
            warn!("Could not open persistent cache: {e}. Using in-memory caches for this run.");
            (
                Arc::new(MemoryCache::new()),
                Arc::new(MemoryCache::new()),
            )
        }
    }
}
