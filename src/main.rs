use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use navtrack::core::exchange::Exchange;
use navtrack::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for navtrack::AppCommand {
    fn from(cmd: Commands) -> navtrack::AppCommand {
        match cmd {
            Commands::Refresh { force } => navtrack::AppCommand::Refresh { force },
            Commands::Dashboard {
                fy,
                as_of,
                benchmark,
            } => navtrack::AppCommand::Dashboard {
                fy,
                as_of,
                benchmark,
            },
            Commands::AddTrade {
                symbol,
                shares,
                price,
                date,
                exchange,
                broker_fee,
            } => navtrack::AppCommand::AddTrade {
                symbol,
                shares,
                price,
                date,
                exchange,
                broker_fee,
            },
            Commands::AddDividend {
                symbol,
                date,
                amount,
                currency,
            } => navtrack::AppCommand::AddDividend {
                symbol,
                date,
                amount,
                currency,
            },
            Commands::DeleteTrades { ids } => navtrack::AppCommand::DeleteTrades { ids },
            Commands::DeleteDividends { ids } => navtrack::AppCommand::DeleteDividends { ids },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Refresh the cached price history for all ledger symbols
    Refresh {
        /// Discard cached series and re-fetch full history
        #[arg(long)]
        force: bool,
    },
    /// Display the portfolio dashboard
    Dashboard {
        /// Financial year window, e.g. 2023/2024
        #[arg(long)]
        fy: Option<String>,
        /// Value the portfolio as of this date (YYYY-MM-DD)
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Benchmark index: sp500, asx200 or allord
        #[arg(long)]
        benchmark: Option<String>,
    },
    /// Record a trade (negative shares for a sell)
    AddTrade {
        symbol: String,
        #[arg(allow_negative_numbers = true)]
        shares: f64,
        price: f64,
        date: NaiveDate,
        exchange: Exchange,
        #[arg(long, default_value_t = 0.0)]
        broker_fee: f64,
    },
    /// Record a dividend receipt
    AddDividend {
        symbol: String,
        date: NaiveDate,
        amount: f64,
        currency: String,
    },
    /// Delete trades by id
    DeleteTrades { ids: Vec<String> },
    /// Delete dividends by id
    DeleteDividends { ids: Vec<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => navtrack::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = navtrack::core::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
currency: "USD"

providers:
  yahoo:
    base_url: "https://query1.finance.yahoo.com"
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
