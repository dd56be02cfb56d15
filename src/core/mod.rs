//! Core abstractions and shared types

pub mod cache;
pub mod config;
pub mod currency;
pub mod error;
pub mod exchange;
pub mod ledger;
pub mod log;
pub mod price;

// Re-export main types for cleaner imports
pub use cache::Cache;
pub use currency::CurrencyRateProvider;
pub use error::FetchError;
pub use exchange::Exchange;
pub use ledger::{Dividend, Transaction, round2};
pub use price::{MarketDataProvider, PriceBar, PriceSeries};
