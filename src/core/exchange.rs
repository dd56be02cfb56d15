//! Static exchange metadata: provider ticker suffix and settlement currency

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Stock exchanges the ledger understands. The provider ticker for a
/// holding is its symbol plus the exchange suffix; the settlement
/// currency of a trade is derived from the exchange, never entered by
/// the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    #[serde(rename = "ASX")]
    Asx,
    #[serde(rename = "BM&FBOVESPA")]
    Bovespa,
    #[serde(rename = "Euronext")]
    Euronext,
    #[serde(rename = "FWB")]
    Fwb,
    #[serde(rename = "HKEX")]
    Hkex,
    #[serde(rename = "JPX")]
    Jpx,
    #[serde(rename = "JSE")]
    Jse,
    #[serde(rename = "KRX")]
    Krx,
    #[serde(rename = "LSE")]
    Lse,
    #[serde(rename = "NSE")]
    Nse,
    #[serde(rename = "SGX")]
    Sgx,
    #[serde(rename = "SSE")]
    Sse,
    #[serde(rename = "SZSE")]
    Szse,
    #[serde(rename = "TSX")]
    Tsx,
    #[serde(rename = "TWSE")]
    Twse,
    #[serde(rename = "NASDAQ")]
    Nasdaq,
    #[serde(rename = "NYSE")]
    Nyse,
}

impl Exchange {
    /// Suffix appended to the symbol so the provider knows where to
    /// look. US exchanges and Euronext have none.
    pub fn suffix(&self) -> &'static str {
        match self {
            Exchange::Asx => ".AX",
            Exchange::Bovespa => ".SA",
            Exchange::Euronext => "",
            Exchange::Fwb => ".DE",
            Exchange::Hkex => ".HK",
            Exchange::Jpx => ".T",
            Exchange::Jse => ".JO",
            Exchange::Krx => ".KS",
            Exchange::Lse => ".L",
            Exchange::Nse => ".NS",
            Exchange::Sgx => ".SI",
            Exchange::Sse => ".SS",
            Exchange::Szse => ".SZ",
            Exchange::Tsx => ".TO",
            Exchange::Twse => ".TW",
            Exchange::Nasdaq => "",
            Exchange::Nyse => "",
        }
    }

    /// Settlement currency of trades on this exchange.
    pub fn currency(&self) -> &'static str {
        match self {
            Exchange::Asx => "AUD",
            Exchange::Bovespa => "BRL",
            Exchange::Euronext => "EUR",
            Exchange::Fwb => "EUR",
            Exchange::Hkex => "HKD",
            Exchange::Jpx => "JPY",
            Exchange::Jse => "ZAR",
            Exchange::Krx => "KRW",
            Exchange::Lse => "GBP",
            Exchange::Nse => "INR",
            Exchange::Sgx => "SGD",
            Exchange::Sse => "CNY",
            Exchange::Szse => "CNY",
            Exchange::Tsx => "CAD",
            Exchange::Twse => "TWD",
            Exchange::Nasdaq => "USD",
            Exchange::Nyse => "USD",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Exchange::Asx => "ASX",
            Exchange::Bovespa => "BM&FBOVESPA",
            Exchange::Euronext => "Euronext",
            Exchange::Fwb => "FWB",
            Exchange::Hkex => "HKEX",
            Exchange::Jpx => "JPX",
            Exchange::Jse => "JSE",
            Exchange::Krx => "KRX",
            Exchange::Lse => "LSE",
            Exchange::Nse => "NSE",
            Exchange::Sgx => "SGX",
            Exchange::Sse => "SSE",
            Exchange::Szse => "SZSE",
            Exchange::Tsx => "TSX",
            Exchange::Twse => "TWSE",
            Exchange::Nasdaq => "NASDAQ",
            Exchange::Nyse => "NYSE",
        }
    }

    /// Provider ticker for a symbol listed on this exchange.
    pub fn ticker(&self, symbol: &str) -> String {
        format!("{}{}", symbol, self.suffix())
    }
}

impl Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Exchange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ASX" => Ok(Exchange::Asx),
            "BM&FBOVESPA" => Ok(Exchange::Bovespa),
            "EURONEXT" => Ok(Exchange::Euronext),
            "FWB" => Ok(Exchange::Fwb),
            "HKEX" => Ok(Exchange::Hkex),
            "JPX" => Ok(Exchange::Jpx),
            "JSE" => Ok(Exchange::Jse),
            "KRX" => Ok(Exchange::Krx),
            "LSE" => Ok(Exchange::Lse),
            "NSE" => Ok(Exchange::Nse),
            "SGX" => Ok(Exchange::Sgx),
            "SSE" => Ok(Exchange::Sse),
            "SZSE" => Ok(Exchange::Szse),
            "TSX" => Ok(Exchange::Tsx),
            "TWSE" => Ok(Exchange::Twse),
            "NASDAQ" => Ok(Exchange::Nasdaq),
            "NYSE" => Ok(Exchange::Nyse),
            _ => Err(anyhow::anyhow!("Unknown exchange: {}", s)),
        }
    }
}
