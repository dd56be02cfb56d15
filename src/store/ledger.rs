//! JSON-file persistence for the transaction and dividend ledgers
//!
//! Both ledgers are append-then-filter lists. A read failure degrades
//! to an empty list and resets the file to a valid empty store, so a
//! corrupt file can never wedge the dashboard; write failures are
//! surfaced to the caller so the user learns the action did not take.

use crate::core::ledger::{Dividend, Transaction};
use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

pub struct LedgerStore {
    transactions_path: PathBuf,
    dividends_path: PathBuf,
}

impl LedgerStore {
    pub fn new(transactions_path: PathBuf, dividends_path: PathBuf) -> Self {
        LedgerStore {
            transactions_path,
            dividends_path,
        }
    }

    pub fn load_transactions(&self) -> Vec<Transaction> {
        load_list(&self.transactions_path)
    }

    pub fn append_transaction(&self, tx: &Transaction) -> Result<()> {
        let mut list = self.load_transactions();
        list.push(tx.clone());
        save_list(&self.transactions_path, &list)
    }

    pub fn delete_transactions(&self, ids: &[String]) -> Result<()> {
        let mut list = self.load_transactions();
        list.retain(|tx| !ids.contains(&tx.id));
        save_list(&self.transactions_path, &list)
    }

    pub fn load_dividends(&self) -> Vec<Dividend> {
        load_list(&self.dividends_path)
    }

    pub fn append_dividend(&self, div: &Dividend) -> Result<()> {
        let mut list = self.load_dividends();
        list.push(div.clone());
        save_list(&self.dividends_path, &list)
    }

    pub fn delete_dividends(&self, ids: &[String]) -> Result<()> {
        let mut list = self.load_dividends();
        list.retain(|d| !ids.contains(&d.id));
        save_list(&self.dividends_path, &list)
    }
}

fn load_list<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!(
                "Could not load ledger file '{}': {}. Resetting to empty list.",
                path.display(),
                e
            );
            reset_to_empty(path);
            return Vec::new();
        }
    };

    match serde_json::from_str(&text) {
        Ok(list) => list,
        Err(e) => {
            warn!(
                "Could not parse ledger file '{}': {}. Resetting to empty list.",
                path.display(),
                e
            );
            reset_to_empty(path);
            Vec::new()
        }
    }
}

fn reset_to_empty(path: &Path) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if let Err(e) = fs::write(path, "[]") {
        error!(
            "Could not write empty ledger file '{}': {}",
            path.display(),
            e
        );
    }
}

fn save_list<T: Serialize>(path: &Path, list: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(list)?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write ledger file: {}", path.display()))
}
