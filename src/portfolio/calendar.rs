//! Cached monthly TWR calendar
//!
//! The TWR calendar walks the full NAV history, so it is the most
//! expensive view to build. Results are keyed by a digest of the
//! inputs and cached twice: in-process per resolver instance, and in
//! the persistent key-value store with a one hour TTL.

use crate::core::cache::Cache;
use crate::core::ledger::{Dividend, Transaction};
use crate::fx::FxRates;
use crate::marketdata::PriceCache;
use crate::portfolio::twr::{FyWindow, monthly_time_weighted_returns};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

const CALENDAR_TTL: Duration = Duration::from_secs(3600);

pub struct TwrCalendarCache {
    store: Arc<dyn Cache<String, String>>,
    memo: Mutex<HashMap<String, String>>,
}

impl TwrCalendarCache {
    pub fn new(store: Arc<dyn Cache<String, String>>) -> Self {
        TwrCalendarCache {
            store,
            memo: Mutex::new(HashMap::new()),
        }
    }

    /// JSON-encoded monthly TWR calendar for the given inputs, served
    /// from cache when an identical computation is already stored.
    pub async fn get_or_compute(
        &self,
        txs: &[Transaction],
        divs: &[Dividend],
        fx: &FxRates,
        prices: &PriceCache,
        window: Option<&FyWindow>,
    ) -> String {
        let key = cache_key(txs, fx, window);

        {
            let memo = self.memo.lock().await;
            if let Some(cached) = memo.get(&key) {
                debug!("TWR calendar memo hit: {key}");
                return cached.clone();
            }
        }

        if let Some(cached) = self.store.get(&key).await {
            info!("TWR calendar cache hit: {key}");
            self.memo.lock().await.insert(key, cached.clone());
            return cached;
        }
        info!("TWR calendar cache miss: {key}");

        let calendar = monthly_time_weighted_returns(txs, divs, fx, prices, window);
        let result = serde_json::to_string(&calendar).unwrap_or_else(|_| "[]".to_string());

        self.store
            .put(key.clone(), result.clone(), Some(CALENDAR_TTL))
            .await;
        self.memo.lock().await.insert(key, result.clone());
        result
    }
}

/// Stable digest over the inputs that determine the calendar. FX rates
/// go through a sorted map so iteration order cannot shift the key.
fn cache_key(txs: &[Transaction], fx: &FxRates, window: Option<&FyWindow>) -> String {
    #[derive(Serialize)]
    struct KeyInput<'a> {
        tx: &'a [Transaction],
        fx: BTreeMap<&'a str, f64>,
        window: Option<&'a FyWindow>,
    }

    let input = KeyInput {
        tx: txs,
        fx: fx.iter().map(|(k, v)| (k.as_str(), *v)).collect(),
        window,
    };
    let encoded = serde_json::to_string(&input).unwrap_or_default();

    let mut hasher = DefaultHasher::new();
    encoded.hash(&mut hasher);
    format!("pl_calendar:{:016x}", hasher.finish())
}
