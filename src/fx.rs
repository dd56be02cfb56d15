//! FX rate resolution with layered caching
//!
//! Rates are resolved per source-currency set against one target
//! currency. Lookups hit, in order: a per-resolver memo for the
//! current day, the persistent day cache (1 hour TTL), and finally the
//! live provider. A provider failure falls back to a rate of 1.0 so a
//! network outage degrades valuations instead of breaking them; the
//! fallback is never written back to the cache.

use crate::core::cache::Cache;
use crate::core::currency::CurrencyRateProvider;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const DAY_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Conversion rates keyed by source currency code.
pub type FxRates = HashMap<String, f64>;

pub struct FxResolver {
    provider: Arc<dyn CurrencyRateProvider>,
    day_cache: Arc<dyn Cache<String, f64>>,
    memo: Mutex<HashMap<String, FxRates>>,
}

impl FxResolver {
    pub fn new(
        provider: Arc<dyn CurrencyRateProvider>,
        day_cache: Arc<dyn Cache<String, f64>>,
    ) -> Self {
        FxResolver {
            provider,
            day_cache,
            memo: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve today's conversion rate from each source currency into
    /// `target`. The result always contains every requested source.
    pub async fn resolve(&self, sources: &BTreeSet<String>, target: &str) -> FxRates {
        let today = Utc::now().date_naive();
        let memo_key = format!(
            "{target}:{today}:{}",
            sources.iter().cloned().collect::<Vec<_>>().join(",")
        );

        let mut memo = self.memo.lock().await;
        if let Some(rates) = memo.get(&memo_key) {
            debug!("FX memo hit for {memo_key}");
            return rates.clone();
        }

        let mut rates = FxRates::new();
        for source in sources {
            if source == target {
                rates.insert(source.clone(), 1.0);
                continue;
            }

            let cache_key = format!("fx:{source}->{target}:{today}");
            if let Some(rate) = self.day_cache.get(&cache_key).await {
                rates.insert(source.clone(), rate);
                continue;
            }

            match self.provider.get_rate(source, target).await {
                Ok(rate) => {
                    self.day_cache
                        .put(cache_key, rate, Some(DAY_CACHE_TTL))
                        .await;
                    rates.insert(source.clone(), rate);
                }
                Err(e) => {
                    warn!("Could not fetch FX rate {source}->{target}: {e}. Using 1.0.");
                    rates.insert(source.clone(), 1.0);
                }
            }
        }

        memo.insert(memo_key, rates.clone());
        rates
    }
}
