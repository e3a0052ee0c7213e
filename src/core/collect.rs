//! Collection orchestrator.
//!
//! Walks the configured stores in order, dispatches each to its registered
//! strategy and concatenates the results. Nothing a single store does can
//! abort the run: incomplete entries, unknown strategy ids and strategy
//! errors are logged and skipped. A fixed inter-store pause follows every
//! store that was actually dispatched.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{error, info, warn};
use url::Url;

use crate::core::http::HttpFetcher;
use crate::core::model::{PriceObservation, StoreConfig};
use crate::core::pacing::{Pacing, Sleeper};
use crate::plugins::{ScrapeContext, StoreTarget};
use crate::registry::StrategyRegistry;

/// Shared flag that stops a run before the next store starts.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Collector<'a> {
    registry: &'a StrategyRegistry,
    fetcher: &'a dyn HttpFetcher,
    sleeper: &'a dyn Sleeper,
    pacing: Pacing,
    abort: Option<AbortFlag>,
}

impl<'a> Collector<'a> {
    pub fn new(
        registry: &'a StrategyRegistry,
        fetcher: &'a dyn HttpFetcher,
        sleeper: &'a dyn Sleeper,
        pacing: Pacing,
    ) -> Self {
        Self {
            registry,
            fetcher,
            sleeper,
            pacing,
            abort: None,
        }
    }

    pub fn with_abort(mut self, flag: AbortFlag) -> Self {
        self.abort = Some(flag);
        self
    }

    /// Returns observations in store-then-query order. An empty result is not
    /// an error here; the caller decides what it means.
    pub fn run(&self, stores: &[StoreConfig], queries: &[String]) -> Vec<PriceObservation> {
        let ctx = ScrapeContext {
            fetcher: self.fetcher,
            sleeper: self.sleeper,
            pacing: self.pacing,
        };
        let mut all = Vec::new();

        for store in stores {
            if self.abort.as_ref().is_some_and(AbortFlag::is_aborted) {
                warn!(collected = all.len(), "collection aborted before store '{}'", store.name);
                break;
            }

            let Some((endpoint, strategy_id)) = store.actionable() else {
                warn!(store = %store.name, "skipping store with missing endpoint/strategy id");
                continue;
            };
            let Some(strategy) = self.registry.resolve(strategy_id) else {
                warn!(store = %store.name, strategy = strategy_id, "no strategy registered; skipping store");
                continue;
            };

            info!(store = %store.name, strategy = strategy_id, endpoint, "scraping store");
            let outcome = Url::parse(endpoint)
                .map_err(Into::into)
                .and_then(|url| {
                    let target = StoreTarget {
                        name: &store.name,
                        endpoint: &url,
                    };
                    strategy.scrape(&ctx, &target, queries)
                });

            match outcome {
                Ok(found) if found.is_empty() => {
                    info!(store = %store.name, "no data from store");
                }
                Ok(found) => {
                    info!(store = %store.name, count = found.len(), "store scraped");
                    all.extend(found);
                }
                Err(e) => {
                    error!(store = %store.name, "error scraping store: {e}");
                }
            }

            self.sleeper.sleep(self.pacing.store_delay);
        }

        if all.is_empty() {
            warn!("no pricing data collected from any store");
        }
        all
    }
}
