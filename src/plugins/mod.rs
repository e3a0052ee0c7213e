//! Scrape strategies: one pluggable implementation per store type.
//!
//! A strategy receives a store endpoint and the product queries and returns the
//! observations it could match. Expected failures (timeouts, HTTP errors,
//! missing markup) are absorbed inside the strategy and only shrink the result.
//! An `Err` is reserved for failures of the invocation itself, such as an
//! endpoint that is not a URL; the collector logs it and moves on.

pub mod example_store;

use url::Url;

use crate::core::error::Result;
use crate::core::http::HttpFetcher;
use crate::core::model::PriceObservation;
use crate::core::pacing::{Pacing, Sleeper};

/// Collaborators a strategy may use while scraping.
pub struct ScrapeContext<'a> {
    pub fetcher: &'a dyn HttpFetcher,
    pub sleeper: &'a dyn Sleeper,
    pub pacing: Pacing,
}

impl ScrapeContext<'_> {
    /// Respectful delay between successive queries to the same store.
    pub fn pause_between_queries(&self) {
        self.sleeper.sleep(self.pacing.query_delay);
    }
}

/// The store being scraped, as seen by a strategy.
pub struct StoreTarget<'a> {
    pub name: &'a str,
    pub endpoint: &'a Url,
}

pub trait ScrapeStrategy {
    /// Registry key this strategy is installed under.
    fn id(&self) -> &str;

    fn scrape(
        &self,
        ctx: &ScrapeContext<'_>,
        store: &StoreTarget<'_>,
        queries: &[String],
    ) -> Result<Vec<PriceObservation>>;
}
