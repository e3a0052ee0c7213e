//! Reference strategy for stores exposing a `/search?q=` results page.
//!
//! Markup contract: each candidate is a `div.product-item` holding
//! `h2.product-name`, `span.product-price`, `span.product-unit` and
//! `a.product-link`. The first candidate whose name contains the query
//! (case-insensitive) is taken.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::core::error::Result;
use crate::core::html::{HtmlDocument, HtmlNode};
use crate::core::model::{NOT_AVAILABLE, PriceObservation};
use crate::plugins::{ScrapeContext, ScrapeStrategy, StoreTarget};

pub const STRATEGY_ID: &str = "example_store_type_1";

static PRICE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?|\.\d+").unwrap());

#[derive(Debug, Default, Clone, Copy)]
pub struct ExampleStore;

pub(crate) fn boxed() -> Box<dyn ScrapeStrategy> {
    Box::new(ExampleStore)
}

impl ScrapeStrategy for ExampleStore {
    fn id(&self) -> &str {
        STRATEGY_ID
    }

    fn scrape(
        &self,
        ctx: &ScrapeContext<'_>,
        store: &StoreTarget<'_>,
        queries: &[String],
    ) -> Result<Vec<PriceObservation>> {
        let origin = origin_of(store.endpoint)?;
        let mut found = Vec::new();

        for (i, query) in queries.iter().enumerate() {
            if i > 0 {
                ctx.pause_between_queries();
            }
            let search_url = search_url(store.endpoint, query)?;
            info!(store = store.name, query = %query, url = %search_url, "searching");

            let body = match ctx.fetcher.get(&search_url) {
                Ok(body) => body,
                Err(e) if e.is_timeout() => {
                    error!(store = store.name, query = %query, "timeout: {e}");
                    continue;
                }
                Err(e) => {
                    error!(store = store.name, query = %query, "could not fetch results: {e}");
                    continue;
                }
            };

            let doc = HtmlDocument::parse(&body);
            let candidates = doc.find_all("div", "product-item");
            if candidates.is_empty() {
                warn!(store = store.name, query = %query, "no product elements on results page");
                continue;
            }

            match first_match(&candidates, query) {
                Some(item) => {
                    let obs = observation_from(item, query, store.name, &origin, &search_url);
                    debug!(store = store.name, query = %query, name = obs.matched_name(), price = obs.price(), "matched");
                    found.push(obs);
                }
                None => info!(store = store.name, query = %query, "no candidate matched"),
            }
        }

        Ok(found)
    }
}

/// `<endpoint>/search?q=<query>` with the query form-encoded.
pub fn search_url(endpoint: &Url, query: &str) -> Result<Url> {
    let base = endpoint.as_str().trim_end_matches('/');
    let mut url = Url::parse(&format!("{base}/search"))?;
    url.query_pairs_mut().append_pair("q", query);
    Ok(url)
}

/// Scheme + host (+ port) of the endpoint, used to resolve relative links.
pub fn origin_of(endpoint: &Url) -> Result<Url> {
    let origin = endpoint.origin().ascii_serialization();
    Ok(Url::parse(&format!("{origin}/"))?)
}

/// Strips currency symbols and thousands separators. Anything unparseable
/// becomes `0.0`.
pub fn parse_price(text: &str) -> f64 {
    let cleaned = text.replace(',', "");
    PRICE_NUMBER
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}

fn first_match<'a>(candidates: &[HtmlNode<'a>], query: &str) -> Option<HtmlNode<'a>> {
    let needle = query.to_lowercase();
    candidates.iter().copied().find(|item| {
        item.find_first("h2", "product-name")
            .map(|n| n.text().to_lowercase().contains(&needle))
            .unwrap_or(false)
    })
}

fn observation_from(
    item: HtmlNode<'_>,
    query: &str,
    store_name: &str,
    origin: &Url,
    search_url: &Url,
) -> PriceObservation {
    let name = text_or_na(item.find_first("h2", "product-name"));
    let price = item
        .find_first("span", "product-price")
        .map(|p| parse_price(&p.text()))
        .unwrap_or(0.0);
    let unit = text_or_na(item.find_first("span", "product-unit"));
    let item_url = item
        .find_first("a", "product-link")
        .and_then(|a| a.attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .and_then(|href| origin.join(href).ok())
        .unwrap_or_else(|| search_url.clone());

    PriceObservation::new(
        query,
        name,
        price,
        unit,
        store_name,
        item_url.to_string(),
        Utc::now(),
    )
}

fn text_or_na(node: Option<HtmlNode<'_>>) -> String {
    node.map(|n| n.text())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
