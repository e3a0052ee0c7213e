//! Record shapes shared by collection and publishing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Sentinel for fields the store page did not provide.
pub const NOT_AVAILABLE: &str = "N/A";

/// One matched product at one store at one point in time.
///
/// Fields are private so the `price >= 0` invariant holds for every value,
/// including ones read back from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    #[serde(alias = "searched_product")]
    searched_term: String,
    #[serde(alias = "scraped_name")]
    matched_name: String,
    #[serde(deserialize_with = "non_negative_price")]
    price: f64,
    unit: String,
    store_name: String,
    item_url: String,
    #[serde(alias = "timestamp_utc")]
    observed_at: DateTime<Utc>,
}

impl PriceObservation {
    pub fn new(
        searched_term: impl Into<String>,
        matched_name: impl Into<String>,
        price: f64,
        unit: impl Into<String>,
        store_name: impl Into<String>,
        item_url: impl Into<String>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            searched_term: searched_term.into(),
            matched_name: matched_name.into(),
            price: clamp_price(price),
            unit: unit.into(),
            store_name: store_name.into(),
            item_url: item_url.into(),
            observed_at,
        }
    }

    pub fn searched_term(&self) -> &str {
        &self.searched_term
    }

    pub fn matched_name(&self) -> &str {
        &self.matched_name
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    pub fn item_url(&self) -> &str {
        &self.item_url
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}

/// NaN, infinities and negatives all collapse to `0.0`.
pub fn clamp_price(price: f64) -> f64 {
    if price.is_finite() && price > 0.0 {
        price
    } else {
        0.0
    }
}

fn non_negative_price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    Ok(clamp_price(raw))
}

/// One configured scrape target.
///
/// `endpoint` and `strategy_id` are optional at the type level because an
/// incomplete entry is skipped at run time rather than rejected at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_name")]
    pub name: String,
    #[serde(default, alias = "url")]
    pub endpoint: Option<String>,
    #[serde(default, alias = "identifier")]
    pub strategy_id: Option<String>,
}

fn default_store_name() -> String {
    "Unknown Store".to_string()
}

impl StoreConfig {
    pub fn new(name: &str, endpoint: &str, strategy_id: &str) -> Self {
        Self {
            name: name.to_string(),
            endpoint: Some(endpoint.to_string()),
            strategy_id: Some(strategy_id.to_string()),
        }
    }

    /// Returns `(endpoint, strategy_id)` when both are present and non-blank.
    pub fn actionable(&self) -> Option<(&str, &str)> {
        let endpoint = self.endpoint.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let strategy = self
            .strategy_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())?;
        Some((endpoint, strategy))
    }
}

/// Structured input to one collection run.
#[derive(Debug, Clone, Default)]
pub struct CollectionInput {
    /// Informational only; logged at the start of a run.
    pub location: serde_json::Value,
    pub stores: Vec<StoreConfig>,
    pub products: Vec<String>,
}

impl CollectionInput {
    /// Parses the three JSON documents a run is configured with. Any malformed
    /// document fails the whole parse so nothing touches the network.
    pub fn from_json(
        location_json: &str,
        stores_json: &str,
        products_json: &str,
    ) -> crate::core::error::Result<Self> {
        Ok(Self {
            location: serde_json::from_str(location_json)?,
            stores: serde_json::from_str(stores_json)?,
            products: serde_json::from_str(products_json)?,
        })
    }
}
