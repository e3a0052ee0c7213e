//! The unit of publication: one run's observations plus its generation time.

use std::path::{Component, Path};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use sha2::{Digest, Sha256};

use crate::core::error::{Result, ScoutError};
use crate::core::model::PriceObservation;
use crate::core::time;

const FILE_STEM: &str = "pricing_data_";

/// Rejects prefixes that could place the snapshot outside the repository:
/// only plain directory names are allowed once surrounding slashes are trimmed.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    let trimmed = prefix.trim_matches('/');
    let plain = Path::new(trimmed)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if plain {
        Ok(())
    } else {
        Err(ScoutError::ValidationError(format!(
            "path prefix '{prefix}' must be a relative path of plain directory names"
        )))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    observations: Vec<PriceObservation>,
    generated_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(observations: Vec<PriceObservation>, generated_at: DateTime<Utc>) -> Self {
        Self {
            observations,
            generated_at,
        }
    }

    /// Snapshot stamped with the current time.
    pub fn now(observations: Vec<PriceObservation>) -> Self {
        Self::new(observations, time::now_utc())
    }

    pub fn observations(&self) -> &[PriceObservation] {
        &self.observations
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn stamp(&self) -> String {
        time::snapshot_stamp(&self.generated_at)
    }

    /// `<prefix>/pricing_data_<stamp>.json`, with slashes around the prefix
    /// normalized. An empty prefix places the file at the repository root.
    pub fn relative_path(&self, prefix: &str) -> String {
        let file = format!("{FILE_STEM}{}.json", self.stamp());
        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            file
        } else {
            format!("{prefix}/{file}")
        }
    }

    pub fn commit_message(&self) -> String {
        format!("Update pricing data - {}", self.stamp())
    }

    /// UTF-8 JSON array, pretty-printed with a 4-space indent.
    pub fn to_canonical_json(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut ser = Serializer::with_formatter(&mut buf, formatter);
        self.observations.serialize(&mut ser)?;
        Ok(buf)
    }

    /// Hex SHA-256 of the canonical JSON.
    pub fn digest(&self) -> Result<String> {
        let bytes = self.to_canonical_json()?;
        Ok(format!("{:x}", Sha256::digest(&bytes)))
    }
}
