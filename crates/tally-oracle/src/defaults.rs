//! Static seed prices.
//!
//! Until an asset receives its first `PriceUpdated` event its record is
//! seeded from this table. Assets absent from the table are seeded at
//! $1.00 with 18 decimals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use tally_types::USD_SCALE;

/// Fallback price: $1.00.
pub const FALLBACK_PRICE_USD: u128 = USD_SCALE;

/// Fallback token decimals.
pub const FALLBACK_DECIMALS: u32 = 18;

/// One seed price entry.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceDefault {
    /// Asset address.
    pub asset: String,
    /// USD with 8 decimals.
    #[serde_as(as = "DisplayFromStr")]
    pub price_usd: u128,
    /// Token decimals.
    pub decimals: u32,
}

/// Lookup table of seed prices keyed by lowercase asset address.
#[derive(Clone, Debug, Default)]
pub struct PriceDefaults {
    entries: BTreeMap<String, PriceDefault>,
}

impl PriceDefaults {
    /// Empty table; every asset falls back to $1 / 18 decimals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from config entries. Later entries win.
    pub fn from_entries(entries: impl IntoIterator<Item = PriceDefault>) -> Self {
        let mut table = Self::new();
        for entry in entries {
            table.insert(entry);
        }
        table
    }

    /// Add or replace one entry.
    pub fn insert(&mut self, entry: PriceDefault) {
        self.entries.insert(entry.asset.to_lowercase(), entry);
    }

    /// `(price_usd, decimals)` for `asset`.
    ///
    /// # Arguments
    ///
    /// * `asset` - Asset address, any case
    pub fn lookup(&self, asset: &str) -> (u128, u32) {
        match self.entries.get(&asset.to_lowercase()) {
            Some(entry) => (entry.price_usd, entry.decimals),
            None => (FALLBACK_PRICE_USD, FALLBACK_DECIMALS),
        }
    }

    /// Number of configured entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
