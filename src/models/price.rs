use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::PriceField;
use crate::error::{Result, TrackerError};

// ---------------------------------------------------------------------------
// PriceSet — One value (or average) per tracked price field
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSet {
    pub low_price: Option<f64>,
    pub mid_price: Option<f64>,
    pub high_price: Option<f64>,
    pub market_price: Option<f64>,
    pub direct_low_price: Option<f64>,
}

impl PriceSet {
    pub fn get(&self, field: PriceField) -> Option<f64> {
        match field {
            PriceField::Low => self.low_price,
            PriceField::Mid => self.mid_price,
            PriceField::High => self.high_price,
            PriceField::Market => self.market_price,
            PriceField::DirectLow => self.direct_low_price,
        }
    }

    pub fn set(&mut self, field: PriceField, value: Option<f64>) {
        let slot = match field {
            PriceField::Low => &mut self.low_price,
            PriceField::Mid => &mut self.mid_price,
            PriceField::High => &mut self.high_price,
            PriceField::Market => &mut self.market_price,
            PriceField::DirectLow => &mut self.direct_low_price,
        };
        *slot = value;
    }
}

// ---------------------------------------------------------------------------
// ProductKey — (category, product, variant) identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductKey {
    pub category_id: String,
    pub product_id: String,
    pub sub_type_name: String,
}

impl ProductKey {
    pub fn new(
        category_id: impl Into<String>,
        product_id: impl Into<String>,
        sub_type_name: impl Into<String>,
    ) -> Self {
        Self {
            category_id: category_id.into(),
            product_id: product_id.into(),
            sub_type_name: sub_type_name.into(),
        }
    }

    /// The product id as the integer written into persisted documents.
    pub fn numeric_product_id(&self) -> Result<u64> {
        self.product_id
            .trim()
            .parse::<u64>()
            .map_err(|_| TrackerError::InvalidProductId(self.product_id.clone()))
    }
}

// ---------------------------------------------------------------------------
// PriceRecord — A single product's prices on one archive date
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub category_id: String,
    pub product_id: String,
    pub sub_type_name: String,
    pub prices: PriceSet,
}

impl PriceRecord {
    pub fn key(&self) -> ProductKey {
        ProductKey::new(
            self.category_id.as_str(),
            self.product_id.as_str(),
            self.sub_type_name.as_str(),
        )
    }
}

// ---------------------------------------------------------------------------
// PriceBatch — Records grouped by key, in arrival order
// ---------------------------------------------------------------------------

pub type PriceBatch = BTreeMap<ProductKey, Vec<PriceRecord>>;

/// Append every record of `from` onto the matching key of `into`.
pub fn merge_batch(into: &mut PriceBatch, from: PriceBatch) {
    for (key, mut records) in from {
        into.entry(key).or_default().append(&mut records);
    }
}

/// Number of records across all keys of a batch.
pub fn record_count(batch: &PriceBatch) -> usize {
    batch.values().map(Vec::len).sum()
}
