use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::price::{PriceRecord, PriceSet};

// ---------------------------------------------------------------------------
// RollingDocument — avg30 / avg7 trailing averages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollingDocument {
    pub product_id: u64,
    pub sub_type_name: String,
    pub last_updated: NaiveDate,
    pub avg30: PriceSet,
    pub avg7: PriceSet,
}

// ---------------------------------------------------------------------------
// SlotRecord — A price record as stored in a snapshot slot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRecord {
    pub date: NaiveDate,
    pub product_id: u64,
    pub sub_type_name: String,
    #[serde(flatten)]
    pub prices: PriceSet,
}

impl SlotRecord {
    pub fn from_record(record: &PriceRecord, product_id: u64) -> Self {
        Self {
            date: record.date,
            product_id,
            sub_type_name: record.sub_type_name.clone(),
            prices: record.prices,
        }
    }
}

// ---------------------------------------------------------------------------
// SnapshotDocument — Fixed day7 / day30 slots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDocument {
    pub product_id: u64,
    pub sub_type_name: String,
    pub last_updated: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day7: Option<SlotRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day30: Option<SlotRecord>,
}

// ---------------------------------------------------------------------------
// AggregateDocument — Either persisted shape
// ---------------------------------------------------------------------------

/// A persisted per-product document.
///
/// Rolling is tried first when reading: it requires `avg30`/`avg7`, while a
/// snapshot document has no required fields beyond its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AggregateDocument {
    Rolling(RollingDocument),
    Snapshot(SnapshotDocument),
}

impl AggregateDocument {
    pub fn last_updated(&self) -> NaiveDate {
        match self {
            Self::Rolling(doc) => doc.last_updated,
            Self::Snapshot(doc) => doc.last_updated,
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            Self::Rolling(_) => "rolling",
            Self::Snapshot(_) => "snapshot",
        }
    }
}
