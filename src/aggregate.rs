//! Reduction of dated price records into per-product aggregate documents.
//!
//! Two policies exist, one per persisted document shape:
//!
//! - [`AggregationPolicy::Rolling`]: trailing 30- and 7-day averages of every
//!   tracked field, recomputed from the supplied records only. Nothing of
//!   the previous document is kept, so after an incremental run (which
//!   supplies just yesterday's archive) both averages equal yesterday's
//!   prices rather than a true 30- or 7-day mean.
//! - [`AggregationPolicy::Snapshot`]: the records dated exactly 7 and exactly
//!   30 days ago, merged into whatever slots the stored document already has.
//!
//! Averages are rounded to cents with round-half-away-from-zero.

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::config::{AggregationPolicy, PriceField, LONG_WINDOW_DAYS, SHORT_WINDOW_DAYS};
use crate::error::Result;
use crate::models::{
    AggregateDocument, PriceRecord, PriceSet, ProductKey, RollingDocument, SlotRecord,
    SnapshotDocument,
};
use crate::store::ProductStore;

// ---------------------------------------------------------------------------
// Rolling averages
// ---------------------------------------------------------------------------

/// Round to 2 decimal places, halves away from zero.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Mean of the non-null `field` values among records at most `window_days`
/// old relative to `today`. Future-dated records never count.
pub fn window_average(
    records: &[PriceRecord],
    field: PriceField,
    today: NaiveDate,
    window_days: i64,
) -> Option<f64> {
    let (sum, count) = records
        .iter()
        .filter(|r| {
            let age = (today - r.date).num_days();
            (0..=window_days).contains(&age)
        })
        .filter_map(|r| r.prices.get(field))
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        None
    } else {
        Some(round_cents(sum / count as f64))
    }
}

/// `(avg30, avg7)` for every tracked field.
pub fn rolling_averages(records: &[PriceRecord], today: NaiveDate) -> (PriceSet, PriceSet) {
    let mut avg30 = PriceSet::default();
    let mut avg7 = PriceSet::default();
    for field in PriceField::ALL {
        avg30.set(field, window_average(records, field, today, LONG_WINDOW_DAYS));
        avg7.set(field, window_average(records, field, today, SHORT_WINDOW_DAYS));
    }
    (avg30, avg7)
}

// ---------------------------------------------------------------------------
// Snapshot slots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Day7,
    Day30,
}

/// Slot for a record dated `date`, or `None` unless it is exactly 7 or 30
/// days before `today`.
pub fn classify(date: NaiveDate, today: NaiveDate) -> Option<Slot> {
    match (today - date).num_days() {
        SHORT_WINDOW_DAYS => Some(Slot::Day7),
        LONG_WINDOW_DAYS => Some(Slot::Day30),
        _ => None,
    }
}

/// Merge `records` into `existing`, returning the updated document, or `None`
/// when no record lands in a slot.
///
/// Later records overwrite earlier ones in the same slot; slots that no record
/// touches keep their stored value.
pub fn merge_snapshot(
    existing: Option<SnapshotDocument>,
    product_id: u64,
    sub_type_name: &str,
    records: &[PriceRecord],
    today: NaiveDate,
) -> Option<SnapshotDocument> {
    let mut day7 = None;
    let mut day30 = None;
    for record in records {
        match classify(record.date, today) {
            Some(Slot::Day7) => day7 = Some(SlotRecord::from_record(record, product_id)),
            Some(Slot::Day30) => day30 = Some(SlotRecord::from_record(record, product_id)),
            None => {}
        }
    }
    if day7.is_none() && day30.is_none() {
        return None;
    }

    let mut doc = existing.unwrap_or_else(|| SnapshotDocument {
        product_id,
        sub_type_name: sub_type_name.to_string(),
        last_updated: today,
        day7: None,
        day30: None,
    });
    doc.product_id = product_id;
    doc.sub_type_name = sub_type_name.to_string();
    doc.last_updated = today;
    if day7.is_some() {
        doc.day7 = day7;
    }
    if day30.is_some() {
        doc.day30 = day30;
    }
    Some(doc)
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// What happened to one key's document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    Written(PathBuf),
    /// Nothing applicable in the records; the stored document was not touched.
    Unchanged,
}

/// Applies one [`AggregationPolicy`] to keys of a [`ProductStore`].
pub struct Aggregator {
    pub policy: AggregationPolicy,
    /// The date ages are measured from and `lastUpdated` is stamped with.
    pub today: NaiveDate,
}

impl Aggregator {
    pub fn new(policy: AggregationPolicy, today: NaiveDate) -> Self {
        Self { policy, today }
    }

    /// Load, merge and store the document for `key`.
    pub fn aggregate(
        &self,
        store: &ProductStore,
        key: &ProductKey,
        records: &[PriceRecord],
    ) -> Result<KeyOutcome> {
        if records.is_empty() {
            return Ok(KeyOutcome::Unchanged);
        }
        let product_id = key.numeric_product_id()?;

        match self.policy {
            AggregationPolicy::Rolling => {
                let (avg30, avg7) = rolling_averages(records, self.today);
                let doc = RollingDocument {
                    product_id,
                    sub_type_name: key.sub_type_name.clone(),
                    last_updated: self.today,
                    avg30,
                    avg7,
                };
                Ok(KeyOutcome::Written(store.store(key, &doc)?))
            }
            AggregationPolicy::Snapshot => {
                let existing = match store.load(key) {
                    Some(AggregateDocument::Snapshot(doc)) => Some(doc),
                    Some(other) => {
                        tracing::warn!(
                            "Replacing {} document for {:?} with snapshot shape",
                            other.shape(),
                            key
                        );
                        None
                    }
                    None => None,
                };
                match merge_snapshot(existing, product_id, &key.sub_type_name, records, self.today) {
                    Some(doc) => Ok(KeyOutcome::Written(store.store(key, &doc)?)),
                    None => Ok(KeyOutcome::Unchanged),
                }
            }
        }
    }
}
