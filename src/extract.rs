//! Extraction of per-product price records from a daily archive.
//!
//! Archive entries are laid out as `<date>/<categoryId>/<groupId>/prices`.
//! Only entries of the configured categories are unpacked, into a scratch
//! directory that is removed again before [`Extractor::extract`] returns.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde_json::Value;

use crate::archive::{entry_relative_path, PriceArchive};
use crate::config::{self, PriceField};
use crate::error::Result;
use crate::models::{PriceBatch, PriceRecord, PriceSet};

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Turns archive entries into [`PriceRecord`]s for a fixed set of categories.
pub struct Extractor {
    categories: HashSet<String>,
}

impl Extractor {
    /// Create an extractor for the given category ids.
    pub fn new<I, S>(category_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            categories: category_ids.into_iter().map(Into::into).collect(),
        }
    }

    /// An extractor for [`config::TARGET_CATEGORIES`].
    pub fn for_target_categories() -> Self {
        Self::new(config::TARGET_CATEGORIES.iter().map(|c| c.id))
    }

    /// Category id of an entry if it qualifies for extraction.
    ///
    /// An entry qualifies when its path has at least four segments, the second
    /// segment is a tracked category and the last one is `prices`.
    pub fn qualifying_category<'n>(&self, entry_name: &'n str) -> Option<&'n str> {
        let parts: Vec<&str> = entry_name.split(['/', '\\']).collect();
        if parts.len() < 4 {
            return None;
        }
        let category = parts[1];
        let last = parts[parts.len() - 1];
        if last == config::PRICES_ENTRY_NAME && self.categories.contains(category) {
            Some(category)
        } else {
            None
        }
    }

    /// Extract all records for `date` from `archive`.
    ///
    /// Qualifying entries are unpacked into a `temp_<date>_*` directory under
    /// `scratch_root`. A malformed entry is logged and skipped; errors reading
    /// the archive itself are returned.
    pub fn extract(
        &self,
        archive: &mut dyn PriceArchive,
        date: NaiveDate,
        scratch_root: &Path,
    ) -> Result<PriceBatch> {
        tracing::info!("Extracting prices for {}", date);

        let mut batch = PriceBatch::new();

        let targets: Vec<(String, String)> = archive
            .entry_names()
            .into_iter()
            .filter_map(|name| {
                self.qualifying_category(&name)
                    .map(str::to_string)
                    .map(|category| (name, category))
            })
            .collect();

        if targets.is_empty() {
            tracing::warn!("No relevant price entries found for {}", date);
            return Ok(batch);
        }
        tracing::info!("Found {} price entries to process", targets.len());

        fs::create_dir_all(scratch_root)?;
        let scratch = tempfile::Builder::new()
            .prefix(&format!("temp_{}_", date.format("%Y-%m-%d")))
            .tempdir_in(scratch_root)?;

        let names: Vec<String> = targets.iter().map(|(name, _)| name.clone()).collect();
        archive.extract_entries(&names, scratch.path())?;

        for (name, category_id) in &targets {
            let path = scratch.path().join(entry_relative_path(name));
            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    tracing::error!("Error reading entry {}: {}", name, e);
                    continue;
                }
            };
            let value: Value = match serde_json::from_str(&content) {
                Ok(value) => value,
                Err(e) => {
                    tracing::error!("Failed to decode JSON in {}: {}", name, e);
                    continue;
                }
            };
            let Some(items) = price_items(value) else {
                tracing::warn!("Unexpected JSON shape in {}, skipping", name);
                continue;
            };
            for item in &items {
                if let Some(record) = parse_record(item, category_id, date) {
                    batch.entry(record.key()).or_default().push(record);
                }
            }
        }

        if let Err(e) = scratch.close() {
            tracing::warn!("Failed to remove scratch directory: {}", e);
        }

        Ok(batch)
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Items of a `prices` document.
///
/// Accepts `{"results": [...]}`, a bare list, or a single object. Returns
/// `None` for any other shape.
pub fn price_items(content: Value) -> Option<Vec<Value>> {
    match content {
        Value::Object(mut map) if map.contains_key("results") => match map.remove("results") {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        Value::Array(items) => Some(items),
        obj @ Value::Object(_) => Some(vec![obj]),
        _ => None,
    }
}

/// Build a record from one price item, or `None` if it has no usable
/// `productId`.
pub fn parse_record(item: &Value, category_id: &str, date: NaiveDate) -> Option<PriceRecord> {
    let product_id = match item.get("productId")? {
        Value::Number(n) => n.to_string(),
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return None,
    };

    let sub_type_name = item
        .get("subTypeName")
        .and_then(Value::as_str)
        .unwrap_or(config::DEFAULT_SUB_TYPE)
        .to_string();

    let mut prices = PriceSet::default();
    for field in PriceField::ALL {
        prices.set(field, price_value(item.get(field.key())));
    }

    Some(PriceRecord {
        date,
        category_id: category_id.to_string(),
        product_id,
        sub_type_name,
        prices,
    })
}

/// Missing-safe numeric lookup: absent, null or non-numeric values are `None`.
fn price_value(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}
