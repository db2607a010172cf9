//! One JSON document per product on the local filesystem.
//!
//! Reads are forgiving: a missing, unreadable or corrupt document is reported
//! as absent so the next aggregation starts fresh. Writes replace the whole
//! document through a temp file renamed into place, so an interrupted run
//! never leaves a half-written document behind.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::config::AggregationPolicy;
use crate::error::Result;
use crate::models::{AggregateDocument, ProductKey};

/// File naming scheme inside a category directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreLayout {
    /// `<productId>.json`
    PerProduct,
    /// `<productId>_<subTypeName>.json`
    PerVariant,
}

impl From<AggregationPolicy> for StoreLayout {
    fn from(policy: AggregationPolicy) -> Self {
        match policy {
            AggregationPolicy::Rolling => StoreLayout::PerProduct,
            AggregationPolicy::Snapshot => StoreLayout::PerVariant,
        }
    }
}

/// Reads and writes aggregate documents under a data directory.
pub struct ProductStore {
    /// Root data directory, containing one subdirectory per category.
    pub root: PathBuf,
    pub layout: StoreLayout,
}

impl ProductStore {
    pub fn new(root: impl Into<PathBuf>, layout: StoreLayout) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    /// Location of the document for `key`.
    pub fn path_for(&self, key: &ProductKey) -> PathBuf {
        let file_name = match self.layout {
            StoreLayout::PerProduct => format!("{}.json", key.product_id),
            StoreLayout::PerVariant => format!(
                "{}_{}.json",
                key.product_id,
                key.sub_type_name.replace(['/', '\\'], "-")
            ),
        };
        self.root.join(&key.category_id).join(file_name)
    }

    /// Load the document for `key`, or `None` if it is missing or unreadable.
    pub fn load(&self, key: &ProductKey) -> Option<AggregateDocument> {
        let path = self.path_for(key);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Unreadable document {}: {} -- starting fresh", path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!("Corrupt document {}: {} -- starting fresh", path.display(), e);
                None
            }
        }
    }

    /// Atomically replace the document for `key`.
    pub fn store<D: Serialize>(&self, key: &ProductKey, document: &D) -> Result<PathBuf> {
        let path = self.path_for(key);
        let dir = self.root.join(&key.category_id);
        fs::create_dir_all(&dir)?;

        let tmp = NamedTempFile::new_in(&dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, document)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        Ok(path)
    }

    /// True when none of the given category directories holds a document.
    pub fn is_empty<S: AsRef<str>>(&self, category_ids: &[S]) -> Result<bool> {
        for id in category_ids {
            if has_documents(&self.root.join(id.as_ref()))? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn has_documents(dir: &Path) -> Result<bool> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
            return Ok(true);
        }
    }
    Ok(false)
}
