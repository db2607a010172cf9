//! Rolling TCGplayer price history built from the daily tcgcsv archives.
//!
//! Each run downloads dated `prices-<date>.ppmd.7z` exports, extracts the
//! price records of the tracked categories, and folds them into one JSON
//! document per product under a data directory.
//!
//! # Quick start
//!
//! ```no_run
//! use tcg_price_history::{AggregationPolicy, TrackerBuilder};
//!
//! let tracker = TrackerBuilder::default()
//!     .data_dir("data")
//!     .policy(AggregationPolicy::Snapshot)
//!     .build()
//!     .unwrap();
//!
//! // Bootstraps 30 days of history on an empty data directory,
//! // otherwise fetches the 7-day and 30-day archives.
//! let report = tracker.run().unwrap();
//! println!("{}", report);
//! ```

pub mod aggregate;
pub mod archive;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod store;
pub mod tracker;

pub use aggregate::{Aggregator, KeyOutcome};
pub use archive::{PriceArchive, SevenZipArchive};
pub use config::{AggregationPolicy, ModeSelection, PriceField};
pub use error::{Result, TrackerError};
pub use extract::Extractor;
pub use fetch::ArchiveFetcher;
pub use store::{ProductStore, StoreLayout};
pub use tracker::{ArchiveProvider, DateOutcome, HttpArchiveProvider, RunMode, RunReport, Tracker};

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{NaiveDate, Utc};

// ---------------------------------------------------------------------------
// TrackerBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`Tracker`].
///
/// Every setting has a default, so `TrackerBuilder::default().build()` gives a
/// tracker writing snapshot documents to `./data` from the public archive.
pub struct TrackerBuilder {
    data_dir: PathBuf,
    work_dir: Option<PathBuf>,
    policy: AggregationPolicy,
    mode: ModeSelection,
    history_days: u32,
    timeout: Duration,
    archive_base: Option<String>,
    as_of: Option<NaiveDate>,
    categories: Vec<String>,
}

impl Default for TrackerBuilder {
    fn default() -> Self {
        Self {
            data_dir: config::default_data_dir(),
            work_dir: None,
            policy: AggregationPolicy::default(),
            mode: ModeSelection::default(),
            history_days: config::DEFAULT_HISTORY_DAYS,
            timeout: Duration::from_secs(config::DEFAULT_TIMEOUT_SECS),
            archive_base: None,
            as_of: None,
            categories: config::TARGET_CATEGORIES
                .iter()
                .map(|c| c.id.to_string())
                .collect(),
        }
    }
}

impl TrackerBuilder {
    /// Directory holding the per-category product documents.
    ///
    /// Defaults to `data` in the working directory.
    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_dir = path.as_ref().to_path_buf();
        self
    }

    /// Directory for downloaded archives and extraction scratch space.
    ///
    /// Defaults to the platform cache directory (e.g.
    /// `~/.cache/tcg-price-history` on Linux).
    pub fn work_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.work_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Document shape to produce. Defaults to [`AggregationPolicy::Snapshot`].
    pub fn policy(mut self, policy: AggregationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Force a run mode instead of detecting it from the store.
    pub fn mode(mut self, mode: ModeSelection) -> Self {
        self.mode = mode;
        self
    }

    /// Number of trailing days a bootstrap run fetches. Defaults to 30.
    pub fn history_days(mut self, days: u32) -> Self {
        self.history_days = days;
        self
    }

    /// HTTP timeout per archive download. Defaults to 300 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the archive host base URL.
    pub fn archive_base(mut self, base: impl Into<String>) -> Self {
        self.archive_base = Some(base.into());
        self
    }

    /// Compute ages and `lastUpdated` relative to this date instead of the
    /// current UTC date.
    pub fn as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    /// Replace the tracked category ids.
    pub fn categories<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Build a tracker that downloads from the archive host.
    pub fn build(self) -> Result<Tracker<HttpArchiveProvider>> {
        let fetcher = ArchiveFetcher::new(self.archive_base.clone(), self.timeout)?;
        self.build_with_provider(HttpArchiveProvider { fetcher })
    }

    /// Build a tracker around a custom [`ArchiveProvider`].
    pub fn build_with_provider<P: ArchiveProvider>(self, provider: P) -> Result<Tracker<P>> {
        if self.categories.is_empty() {
            return Err(TrackerError::InvalidArgument(
                "at least one category must be tracked".to_string(),
            ));
        }
        if self.history_days == 0 || self.history_days > config::MAX_HISTORY_DAYS {
            return Err(TrackerError::InvalidArgument(format!(
                "history_days must be between 1 and {}, got {}",
                config::MAX_HISTORY_DAYS,
                self.history_days
            )));
        }
        let today = self.as_of.unwrap_or_else(|| Utc::now().date_naive());

        Ok(Tracker {
            provider,
            extractor: Extractor::new(self.categories.iter().cloned()),
            aggregator: Aggregator::new(self.policy, today),
            store: ProductStore::new(self.data_dir, StoreLayout::from(self.policy)),
            category_ids: self.categories,
            work_dir: self.work_dir.unwrap_or_else(config::default_work_dir),
            history_days: self.history_days,
            mode: self.mode,
        })
    }
}
