//! Run orchestration: bootstrap history builds and incremental daily updates.
//!
//! A run downloads one archive at a time, extracts it, and aggregates the
//! records into the [`ProductStore`]. Every downloaded archive is removed
//! again once its date has been handled, whatever the outcome.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};

use crate::aggregate::{Aggregator, KeyOutcome};
use crate::archive::{PriceArchive, SevenZipArchive};
use crate::config::{self, AggregationPolicy, ModeSelection};
use crate::error::{Result, TrackerError};
use crate::extract::Extractor;
use crate::fetch::ArchiveFetcher;
use crate::models::{merge_batch, record_count, PriceBatch};
use crate::store::ProductStore;

// ---------------------------------------------------------------------------
// ArchiveProvider
// ---------------------------------------------------------------------------

/// Source of dated price archives.
pub trait ArchiveProvider {
    /// Download the archive for `date` to `dest`, returning its size in bytes.
    fn download(&self, date: NaiveDate, dest: &Path) -> Result<u64>;

    /// Open a previously downloaded archive.
    fn open(&self, path: &Path) -> Result<Box<dyn PriceArchive>>;
}

/// Archives fetched over HTTP from the archive host and read as 7z.
pub struct HttpArchiveProvider {
    pub fetcher: ArchiveFetcher,
}

impl ArchiveProvider for HttpArchiveProvider {
    fn download(&self, date: NaiveDate, dest: &Path) -> Result<u64> {
        let url = self.fetcher.archive_url(date);
        self.fetcher.fetch(&url, dest)
    }

    fn open(&self, path: &Path) -> Result<Box<dyn PriceArchive>> {
        Ok(Box::new(SevenZipArchive::open(path)?))
    }
}

// ---------------------------------------------------------------------------
// ArchiveFile
// ---------------------------------------------------------------------------

/// A downloaded archive that is deleted when dropped.
struct ArchiveFile {
    path: PathBuf,
}

impl Drop for ArchiveFile {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::warn!("Failed to remove archive {}: {}", self.path.display(), e);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes / report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Bootstrap,
    Incremental,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Bootstrap => f.write_str("bootstrap"),
            RunMode::Incremental => f.write_str("incremental"),
        }
    }
}

/// Result of fetching and extracting one date.
#[derive(Debug)]
pub enum DateOutcome {
    Extracted(PriceBatch),
    /// The archive could not be downloaded.
    Skipped(TrackerError),
    /// The archive was downloaded but could not be processed.
    Failed(TrackerError),
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub mode: RunMode,
    pub dates_processed: Vec<NaiveDate>,
    pub dates_skipped: Vec<NaiveDate>,
    pub dates_failed: Vec<NaiveDate>,
    pub documents_written: usize,
    pub documents_unchanged: usize,
    pub documents_failed: usize,
}

impl RunReport {
    fn new(mode: RunMode) -> Self {
        Self {
            mode,
            dates_processed: Vec::new(),
            dates_skipped: Vec::new(),
            dates_failed: Vec::new(),
            documents_written: 0,
            documents_unchanged: 0,
            documents_failed: 0,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} run: {} dates processed, {} skipped, {} failed; {} documents written, {} unchanged, {} failed",
            self.mode,
            self.dates_processed.len(),
            self.dates_skipped.len(),
            self.dates_failed.len(),
            self.documents_written,
            self.documents_unchanged,
            self.documents_failed
        )
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Drives fetch → extract → aggregate → store for one run.
///
/// Built by [`TrackerBuilder`](crate::TrackerBuilder).
pub struct Tracker<P: ArchiveProvider> {
    pub(crate) provider: P,
    pub(crate) extractor: Extractor,
    pub(crate) aggregator: Aggregator,
    pub(crate) store: ProductStore,
    pub(crate) category_ids: Vec<String>,
    pub(crate) work_dir: PathBuf,
    pub(crate) history_days: u32,
    pub(crate) mode: ModeSelection,
}

impl<P: ArchiveProvider> Tracker<P> {
    pub fn store(&self) -> &ProductStore {
        &self.store
    }

    pub fn today(&self) -> NaiveDate {
        self.aggregator.today
    }

    pub fn policy(&self) -> AggregationPolicy {
        self.aggregator.policy
    }

    /// Resolve the configured [`ModeSelection`] against the current store.
    pub fn detect_mode(&self) -> Result<RunMode> {
        match self.mode {
            ModeSelection::Bootstrap => Ok(RunMode::Bootstrap),
            ModeSelection::Incremental => Ok(RunMode::Incremental),
            ModeSelection::Auto => {
                if self.store.is_empty(self.category_ids.as_slice())? {
                    Ok(RunMode::Bootstrap)
                } else {
                    Ok(RunMode::Incremental)
                }
            }
        }
    }

    /// Run in the detected mode.
    ///
    /// Bootstrap runs skip dates that fail. Incremental runs stop at the first
    /// failing date and return [`TrackerError::DateFailed`].
    pub fn run(&self) -> Result<RunReport> {
        fs::create_dir_all(&self.work_dir)?;
        let mode = self.detect_mode()?;
        tracing::info!(
            "Starting {} run ({} policy) as of {}",
            mode,
            self.aggregator.policy,
            self.today()
        );
        let report = match mode {
            RunMode::Bootstrap => self.bootstrap()?,
            RunMode::Incremental => self.incremental()?,
        };
        tracing::info!("{}", report);
        Ok(report)
    }

    /// Dates of the trailing history window, oldest first, excluding today.
    pub fn history_dates(&self) -> Vec<NaiveDate> {
        (1..=i64::from(self.history_days))
            .rev()
            .map(|days| self.today() - Duration::days(days))
            .collect()
    }

    /// Dates fetched by an incremental run, with their log labels.
    pub fn incremental_dates(&self) -> Vec<(NaiveDate, &'static str)> {
        let today = self.today();
        match self.aggregator.policy {
            AggregationPolicy::Snapshot => vec![
                (today - Duration::days(config::SHORT_WINDOW_DAYS), "7-day"),
                (today - Duration::days(config::LONG_WINDOW_DAYS), "30-day"),
            ],
            AggregationPolicy::Rolling => vec![(today - Duration::days(1), "daily")],
        }
    }

    /// Build the full history window, then aggregate every key once.
    ///
    /// Every day of the window is downloaded under both policies. With the
    /// snapshot policy only the records dated exactly 7 and 30 days ago end
    /// up in a document; the other days are still fetched so the run logs
    /// and reports the availability of the whole window.
    pub fn bootstrap(&self) -> Result<RunReport> {
        let mut report = RunReport::new(RunMode::Bootstrap);
        let dates = self.history_dates();
        tracing::info!("Building {}-day history", dates.len());

        let mut all = PriceBatch::new();
        for date in dates {
            match self.process_date(date) {
                DateOutcome::Extracted(batch) => {
                    merge_batch(&mut all, batch);
                    report.dates_processed.push(date);
                }
                DateOutcome::Skipped(e) => {
                    tracing::warn!("Failed to download {}: {}", date, e);
                    report.dates_skipped.push(date);
                }
                DateOutcome::Failed(e) => {
                    tracing::error!("Error processing {}: {}", date, e);
                    report.dates_failed.push(date);
                }
            }
        }

        tracing::info!(
            "Building database for {} products ({} records)",
            all.len(),
            record_count(&all)
        );
        self.aggregate_batch(&all, &mut report);
        tracing::info!("History build complete");
        Ok(report)
    }

    /// Fetch and aggregate each incremental target date independently.
    pub fn incremental(&self) -> Result<RunReport> {
        let mut report = RunReport::new(RunMode::Incremental);

        for (date, label) in self.incremental_dates() {
            tracing::info!("Fetching {} data for {}", label, date);
            match self.process_date(date) {
                DateOutcome::Extracted(batch) => {
                    if batch.is_empty() {
                        tracing::warn!("No price data extracted for {}", date);
                    }
                    self.aggregate_batch(&batch, &mut report);
                    report.dates_processed.push(date);
                    tracing::info!("Successfully processed {} data for {}", label, date);
                }
                DateOutcome::Skipped(e) => {
                    tracing::warn!("Failed to download {} data for {}: {}", label, date, e);
                    return Err(TrackerError::DateFailed {
                        date,
                        reason: e.to_string(),
                    });
                }
                DateOutcome::Failed(e) => {
                    tracing::error!("Failed to process {} data for {}: {}", label, date, e);
                    return Err(TrackerError::DateFailed {
                        date,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Download and extract one date. The downloaded archive is always removed.
    pub fn process_date(&self, date: NaiveDate) -> DateOutcome {
        let archive = ArchiveFile {
            path: self.work_dir.join(ArchiveFetcher::archive_name(date)),
        };

        if let Err(e) = self.provider.download(date, &archive.path) {
            return DateOutcome::Skipped(e);
        }

        let result = self.provider.open(&archive.path).and_then(|mut opened| {
            self.extractor
                .extract(opened.as_mut(), date, &self.work_dir)
        });

        match result {
            Ok(batch) => {
                tracing::info!(
                    "Extracted {} records for {} products on {}",
                    record_count(&batch),
                    batch.len(),
                    date
                );
                DateOutcome::Extracted(batch)
            }
            Err(e) => DateOutcome::Failed(e),
        }
    }

    /// Aggregate every key of `batch`; a failing key never stops the others.
    pub fn aggregate_batch(&self, batch: &PriceBatch, report: &mut RunReport) {
        if batch.is_empty() {
            return;
        }
        tracing::info!("Updating {} product files", batch.len());

        for (key, records) in batch {
            match self.aggregator.aggregate(&self.store, key, records) {
                Ok(KeyOutcome::Written(path)) => {
                    tracing::debug!("Wrote {}", path.display());
                    report.documents_written += 1;
                }
                Ok(KeyOutcome::Unchanged) => report.documents_unchanged += 1,
                Err(e) => {
                    tracing::error!(
                        "Failed to update {} [{}] product {} ({}): {}",
                        config::category_name(&key.category_id).unwrap_or("unknown category"),
                        key.category_id,
                        key.product_id,
                        key.sub_type_name,
                        e
                    );
                    report.documents_failed += 1;
                }
            }
        }
    }
}
