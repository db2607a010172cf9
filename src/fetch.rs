//! Download of the dated price archives from the archive host.
//!
//! Archives are streamed to disk, never buffered in memory. A failed or empty
//! download never leaves a file behind.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::Client;

use crate::config;
use crate::error::{Result, TrackerError};

/// Downloads `prices-<date>.ppmd.7z` archives over HTTP.
pub struct ArchiveFetcher {
    /// Base URL the dated archive names are appended to.
    pub base_url: String,
    client: Client,
}

impl ArchiveFetcher {
    /// Create a fetcher for the given base URL.
    ///
    /// `timeout` bounds each whole request, so a stalled transfer cannot hang
    /// the run.
    pub fn new(base_url: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self {
            base_url: base_url
                .unwrap_or_else(|| config::ARCHIVE_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            client,
        })
    }

    /// Archive file name for a date, e.g. `prices-2024-05-01.ppmd.7z`.
    pub fn archive_name(date: NaiveDate) -> String {
        format!("prices-{}.ppmd.7z", date.format("%Y-%m-%d"))
    }

    /// Full URL of the archive for a date.
    pub fn archive_url(&self, date: NaiveDate) -> String {
        format!("{}/{}", self.base_url, Self::archive_name(date))
    }

    /// Stream `url` into `dest`, returning the number of bytes written.
    ///
    /// Fails on transport errors, non-2xx statuses and empty bodies. On any
    /// failure `dest` is removed.
    pub fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        tracing::info!("Downloading {} to {}", url, dest.display());

        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let result = (|| -> Result<u64> {
            let mut resp = self.client.get(url).send()?.error_for_status()?;
            let mut writer = BufWriter::new(File::create(dest)?);
            let written = io::copy(&mut resp, &mut writer)?;
            writer.flush()?;
            if written == 0 {
                return Err(TrackerError::EmptyPayload(url.to_string()));
            }
            Ok(written)
        })();

        match &result {
            Ok(bytes) => tracing::info!("Download complete ({} bytes)", bytes),
            Err(e) => {
                tracing::warn!("Failed to download {}: {}", url, e);
                // Clean up partial or empty file
                let _ = fs::remove_file(dest);
            }
        }

        result
    }
}
