//! Shared test fixtures for the tcg-price-history integration tests.
//!
//! Provides an in-memory [`PriceArchive`], an [`ArchiveProvider`] serving such
//! archives per date, record/date helpers, and a one-shot HTTP responder for
//! exercising the fetcher without the network.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread::{self, JoinHandle};

use chrono::{Duration, NaiveDate};
use tcg_price_history::archive::entry_relative_path;
use tcg_price_history::models::{PriceRecord, PriceSet};
use tcg_price_history::{ArchiveProvider, PriceArchive, Result, TrackerError};

// ---------------------------------------------------------------------------
// Dates / records
// ---------------------------------------------------------------------------

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

pub fn days_ago(days: i64) -> NaiveDate {
    today() - Duration::days(days)
}

pub fn record(date: NaiveDate, product_id: &str, sub_type: &str, market: Option<f64>) -> PriceRecord {
    PriceRecord {
        date,
        category_id: "1".to_string(),
        product_id: product_id.to_string(),
        sub_type_name: sub_type.to_string(),
        prices: PriceSet {
            market_price: market,
            ..PriceSet::default()
        },
    }
}

// ---------------------------------------------------------------------------
// MemoryArchive
// ---------------------------------------------------------------------------

/// An archive whose entries live in memory.
///
/// Records which entry names were extracted so tests can assert that
/// non-qualifying entries are never unpacked.
#[derive(Default, Clone)]
pub struct MemoryArchive {
    pub entries: BTreeMap<String, Vec<u8>>,
    pub extracted: RefCell<Vec<String>>,
    /// Where the last extraction wrote to.
    pub last_dest: RefCell<Option<std::path::PathBuf>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, name: &str, content: impl Into<Vec<u8>>) -> Self {
        self.entries.insert(name.to_string(), content.into());
        self
    }

    pub fn with_json(self, name: &str, value: serde_json::Value) -> Self {
        self.with_entry(name, serde_json::to_vec(&value).unwrap())
    }
}

impl PriceArchive for MemoryArchive {
    fn entry_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn extract_entries(&mut self, entries: &[String], dest: &Path) -> Result<()> {
        *self.last_dest.borrow_mut() = Some(dest.to_path_buf());
        let wanted: HashSet<&String> = entries.iter().collect();
        for (name, content) in &self.entries {
            if !wanted.contains(name) {
                continue;
            }
            let path = dest.join(entry_relative_path(name));
            fs::create_dir_all(path.parent().unwrap())?;
            fs::write(&path, content)?;
            self.extracted.borrow_mut().push(name.clone());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeProvider
// ---------------------------------------------------------------------------

/// Serves a [`MemoryArchive`] per date.
///
/// Dates without an archive fail to download like a 404 would. Dates in
/// `corrupt` download fine but fail to open.
#[derive(Default)]
pub struct FakeProvider {
    pub archives: BTreeMap<NaiveDate, MemoryArchive>,
    pub corrupt: HashSet<NaiveDate>,
    pub downloads: RefCell<Vec<NaiveDate>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_archive(mut self, date: NaiveDate, archive: MemoryArchive) -> Self {
        self.archives.insert(date, archive);
        self
    }

    pub fn with_corrupt(mut self, date: NaiveDate) -> Self {
        self.corrupt.insert(date);
        self
    }

    fn date_of(path: &Path) -> NaiveDate {
        let name = path.file_name().unwrap().to_str().unwrap();
        let date = name
            .trim_start_matches("prices-")
            .trim_end_matches(".ppmd.7z");
        NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()
    }
}

impl ArchiveProvider for FakeProvider {
    fn download(&self, date: NaiveDate, dest: &Path) -> Result<u64> {
        self.downloads.borrow_mut().push(date);
        if !self.archives.contains_key(&date) && !self.corrupt.contains(&date) {
            return Err(TrackerError::EmptyPayload(format!("404 for {}", date)));
        }
        fs::write(dest, b"7z-placeholder")?;
        Ok(14)
    }

    fn open(&self, path: &Path) -> Result<Box<dyn PriceArchive>> {
        let date = Self::date_of(path);
        if self.corrupt.contains(&date) {
            return Err(TrackerError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "not a 7z archive",
            )));
        }
        Ok(Box::new(self.archives[&date].clone()))
    }
}

/// A `prices` document with one item per `(productId, subTypeName, marketPrice)`.
pub fn prices_doc(items: &[(u64, &str, f64)]) -> serde_json::Value {
    let results: Vec<serde_json::Value> = items
        .iter()
        .map(|(id, sub, market)| {
            serde_json::json!({
                "productId": id,
                "subTypeName": sub,
                "lowPrice": null,
                "marketPrice": market,
            })
        })
        .collect();
    serde_json::json!({ "success": true, "errors": [], "results": results })
}

/// Names of files directly inside `dir` (empty if it does not exist).
pub fn file_names(dir: &Path) -> Vec<String> {
    match fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// One-shot HTTP responder
// ---------------------------------------------------------------------------

/// Serve a single raw HTTP response on a local port.
///
/// Returns the base URL and the server thread handle.
pub fn serve_once(status_line: &str, body: &'static [u8]) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let status_line = status_line.to_string();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0u8; 4096];
        let mut request = Vec::new();
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let header = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status_line,
            body.len()
        );
        stream.write_all(header.as_bytes()).unwrap();
        stream.write_all(body).unwrap();
        stream.flush().unwrap();
    });

    (format!("http://{}", addr), handle)
}
