use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::TrackerError;

pub const ARCHIVE_BASE: &str = "https://tcgcsv.com/archive/tcgplayer";

/// Terminal path segment of every price entry inside a daily archive.
pub const PRICES_ENTRY_NAME: &str = "prices";

pub const DEFAULT_SUB_TYPE: &str = "Normal";

pub const LONG_WINDOW_DAYS: i64 = 30;
pub const SHORT_WINDOW_DAYS: i64 = 7;

pub const DEFAULT_HISTORY_DAYS: u32 = 30;
pub const MAX_HISTORY_DAYS: u32 = 3650;
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// A TCGplayer category tracked by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub id: &'static str,
    pub name: &'static str,
}

/// Add or remove trading card categories here.
pub const TARGET_CATEGORIES: &[Category] = &[
    Category { id: "1", name: "Magic: The Gathering" },
    Category { id: "2", name: "Yu-Gi-Oh!" },
    Category { id: "3", name: "Pokemon" },
    Category { id: "68", name: "One Piece" },
];

pub fn category_name(id: &str) -> Option<&'static str> {
    TARGET_CATEGORIES
        .iter()
        .find(|c| c.id == id)
        .map(|c| c.name)
}

// ---------------------------------------------------------------------------
// Price fields
// ---------------------------------------------------------------------------

/// Price columns carried through from the archive into the aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceField {
    Low,
    Mid,
    High,
    Market,
    DirectLow,
}

impl PriceField {
    pub const ALL: [PriceField; 5] = [
        PriceField::Low,
        PriceField::Mid,
        PriceField::High,
        PriceField::Market,
        PriceField::DirectLow,
    ];

    /// JSON key of this field in both the archive and the persisted documents.
    pub fn key(self) -> &'static str {
        match self {
            PriceField::Low => "lowPrice",
            PriceField::Mid => "midPrice",
            PriceField::High => "highPrice",
            PriceField::Market => "marketPrice",
            PriceField::DirectLow => "directLowPrice",
        }
    }
}

// ---------------------------------------------------------------------------
// Policy / mode
// ---------------------------------------------------------------------------

/// Which on-disk document shape a deployment produces.
///
/// The two shapes are not compatible with each other, so a data directory must
/// only ever be written with one policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregationPolicy {
    /// `avg30` / `avg7` trailing-window averages, one file per product.
    Rolling,
    /// `day7` / `day30` fixed snapshots, one file per product variant.
    #[default]
    Snapshot,
}

impl FromStr for AggregationPolicy {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rolling" => Ok(Self::Rolling),
            "snapshot" => Ok(Self::Snapshot),
            other => Err(TrackerError::InvalidArgument(format!(
                "unknown aggregation policy '{}' (expected 'snapshot' or 'rolling')",
                other
            ))),
        }
    }
}

impl fmt::Display for AggregationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rolling => f.write_str("rolling"),
            Self::Snapshot => f.write_str("snapshot"),
        }
    }
}

/// How the tracker chooses between a history build and a daily update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeSelection {
    /// Bootstrap when the store holds no documents, incremental otherwise.
    #[default]
    Auto,
    Bootstrap,
    Incremental,
}

impl FromStr for ModeSelection {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "bootstrap" => Ok(Self::Bootstrap),
            "incremental" => Ok(Self::Incremental),
            other => Err(TrackerError::InvalidArgument(format!(
                "unknown run mode '{}' (expected 'auto', 'bootstrap' or 'incremental')",
                other
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

pub fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Where archives are downloaded and unpacked before aggregation.
pub fn default_work_dir() -> PathBuf {
    if let Some(cache) = dirs::cache_dir() {
        cache.join("tcg-price-history")
    } else {
        PathBuf::from(".tcg-price-history-cache")
    }
}
