use chrono::NaiveDate;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] sevenz_rust2::Error),

    #[error("Empty payload: {0}")]
    EmptyPayload(String),

    #[error("Invalid product id: {0}")]
    InvalidProductId(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to process prices for {date}: {reason}")]
    DateFailed { date: NaiveDate, reason: String },
}

pub type Result<T> = std::result::Result<T, TrackerError>;
