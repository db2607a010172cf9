use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tcg_price_history::{AggregationPolicy, ModeSelection, Result, TrackerBuilder, TrackerError};

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tcg_price_history=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let result = builder_from_env()
        .and_then(TrackerBuilder::build)
        .and_then(|tracker| tracker.run());

    match result {
        Ok(report) => {
            tracing::info!("Done: {}", report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Build a tracker configuration from `TCG_*` environment variables.
fn builder_from_env() -> Result<TrackerBuilder> {
    let mut builder = TrackerBuilder::default();

    if let Some(dir) = var("TCG_DATA_DIR") {
        builder = builder.data_dir(dir);
    }
    if let Some(dir) = var("TCG_WORK_DIR") {
        builder = builder.work_dir(dir);
    }
    if let Some(policy) = var("TCG_POLICY") {
        builder = builder.policy(AggregationPolicy::from_str(&policy)?);
    }
    if let Some(mode) = var("TCG_MODE") {
        builder = builder.mode(ModeSelection::from_str(&mode)?);
    }
    if let Some(days) = var("TCG_HISTORY_DAYS") {
        builder = builder.history_days(parse("TCG_HISTORY_DAYS", &days)?);
    }
    if let Some(secs) = var("TCG_TIMEOUT_SECS") {
        builder = builder.timeout(Duration::from_secs(parse("TCG_TIMEOUT_SECS", &secs)?));
    }
    if let Some(base) = var("TCG_ARCHIVE_BASE") {
        builder = builder.archive_base(base);
    }
    if let Some(date) = var("TCG_AS_OF") {
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|e| {
            TrackerError::InvalidArgument(format!("TCG_AS_OF '{}': {}", date, e))
        })?;
        builder = builder.as_of(date);
    }

    Ok(builder)
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| TrackerError::InvalidArgument(format!("{} '{}': {}", name, value, e)))
}
