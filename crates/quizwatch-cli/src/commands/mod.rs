pub mod config;
pub mod gate;
pub mod phase;
pub mod select;
pub mod watch;

use chrono::{DateTime, FixedOffset, NaiveDate};
use quizwatch_core::event::parse_timestamp;
use quizwatch_core::{Clock, Config, SubscriptionId, SystemClock};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// `--now` if given, otherwise the system clock. An explicit offset is
/// kept as given; values without one are read in the local timezone.
pub fn resolve_now(raw: Option<&str>) -> Result<DateTime<FixedOffset>, Box<dyn std::error::Error>> {
    let local = SystemClock.now();
    let Some(raw) = raw else {
        return Ok(local);
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw.trim()) {
        return Ok(dt);
    }
    parse_timestamp(raw, local.offset()).ok_or_else(|| format!("invalid timestamp: {raw}").into())
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    Ok(NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{raw}': {e}"))?)
}

pub fn parse_offset(raw: &str) -> Result<FixedOffset, Box<dyn std::error::Error>> {
    Ok(raw
        .parse::<FixedOffset>()
        .map_err(|e| format!("invalid UTC offset '{raw}': {e}"))?)
}

/// Subscriptions from the command line, falling back to the config file.
pub fn resolve_subscriptions(cli: &[String], config: &Config) -> Vec<SubscriptionId> {
    if cli.is_empty() {
        config.subscription_ids()
    } else {
        cli.iter().map(|s| SubscriptionId::from(s.as_str())).collect()
    }
}

pub fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
}
