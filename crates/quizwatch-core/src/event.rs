//! Subscriptions and the candidate events scheduled against them.
//!
//! Candidate events are created elsewhere and fetched read-only. Their
//! `scheduled_at` is kept exactly as received and parsed on demand, so an
//! unparseable timestamp excludes that one event instead of failing a whole
//! fetch.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Payload key holding the quiz link.
pub const QUIZ_LINK: &str = "quizLink";
/// Payload key holding the post-quiz live session link.
pub const LIVE_SESSION_LINK: &str = "liveSessionLink";

/// Opaque event data (instructions, rewards, links). Never interpreted by
/// the scheduler.
pub type Payload = serde_json::Map<String, serde_json::Value>;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Identifier of one of the caller's subscriptions (enrolled courses).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub String);

impl SubscriptionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubscriptionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SubscriptionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One schedulable occurrence belonging to a subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEvent {
    pub id: String,
    pub subscription_id: SubscriptionId,
    /// Timestamp as received from the remote store.
    pub scheduled_at: String,
    #[serde(default)]
    pub payload: Payload,
}

impl CandidateEvent {
    pub fn new(
        id: impl Into<String>,
        subscription_id: impl Into<SubscriptionId>,
        scheduled_at: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            subscription_id: subscription_id.into(),
            scheduled_at: scheduled_at.into(),
            payload: Payload::new(),
        }
    }

    pub fn with_payload(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }

    /// Parsed schedule expressed at `offset`, or `None` if unparseable.
    pub fn scheduled_in(&self, offset: &FixedOffset) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(&self.scheduled_at, offset)
    }

    /// A non-empty string payload value.
    pub fn link(&self, key: &str) -> Option<&str> {
        self.payload
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// The candidate chosen as today's event, with its schedule already parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedEvent {
    pub event: CandidateEvent,
    pub scheduled_at: DateTime<FixedOffset>,
}

impl SelectedEvent {
    pub fn id(&self) -> &str {
        &self.event.id
    }

    pub fn subscription_id(&self) -> &SubscriptionId {
        &self.event.subscription_id
    }
}

/// Parse a remote timestamp.
///
/// RFC 3339 values keep their instant and are re-expressed at `offset`.
/// Values without an offset (`2024-05-31T00:00:00`, `2024-05-31`) are read
/// as local wall-clock time at `offset`.
pub fn parse_timestamp(raw: &str, offset: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(offset));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return offset.from_local_datetime(&naive).single();
        }
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    offset.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).single()
}
