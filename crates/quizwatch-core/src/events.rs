use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::countdown::{Phase, SchedulerState};
use crate::event::{SelectedEvent, SubscriptionId};

/// Every observable change in the countdown produces an Event.
/// Consumers receive them through a [`crate::countdown::StateObserver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The observable (state, phase, remaining, event) tuple changed.
    StateChanged {
        state: SchedulerState,
        phase: Option<Phase>,
        remaining_secs: u64,
        event: Option<SelectedEvent>,
        at: DateTime<FixedOffset>,
    },
    /// A different event became today's event.
    EventSelected {
        event_id: String,
        subscription_id: SubscriptionId,
        scheduled_at: DateTime<FixedOffset>,
        at: DateTime<FixedOffset>,
    },
    /// The previously selected event is gone (refetch found nothing, or the
    /// gate closed).
    EventCleared {
        event_id: String,
        at: DateTime<FixedOffset>,
    },
    /// Non-blocking notice: one subscription's candidates were unavailable
    /// this cycle.
    FetchFailed {
        subscription_id: SubscriptionId,
        message: String,
        at: DateTime<FixedOffset>,
    },
}
