//! Activation gate.
//!
//! The countdown only runs on a qualifying day (the last calendar day of a
//! month, except for one permanently excluded month) and only for callers
//! holding at least one subscription.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::event::SubscriptionId;

/// Month (1-based) that never activates, regardless of year. February.
///
/// Carried over unchanged from the existing product behaviour; the reason for
/// the exclusion is undocumented and awaits confirmation from product owners.
pub const DEFAULT_EXCLUDED_MONTH: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatePolicy {
    /// 1-based month excluded from activation. `None` disables the exclusion.
    pub excluded_month: Option<u32>,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            excluded_month: Some(DEFAULT_EXCLUDED_MONTH),
        }
    }
}

impl GatePolicy {
    /// Last day of its month and not in the excluded month.
    pub fn is_qualifying_day(&self, today: NaiveDate) -> bool {
        is_last_day_of_month(today) && self.excluded_month != Some(today.month())
    }

    pub fn should_activate(&self, subscriptions: &[SubscriptionId], today: NaiveDate) -> bool {
        !subscriptions.is_empty() && self.is_qualifying_day(today)
    }
}

pub fn is_last_day_of_month(date: NaiveDate) -> bool {
    date.succ_opt()
        .map_or(true, |next| next.month() != date.month())
}

/// Whether the countdown should run for these subscriptions on `today`.
pub fn should_activate(
    subscriptions: &[SubscriptionId],
    today: NaiveDate,
    policy: &GatePolicy,
) -> bool {
    policy.should_activate(subscriptions, today)
}
