//! Phase computation.
//!
//! A pure function of the selected event and the current instant. The quiz
//! opens at a fixed local time on the scheduled day and closes at another;
//! the window is policy, not event data.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::event::SelectedEvent;

pub const DEFAULT_OPEN_HOUR: u32 = 22;
pub const DEFAULT_CLOSE_HOUR: u32 = 23;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Pending,
    Active,
    Closed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Pending => "pending",
            Phase::Active => "active",
            Phase::Closed => "closed",
        })
    }
}

/// Daily activity window, in local wall-clock time on the scheduled day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizWindow {
    pub open_at: NaiveTime,
    pub close_at: NaiveTime,
}

impl Default for QuizWindow {
    fn default() -> Self {
        Self {
            open_at: hour(DEFAULT_OPEN_HOUR),
            close_at: hour(DEFAULT_CLOSE_HOUR),
        }
    }
}

fn hour(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap_or(NaiveTime::MIN)
}

impl QuizWindow {
    /// # Errors
    ///
    /// Returns an error unless `open_at` is strictly before `close_at`.
    pub fn new(open_at: NaiveTime, close_at: NaiveTime) -> Result<Self, ConfigError> {
        if open_at >= close_at {
            return Err(ConfigError::InvalidValue {
                key: "policy.close_at".into(),
                message: format!("close time {close_at} must be after open time {open_at}"),
            });
        }
        Ok(Self { open_at, close_at })
    }

    pub fn opens(&self, scheduled: &DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        anchor(scheduled, self.open_at)
    }

    pub fn closes(&self, scheduled: &DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        anchor(scheduled, self.close_at)
    }

    pub fn length(&self) -> Duration {
        (self.close_at - self.open_at).to_std().unwrap_or_default()
    }
}

/// `at` on the calendar day of `scheduled`, in the same offset.
fn anchor(scheduled: &DateTime<FixedOffset>, at: NaiveTime) -> DateTime<FixedOffset> {
    let local = scheduled.date_naive().and_time(at);
    // A fixed offset maps every representable local time to exactly one instant.
    scheduled
        .offset()
        .from_local_datetime(&local)
        .single()
        .unwrap_or(*scheduled)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseReading {
    pub phase: Phase,
    /// Time until the next transition; zero once closed.
    pub remaining: Duration,
}

impl PhaseReading {
    /// Remaining time rounded up to whole seconds, so a pending or active
    /// reading never displays as zero.
    pub fn remaining_secs(&self) -> u64 {
        let secs = self.remaining.as_secs();
        if self.remaining.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

/// Phase of `event` at `now` and the time left until the next transition.
///
/// Open boundary is inclusive (`now == open` is Active), close boundary is
/// inclusive on the closed side (`now == close` is Closed).
pub fn compute_phase(
    event: &SelectedEvent,
    now: DateTime<FixedOffset>,
    window: &QuizWindow,
) -> PhaseReading {
    let open = window.opens(&event.scheduled_at);
    let close = window.closes(&event.scheduled_at);

    if now < open {
        PhaseReading {
            phase: Phase::Pending,
            remaining: until(now, open),
        }
    } else if now < close {
        PhaseReading {
            phase: Phase::Active,
            remaining: until(now, close),
        }
    } else {
        PhaseReading {
            phase: Phase::Closed,
            remaining: Duration::ZERO,
        }
    }
}

fn until(now: DateTime<FixedOffset>, then: DateTime<FixedOffset>) -> Duration {
    (then - now).to_std().unwrap_or_default()
}

/// `HH:MM:SS`; hours are not wrapped at 24.
pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
