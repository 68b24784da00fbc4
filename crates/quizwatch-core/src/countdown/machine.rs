//! Countdown state machine.
//!
//! A wall-clock-based state machine with no timers of its own. The owner
//! feeds it poll outcomes (slow cadence) and calls `tick()` (fast cadence);
//! it answers with the events that should reach the consumer.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Watching -> Counting -> Done -> Idle
//!            ^           |
//!            +-----------+   (selected event disappeared)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut machine = CountdownMachine::new(QuizWindow::default());
//! machine.apply_poll(PollOutcome::Open(selection), clock.now());
//! // Every second while `wants_fast_tick()`:
//! machine.tick(clock.now());
//! ```

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::phase::{compute_phase, format_remaining, Phase, PhaseReading, QuizWindow};
use super::selector::Selection;
use crate::event::SelectedEvent;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    /// Gate closed or no subscriptions. No fast tick.
    Idle,
    /// Gate open, nothing selected yet; the slow poll keeps looking.
    Watching,
    /// Event selected and not yet closed; fast tick running.
    Counting,
    /// Selected event closed. Remaining is permanently zero.
    Done,
}

/// What one slow poll concluded.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Not a qualifying day, or no subscriptions.
    GateClosed,
    /// Gate open; result of fetching and selecting.
    Open(Selection),
}

/// Everything the consumer can observe at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountdownSnapshot {
    pub state: SchedulerState,
    pub phase: Option<Phase>,
    pub remaining_secs: u64,
    pub event: Option<SelectedEvent>,
}

impl CountdownSnapshot {
    pub fn idle() -> Self {
        Self {
            state: SchedulerState::Idle,
            phase: None,
            remaining_secs: 0,
            event: None,
        }
    }

    /// `HH:MM:SS` countdown for display.
    pub fn remaining_display(&self) -> String {
        format_remaining(std::time::Duration::from_secs(self.remaining_secs))
    }

    fn into_event(self, at: DateTime<FixedOffset>) -> Event {
        Event::StateChanged {
            state: self.state,
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            event: self.event,
            at,
        }
    }
}

/// Observable tuple used to suppress duplicate notifications. The whole
/// event is compared so payload edits are re-announced.
type EmitKey = (SchedulerState, Option<Phase>, u64, Option<SelectedEvent>);

#[derive(Debug, Clone)]
pub struct CountdownMachine {
    window: QuizWindow,
    state: SchedulerState,
    selected: Option<SelectedEvent>,
    reading: Option<PhaseReading>,
    last_emitted: Option<EmitKey>,
}

impl CountdownMachine {
    pub fn new(window: QuizWindow) -> Self {
        Self {
            window,
            state: SchedulerState::Idle,
            selected: None,
            reading: None,
            last_emitted: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn selected(&self) -> Option<&SelectedEvent> {
        self.selected.as_ref()
    }

    /// Only Counting needs the one-second cadence.
    pub fn wants_fast_tick(&self) -> bool {
        self.state == SchedulerState::Counting
    }

    pub fn snapshot(&self) -> CountdownSnapshot {
        CountdownSnapshot {
            state: self.state,
            phase: self.reading.map(|r| r.phase),
            remaining_secs: self.reading.map(|r| r.remaining_secs()).unwrap_or(0),
            event: self.selected.clone(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Apply the result of a slow poll.
    pub fn apply_poll(&mut self, outcome: PollOutcome, now: DateTime<FixedOffset>) -> Vec<Event> {
        let mut events = Vec::new();
        match outcome {
            PollOutcome::GateClosed => {
                self.clear_selection(now, &mut events);
                self.reading = None;
                self.state = SchedulerState::Idle;
            }
            PollOutcome::Open(selection) => {
                for failure in selection.failures {
                    events.push(Event::FetchFailed {
                        subscription_id: failure.subscription_id,
                        message: failure.message,
                        at: now,
                    });
                }
                match selection.selected {
                    None => {
                        self.clear_selection(now, &mut events);
                        self.reading = None;
                        self.state = SchedulerState::Watching;
                    }
                    Some(next) => {
                        if self.selected.as_ref() != Some(&next) {
                            tracing::info!(
                                event_id = %next.id(),
                                subscription = %next.subscription_id(),
                                scheduled_at = %next.scheduled_at,
                                "selected today's event"
                            );
                            events.push(Event::EventSelected {
                                event_id: next.id().to_string(),
                                subscription_id: next.subscription_id().clone(),
                                scheduled_at: next.scheduled_at,
                                at: now,
                            });
                            self.selected = Some(next);
                        }
                        self.recompute(now);
                    }
                }
            }
        }
        events.extend(self.emit_if_changed(now));
        events
    }

    /// Fast tick. Returns a state change only when the observable tuple moved.
    pub fn tick(&mut self, now: DateTime<FixedOffset>) -> Option<Event> {
        if self.state != SchedulerState::Counting {
            return None;
        }
        self.recompute(now);
        self.emit_if_changed(now)
    }

    /// Phase of the selected event at `now`, without mutating the machine.
    pub fn reading_at(&self, now: DateTime<FixedOffset>) -> Option<PhaseReading> {
        self.selected
            .as_ref()
            .map(|event| compute_phase(event, now, &self.window))
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn recompute(&mut self, now: DateTime<FixedOffset>) {
        let Some(reading) = self.reading_at(now) else {
            return;
        };
        let next = if reading.phase == Phase::Closed {
            SchedulerState::Done
        } else {
            SchedulerState::Counting
        };
        if next != self.state {
            tracing::info!(
                from = ?self.state,
                to = ?next,
                phase = %reading.phase,
                "countdown state changed"
            );
        }
        self.state = next;
        self.reading = Some(reading);
    }

    fn clear_selection(&mut self, now: DateTime<FixedOffset>, events: &mut Vec<Event>) {
        if let Some(previous) = self.selected.take() {
            tracing::info!(event_id = %previous.id(), "selected event cleared");
            events.push(Event::EventCleared {
                event_id: previous.event.id,
                at: now,
            });
        }
    }

    fn emit_if_changed(&mut self, now: DateTime<FixedOffset>) -> Option<Event> {
        let snapshot = self.snapshot();
        let key = (
            snapshot.state,
            snapshot.phase,
            snapshot.remaining_secs,
            snapshot.event.clone(),
        );
        if self.last_emitted.as_ref() == Some(&key) {
            return None;
        }
        self.last_emitted = Some(key);
        Some(snapshot.into_event(now))
    }
}
