//! # Quizwatch Core Library
//!
//! Time-gated scheduling for the monthly quiz: decides, from wall-clock time
//! and the events scheduled for a caller's subscriptions, whether the quiz is
//! relevant today, which event it is, which phase it is in, and how long
//! until the next transition.
//!
//! ## Architecture
//!
//! - **Activation gate**: only the last day of a month (one month excluded),
//!   only for callers with at least one subscription
//! - **Event selection**: latest same-day event across all subscriptions,
//!   fetched concurrently; one failing subscription never blocks the rest
//! - **Phase computation**: pure `(event, now) -> (phase, remaining)` over a
//!   fixed daily window (22:00-23:00 local by default)
//! - **Countdown scheduler**: a single-owner tokio task ticking every second
//!   and re-polling hourly, with explicit activate/deactivate
//!
//! ## Key Components
//!
//! - [`CountdownScheduler`]: runtime driver and consumer-facing handle
//! - [`CountdownMachine`]: the synchronous Idle/Watching/Counting/Done machine
//! - [`Config`]: TOML configuration
//! - [`EventFetcher`]: trait for candidate event sources

pub mod clock;
pub mod countdown;
pub mod error;
pub mod event;
pub mod events;
pub mod fetch;
pub mod links;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use countdown::{
    compute_phase, format_remaining, select, should_activate, Cadence, CountdownMachine,
    CountdownScheduler, CountdownSnapshot, EventSelector, GatePolicy, Phase, PhaseReading,
    QuizWindow, SchedulerSettings, SchedulerState, Selection, StateObserver,
};
pub use error::{ActionError, ConfigError, CoreError, FetchError};
pub use event::{CandidateEvent, SelectedEvent, SubscriptionId};
pub use events::Event;
pub use fetch::{EventFetcher, HttpEventFetcher, StaticEventFetcher, SubscriptionSource};
pub use links::{BrowserOpener, LinkOpener, RecordingOpener};
pub use storage::Config;
