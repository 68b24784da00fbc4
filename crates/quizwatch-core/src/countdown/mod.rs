mod gate;
mod machine;
mod phase;
mod scheduler;
mod selector;

pub use gate::{is_last_day_of_month, should_activate, GatePolicy, DEFAULT_EXCLUDED_MONTH};
pub use machine::{CountdownMachine, CountdownSnapshot, PollOutcome, SchedulerState};
pub use phase::{
    compute_phase, format_remaining, Phase, PhaseReading, QuizWindow, DEFAULT_CLOSE_HOUR,
    DEFAULT_OPEN_HOUR,
};
pub use scheduler::{
    Cadence, CountdownScheduler, SchedulerSettings, StateObserver, FAST_TICK, SLOW_POLL,
};
pub use selector::{select, EventSelector, FetchFailure, Selection};
