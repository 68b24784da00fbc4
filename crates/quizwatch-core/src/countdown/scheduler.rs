//! Countdown scheduler.
//!
//! Runs a [`CountdownMachine`] inside a single owning tokio task, so the
//! selected event has exactly one writer. Two cadences drive it:
//!
//! - the **slow poll** (default hourly) re-checks the activation gate and,
//!   when open, re-fetches and re-selects today's event. Remote edits are
//!   therefore picked up at most one poll interval late;
//! - the **fast tick** (default every second) recomputes the phase while an
//!   event is counting down.
//!
//! `activate` / `deactivate` bound a session. A scheduler owns at most one
//! session task (and through it one fast and one slow timer). Stopping is
//! idempotent, and once `deactivate` returns the stopped session can no
//! longer reach the observer, even if its task has not yet been torn down.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::gate::GatePolicy;
use super::machine::{CountdownMachine, CountdownSnapshot, PollOutcome};
use super::phase::{compute_phase, Phase, QuizWindow};
use super::selector::EventSelector;
use crate::clock::Clock;
use crate::error::ActionError;
use crate::event::{LIVE_SESSION_LINK, QUIZ_LINK};
use crate::events::Event;
use crate::fetch::{EventFetcher, SubscriptionSource};
use crate::links::{BrowserOpener, LinkOpener};

/// Phase recompute cadence.
pub const FAST_TICK: Duration = Duration::from_secs(1);
/// Gate re-check and refetch cadence; also the staleness bound for edits.
pub const SLOW_POLL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cadence {
    pub fast_tick: Duration,
    pub slow_poll: Duration,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            fast_tick: FAST_TICK,
            slow_poll: SLOW_POLL,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub gate: GatePolicy,
    pub window: QuizWindow,
    pub cadence: Cadence,
}

/// Receives every [`Event`] of a live session.
///
/// Called from the scheduler's task while delivery is serialized against
/// `deactivate`; implementations must not call back into the scheduler.
pub trait StateObserver: Send + Sync {
    fn on_event(&self, event: &Event);
}

impl<F> StateObserver for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn on_event(&self, event: &Event) {
        self(event)
    }
}

struct Shared {
    clock: Arc<dyn Clock>,
    subscriptions: Arc<dyn SubscriptionSource>,
    selector: EventSelector,
    observer: Arc<dyn StateObserver>,
    opener: Arc<dyn LinkOpener>,
    settings: SchedulerSettings,
    /// Generation allowed to deliver; zero when stopped.
    live: Mutex<u64>,
    snapshot: watch::Sender<CountdownSnapshot>,
}

impl Shared {
    /// Deliver `events` on behalf of `generation`. Returns false once that
    /// generation has been stopped, telling the session to exit.
    fn deliver(&self, generation: u64, snapshot: CountdownSnapshot, events: Vec<Event>) -> bool {
        let live = self.live.lock().unwrap_or_else(|e| e.into_inner());
        if *live != generation {
            return false;
        }
        self.snapshot.send_replace(snapshot);
        for event in &events {
            self.observer.on_event(event);
        }
        true
    }

    async fn poll(&self) -> PollOutcome {
        let now = self.clock.now();
        let today = now.date_naive();
        let subscriptions = self.subscriptions.subscriptions();
        if !self.settings.gate.should_activate(&subscriptions, today) {
            tracing::debug!(%today, subscriptions = subscriptions.len(), "activation gate closed");
            return PollOutcome::GateClosed;
        }
        let selection = self
            .selector
            .select_for_day(&subscriptions, today, now.offset())
            .await;
        PollOutcome::Open(selection)
    }
}

/// Aborts the in-flight poll when the session is dropped or aborted.
struct PollTask(JoinHandle<()>);

impl Drop for PollTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

struct Session {
    generation: u64,
    task: JoinHandle<()>,
}

pub struct CountdownScheduler {
    shared: Arc<Shared>,
    session: Option<Session>,
    generations: u64,
}

impl CountdownScheduler {
    pub fn new(
        clock: Arc<dyn Clock>,
        subscriptions: Arc<dyn SubscriptionSource>,
        fetcher: Arc<dyn EventFetcher>,
        observer: Arc<dyn StateObserver>,
    ) -> Self {
        Self::with_settings(
            clock,
            subscriptions,
            fetcher,
            observer,
            Arc::new(BrowserOpener),
            SchedulerSettings::default(),
        )
    }

    pub fn with_settings(
        clock: Arc<dyn Clock>,
        subscriptions: Arc<dyn SubscriptionSource>,
        fetcher: Arc<dyn EventFetcher>,
        observer: Arc<dyn StateObserver>,
        opener: Arc<dyn LinkOpener>,
        settings: SchedulerSettings,
    ) -> Self {
        let (snapshot, _) = watch::channel(CountdownSnapshot::idle());
        Self {
            shared: Arc::new(Shared {
                clock,
                subscriptions,
                selector: EventSelector::new(fetcher),
                observer,
                opener,
                settings,
                live: Mutex::new(0),
                snapshot,
            }),
            session: None,
            generations: 0,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start a session, replacing any running one.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::NoRuntime`] when called outside a tokio
    /// runtime. Any running session is left untouched in that case.
    pub fn activate(&mut self) -> Result<(), ActionError> {
        let handle = Handle::try_current().map_err(|_| ActionError::NoRuntime)?;
        self.deactivate();

        self.generations += 1;
        let generation = self.generations;
        *self.shared.live.lock().unwrap_or_else(|e| e.into_inner()) = generation;

        let shared = Arc::clone(&self.shared);
        let task = handle.spawn(run_session(shared, generation));
        tracing::info!(generation, "countdown scheduler activated");
        self.session = Some(Session { generation, task });
        Ok(())
    }

    /// Stop the running session, if any. Safe to call repeatedly.
    pub fn deactivate(&mut self) {
        *self.shared.live.lock().unwrap_or_else(|e| e.into_inner()) = 0;
        if let Some(session) = self.session.take() {
            session.task.abort();
            tracing::info!(generation = session.generation, "countdown scheduler deactivated");
        }
        self.shared.snapshot.send_replace(CountdownSnapshot::idle());
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn snapshot(&self) -> CountdownSnapshot {
        self.shared.snapshot.borrow().clone()
    }

    /// Latest snapshot as a watch channel, for consumers that prefer
    /// polling over the observer callback.
    pub fn subscribe(&self) -> watch::Receiver<CountdownSnapshot> {
        self.shared.snapshot.subscribe()
    }

    // ── Actions ──────────────────────────────────────────────────────

    /// Open `url` on behalf of the selected event. Rejected unless the
    /// event is Active right now.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::NoEventSelected`] or [`ActionError::NotActive`]
    /// when the request is refused, or the opener's error.
    pub fn open_link(&self, url: &str) -> Result<(), ActionError> {
        self.ensure_active(url)?;
        self.shared.opener.open(url)
    }

    /// Open the selected event's quiz link while the quiz is Active.
    ///
    /// # Errors
    ///
    /// As [`Self::open_link`], plus [`ActionError::MissingLink`].
    pub fn open_quiz(&self) -> Result<(), ActionError> {
        self.ensure_active(QUIZ_LINK)?;
        let url = self.selected_link(QUIZ_LINK)?;
        self.shared.opener.open(&url)
    }

    /// Open the post-quiz live session link. Only allowed once Closed.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::NotClosed`] before the window has closed,
    /// [`ActionError::MissingLink`] if the event has no such link, or the
    /// opener's error.
    pub fn open_live_session(&self) -> Result<(), ActionError> {
        let phase = self.current_phase()?;
        if phase != Phase::Closed {
            tracing::warn!(%phase, "rejected live session request before the quiz closed");
            return Err(ActionError::NotClosed { phase });
        }
        let url = self.selected_link(LIVE_SESSION_LINK)?;
        self.shared.opener.open(&url)
    }

    /// Phase of the selected event at this instant rather than at the last
    /// tick, so a request landing just after a boundary is judged correctly.
    fn current_phase(&self) -> Result<Phase, ActionError> {
        let snapshot = self.snapshot();
        let event = snapshot.event.ok_or(ActionError::NoEventSelected)?;
        let reading = compute_phase(&event, self.shared.clock.now(), &self.shared.settings.window);
        Ok(reading.phase)
    }

    fn ensure_active(&self, target: &str) -> Result<(), ActionError> {
        let phase = self.current_phase()?;
        if phase != Phase::Active {
            tracing::warn!(%phase, target, "rejected open request outside the quiz window");
            return Err(ActionError::NotActive { phase });
        }
        Ok(())
    }

    fn selected_link(&self, key: &str) -> Result<String, ActionError> {
        let snapshot = self.snapshot();
        let event = snapshot.event.ok_or(ActionError::NoEventSelected)?;
        event
            .event
            .link(key)
            .map(str::to_string)
            .ok_or_else(|| ActionError::MissingLink(key.to_string()))
    }
}

impl Drop for CountdownScheduler {
    fn drop(&mut self) {
        self.deactivate();
    }
}

async fn run_session(shared: Arc<Shared>, generation: u64) {
    let cadence = shared.settings.cadence;
    let mut machine = CountdownMachine::new(shared.settings.window);

    let mut slow = tokio::time::interval(cadence.slow_poll);
    slow.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut fast = tokio::time::interval(cadence.fast_tick);
    fast.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let (outcomes_tx, mut outcomes) = mpsc::channel::<PollOutcome>(1);
    let mut in_flight: Option<PollTask> = None;

    loop {
        tokio::select! {
            _ = slow.tick() => {
                if in_flight.is_some() {
                    tracing::debug!(generation, "previous poll still running, skipping");
                    continue;
                }
                let shared = Arc::clone(&shared);
                let tx = outcomes_tx.clone();
                in_flight = Some(PollTask(tokio::spawn(async move {
                    let outcome = shared.poll().await;
                    let _ = tx.send(outcome).await;
                })));
            }
            Some(outcome) = outcomes.recv() => {
                in_flight = None;
                let events = machine.apply_poll(outcome, shared.clock.now());
                if machine.wants_fast_tick() {
                    fast.reset();
                }
                if !shared.deliver(generation, machine.snapshot(), events) {
                    break;
                }
            }
            _ = fast.tick(), if machine.wants_fast_tick() => {
                if let Some(event) = machine.tick(shared.clock.now()) {
                    if !shared.deliver(generation, machine.snapshot(), vec![event]) {
                        break;
                    }
                }
            }
        }
    }

    tracing::debug!(generation, "countdown session exited");
}
