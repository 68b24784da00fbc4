use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use clap::Args;
use quizwatch_core::countdown::PollOutcome;
use quizwatch_core::{
    Clock, Config, CountdownMachine, CountdownScheduler, Event, EventFetcher, EventSelector,
    HttpEventFetcher, Phase, StaticEventFetcher, SubscriptionId, SystemClock,
};
use tokio::sync::mpsc;

use super::{resolve_now, resolve_subscriptions, runtime, CliResult};

#[derive(Args)]
pub struct WatchArgs {
    /// Read candidates from this JSON file instead of the course backend
    #[arg(long)]
    events: Option<PathBuf>,
    /// Subscription id; repeatable. Defaults to the configured subscriptions
    #[arg(long = "subscription")]
    subscriptions: Vec<String>,
    /// Pretend the wall clock started at this instant
    #[arg(long)]
    now: Option<String>,
    /// Poll once, print the resulting events and snapshot, and exit
    #[arg(long)]
    once: bool,
    /// Open the quiz link in the browser as soon as the quiz is active
    #[arg(long)]
    open_when_active: bool,
    /// Stop after this many seconds
    #[arg(long)]
    duration: Option<u64>,
}

/// The system clock moved by a fixed amount, reported in the start
/// instant's offset.
struct ShiftedClock {
    shift: chrono::Duration,
    offset: FixedOffset,
}

impl ShiftedClock {
    fn starting_at(start: DateTime<FixedOffset>) -> Self {
        Self {
            shift: start - SystemClock.now(),
            offset: *start.offset(),
        }
    }
}

impl Clock for ShiftedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        (SystemClock.now() + self.shift).with_timezone(&self.offset)
    }
}

pub fn run(args: WatchArgs) -> CliResult {
    let config = Config::load()?;
    let settings = config.scheduler_settings()?;

    let mut subscriptions = resolve_subscriptions(&args.subscriptions, &config);
    let fetcher: Arc<dyn EventFetcher> = match &args.events {
        Some(path) => {
            let fetcher = StaticEventFetcher::from_json_file(path)?;
            if subscriptions.is_empty() {
                subscriptions = fetcher.subscriptions();
            }
            Arc::new(fetcher)
        }
        None => Arc::new(HttpEventFetcher::new(
            config.base_url()?,
            config.token(),
            config.timeout(),
        )?),
    };

    let clock: Arc<dyn Clock> = match args.now.as_deref() {
        Some(raw) => Arc::new(ShiftedClock::starting_at(resolve_now(Some(raw))?)),
        None => Arc::new(SystemClock),
    };

    let rt = runtime()?;
    if args.once {
        return rt.block_on(poll_once(clock, subscriptions, fetcher, settings));
    }

    rt.block_on(async move {
        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let observer = move |event: &Event| {
            let _ = tx.send(event.clone());
        };
        let opener = Arc::new(quizwatch_core::BrowserOpener);
        let mut scheduler = CountdownScheduler::with_settings(
            clock,
            Arc::new(subscriptions),
            fetcher,
            Arc::new(observer),
            opener,
            settings,
        );
        scheduler.activate()?;

        let deadline = async {
            match args.duration {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        let mut opened = false;
        loop {
            tokio::select! {
                Some(event) = rx.recv() => {
                    println!("{}", serde_json::to_string(&event)?);
                    if args.open_when_active && !opened && is_active(&event) {
                        opened = true;
                        if let Err(e) = scheduler.open_quiz() {
                            tracing::warn!(error = %e, "could not open quiz link");
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => break,
                _ = &mut deadline => break,
            }
        }

        scheduler.deactivate();
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

fn is_active(event: &Event) -> bool {
    matches!(
        event,
        Event::StateChanged {
            phase: Some(Phase::Active),
            ..
        }
    )
}

async fn poll_once(
    clock: Arc<dyn Clock>,
    subscriptions: Vec<SubscriptionId>,
    fetcher: Arc<dyn EventFetcher>,
    settings: quizwatch_core::SchedulerSettings,
) -> CliResult {
    let now = clock.now();
    let today = now.date_naive();
    let outcome = if settings.gate.should_activate(&subscriptions, today) {
        let selection = EventSelector::new(fetcher)
            .select_for_day(&subscriptions, today, now.offset())
            .await;
        PollOutcome::Open(selection)
    } else {
        PollOutcome::GateClosed
    };

    let mut machine = CountdownMachine::new(settings.window);
    for event in machine.apply_poll(outcome, now) {
        println!("{}", serde_json::to_string(&event)?);
    }
    println!("{}", serde_json::to_string(&machine.snapshot())?);
    Ok(())
}
