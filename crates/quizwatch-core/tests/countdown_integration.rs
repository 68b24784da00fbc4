//! Integration tests for the countdown scheduler against a course backend.
//!
//! Tests the full workflow from configuration through fetching, selection,
//! phase transitions, and phase-gated link opening.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::DateTime;
use indoc::indoc;
use quizwatch_core::countdown::SchedulerState;
use quizwatch_core::{
    ActionError, Cadence, Config, CountdownScheduler, Event, HttpEventFetcher, ManualClock, Phase,
    RecordingOpener, SchedulerSettings, StateObserver, StaticEventFetcher, SubscriptionId,
};
use url::Url;

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl StateObserver for Recorder {
    fn on_event(&self, event: &Event) {
        self.events.lock().unwrap().push(event.clone());
    }
}

fn settings() -> SchedulerSettings {
    SchedulerSettings {
        cadence: Cadence {
            fast_tick: Duration::from_millis(20),
            slow_poll: Duration::from_secs(3600),
        },
        ..SchedulerSettings::default()
    }
}

fn http_fetcher(server: &mockito::ServerGuard) -> HttpEventFetcher {
    HttpEventFetcher::new(
        Url::parse(&server.url()).unwrap(),
        None,
        Duration::from_secs(5),
    )
    .unwrap()
}

async fn wait_for_state(scheduler: &CountdownScheduler, state: SchedulerState) {
    let mut rx = scheduler.subscribe();
    tokio::time::timeout(Duration::from_secs(5), async {
        while rx.borrow_and_update().state != state {
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("scheduler reached expected state");
}

#[tokio::test]
async fn test_full_quiz_night_over_http() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/quiz/course/course-1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"quizzes": [
                {"_id": "may-early", "schedule": "2024-05-31T09:00:00+00:00", "quizLink": "https://forms.example/early"},
                {"_id": "may", "schedule": "2024-05-31T18:00:00+00:00",
                 "quizLink": "https://forms.example/may", "liveSessionLink": "https://meet.example/may",
                 "instructions": "Answer all questions", "rewards": ["badge"]}
            ]}"#,
        )
        .create_async()
        .await;

    let clock = Arc::new(ManualClock::new(
        DateTime::parse_from_rfc3339("2024-05-31T22:15:00+00:00").unwrap(),
    ));
    let recorder = Arc::new(Recorder::default());
    let opener = Arc::new(RecordingOpener::new());
    let mut scheduler = CountdownScheduler::with_settings(
        clock.clone(),
        Arc::new(vec![SubscriptionId::from("course-1")]),
        Arc::new(http_fetcher(&server)),
        recorder.clone(),
        opener.clone(),
        settings(),
    );

    scheduler.activate().unwrap();
    wait_for_state(&scheduler, SchedulerState::Counting).await;

    let snapshot = scheduler.snapshot();
    assert_eq!(snapshot.phase, Some(Phase::Active));
    assert_eq!(snapshot.remaining_secs, 45 * 60);
    assert_eq!(snapshot.remaining_display(), "00:45:00");
    let selected = snapshot.event.unwrap();
    assert_eq!(selected.id(), "may");
    assert_eq!(
        selected.event.payload["instructions"],
        serde_json::json!("Answer all questions")
    );

    scheduler.open_quiz().unwrap();
    assert!(matches!(
        scheduler.open_live_session(),
        Err(ActionError::NotClosed {
            phase: Phase::Active
        })
    ));
    assert_eq!(opener.opened(), vec!["https://forms.example/may"]);

    clock.set(DateTime::parse_from_rfc3339("2024-05-31T23:00:01+00:00").unwrap());
    wait_for_state(&scheduler, SchedulerState::Done).await;
    assert_eq!(scheduler.snapshot().remaining_secs, 0);

    assert!(matches!(
        scheduler.open_quiz(),
        Err(ActionError::NotActive {
            phase: Phase::Closed
        })
    ));
    scheduler.open_live_session().unwrap();
    assert_eq!(
        opener.opened(),
        vec!["https://forms.example/may", "https://meet.example/may"]
    );

    scheduler.deactivate();
    assert_eq!(scheduler.snapshot().state, SchedulerState::Idle);
    assert!(recorder
        .events()
        .iter()
        .any(|e| matches!(e, Event::EventSelected { event_id, .. } if event_id == "may")));
}

#[tokio::test]
async fn test_failing_subscription_does_not_block_others() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/quiz/course/broken")
        .with_status(503)
        .create_async()
        .await;
    server
        .mock("GET", "/api/quiz/course/healthy")
        .with_status(200)
        .with_body(r#"{"quizzes": [{"_id": "q", "schedule": "2024-05-31T12:00:00+00:00"}]}"#)
        .create_async()
        .await;

    let clock = Arc::new(ManualClock::new(
        DateTime::parse_from_rfc3339("2024-05-31T21:00:00+00:00").unwrap(),
    ));
    let recorder = Arc::new(Recorder::default());
    let mut scheduler = CountdownScheduler::with_settings(
        clock,
        Arc::new(vec![
            SubscriptionId::from("broken"),
            SubscriptionId::from("healthy"),
        ]),
        Arc::new(http_fetcher(&server)),
        recorder.clone(),
        Arc::new(RecordingOpener::new()),
        settings(),
    );

    scheduler.activate().unwrap();
    wait_for_state(&scheduler, SchedulerState::Counting).await;

    let snapshot = scheduler.snapshot();
    assert_eq!(snapshot.phase, Some(Phase::Pending));
    assert_eq!(snapshot.remaining_secs, 3600);
    assert!(matches!(
        scheduler.open_quiz(),
        Err(ActionError::NotActive {
            phase: Phase::Pending
        })
    ));

    let failures: Vec<_> = recorder
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Event::FetchFailed {
                subscription_id, ..
            } => Some(subscription_id),
            _ => None,
        })
        .collect();
    assert_eq!(failures, vec![SubscriptionId::from("broken")]);
}

#[tokio::test]
async fn test_configured_window_drives_the_countdown() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        indoc! {r#"
            subscriptions = ["course-1"]

            [policy]
            excluded_month = 0
            open_at = "20:00"
            close_at = "20:30"

            [cadence]
            fast_tick_ms = 20
        "#},
    )
    .unwrap();
    let config = Config::load_from(&path).unwrap();

    let fetcher = StaticEventFetcher::from_json_str(
        r#"{"course-1": [{"_id": "feb", "schedule": "2023-02-28T08:00:00+00:00"}]}"#,
    )
    .unwrap();
    let clock = Arc::new(ManualClock::new(
        DateTime::parse_from_rfc3339("2023-02-28T20:10:00+00:00").unwrap(),
    ));
    let mut scheduler = CountdownScheduler::with_settings(
        clock,
        Arc::new(config.subscription_ids()),
        Arc::new(fetcher),
        Arc::new(|_: &Event| {}),
        Arc::new(RecordingOpener::new()),
        config.scheduler_settings().unwrap(),
    );

    scheduler.activate().unwrap();
    wait_for_state(&scheduler, SchedulerState::Counting).await;
    let snapshot = scheduler.snapshot();
    assert_eq!(snapshot.phase, Some(Phase::Active));
    assert_eq!(snapshot.remaining_secs, 20 * 60);
}
