//! Event selection.
//!
//! Picks the single event relevant for today across all subscriptions: only
//! candidates scheduled on exactly today's date qualify, and the latest
//! scheduled timestamp wins. Equal timestamps resolve to the first candidate
//! met when walking subscriptions in the caller's order, then each
//! subscription's records in fetch order.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate};
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::event::{CandidateEvent, SelectedEvent, SubscriptionId};
use crate::fetch::EventFetcher;

/// A subscription whose candidates could not be fetched this cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub subscription_id: SubscriptionId,
    pub message: String,
}

/// Outcome of one fetch-and-select cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub selected: Option<SelectedEvent>,
    pub failures: Vec<FetchFailure>,
}

/// Choose today's event from already-fetched candidates.
///
/// Candidates whose timestamp cannot be parsed are skipped. `offset` is the
/// local offset used to decide which calendar day a timestamp falls on.
pub fn select(
    subscriptions: &[SubscriptionId],
    candidates: &HashMap<SubscriptionId, Vec<CandidateEvent>>,
    today: NaiveDate,
    offset: &FixedOffset,
) -> Option<SelectedEvent> {
    let mut best: Option<SelectedEvent> = None;

    for subscription in subscriptions {
        let Some(events) = candidates.get(subscription) else {
            continue;
        };
        for event in events {
            let Some(scheduled_at) = event.scheduled_in(offset) else {
                tracing::debug!(
                    event_id = %event.id,
                    raw = %event.scheduled_at,
                    "excluding candidate with invalid schedule"
                );
                continue;
            };
            if scheduled_at.date_naive() != today {
                continue;
            }
            let later = best
                .as_ref()
                .map_or(true, |current| scheduled_at > current.scheduled_at);
            if later {
                best = Some(SelectedEvent {
                    event: event.clone(),
                    scheduled_at,
                });
            }
        }
    }

    best
}

/// Fetches candidates for every subscription concurrently, then selects.
#[derive(Clone)]
pub struct EventSelector {
    fetcher: Arc<dyn EventFetcher>,
}

impl EventSelector {
    pub fn new(fetcher: Arc<dyn EventFetcher>) -> Self {
        Self { fetcher }
    }

    /// Fire every per-subscription fetch at once and collect the results.
    /// A failed fetch contributes no candidates and is reported instead.
    pub async fn fetch_all(
        &self,
        subscriptions: &[SubscriptionId],
    ) -> (HashMap<SubscriptionId, Vec<CandidateEvent>>, Vec<FetchFailure>) {
        let results = join_all(subscriptions.iter().map(|subscription| async move {
            let result = self.fetcher.fetch_candidate_events(subscription).await;
            (subscription, result)
        }))
        .await;

        let mut candidates = HashMap::new();
        let mut failures = Vec::new();
        for (subscription, result) in results {
            match result {
                Ok(events) => {
                    candidates.insert(subscription.clone(), events);
                }
                Err(e) => {
                    tracing::warn!(
                        subscription = %subscription,
                        error = %e,
                        "candidate fetch failed"
                    );
                    failures.push(FetchFailure {
                        subscription_id: subscription.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }
        (candidates, failures)
    }

    pub async fn select_for_day(
        &self,
        subscriptions: &[SubscriptionId],
        today: NaiveDate,
        offset: &FixedOffset,
    ) -> Selection {
        let (candidates, failures) = self.fetch_all(subscriptions).await;
        Selection {
            selected: select(subscriptions, &candidates, today, offset),
            failures,
        }
    }
}
