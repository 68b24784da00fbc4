//! In-memory candidate source, loadable from a JSON file.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;

use super::record::QuizRecord;
use super::traits::EventFetcher;
use crate::error::{CoreError, FetchError};
use crate::event::{CandidateEvent, SubscriptionId};

/// Serves candidate events from memory. Contents can be swapped while a
/// scheduler is running, which makes it useful for offline runs and tests.
#[derive(Debug, Default)]
pub struct StaticEventFetcher {
    events: RwLock<HashMap<SubscriptionId, Vec<CandidateEvent>>>,
    failing: RwLock<HashSet<SubscriptionId>>,
}

impl StaticEventFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON object mapping subscription id to quiz records.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON of
    /// that shape.
    pub fn from_json_file(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// # Errors
    ///
    /// Returns an error if `json` is not an object of quiz record arrays.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let raw: HashMap<String, Vec<QuizRecord>> = serde_json::from_str(json)?;
        let fetcher = Self::new();
        for (subscription, records) in raw {
            let subscription = SubscriptionId::from(subscription);
            let events = records
                .into_iter()
                .filter_map(|r| r.into_candidate(&subscription))
                .collect();
            fetcher.set_events(subscription, events);
        }
        Ok(fetcher)
    }

    pub fn set_events(&self, subscription: SubscriptionId, events: Vec<CandidateEvent>) {
        if let Ok(mut map) = self.events.write() {
            map.insert(subscription, events);
        }
    }

    pub fn clear_events(&self, subscription: &SubscriptionId) {
        if let Ok(mut map) = self.events.write() {
            map.remove(subscription);
        }
    }

    /// Make every fetch for `subscription` fail until cleared.
    pub fn set_failing(&self, subscription: SubscriptionId, failing: bool) {
        if let Ok(mut set) = self.failing.write() {
            if failing {
                set.insert(subscription);
            } else {
                set.remove(&subscription);
            }
        }
    }

    pub fn subscriptions(&self) -> Vec<SubscriptionId> {
        let mut subs: Vec<_> = self
            .events
            .read()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        subs.sort();
        subs
    }
}

#[async_trait]
impl EventFetcher for StaticEventFetcher {
    async fn fetch_candidate_events(
        &self,
        subscription: &SubscriptionId,
    ) -> Result<Vec<CandidateEvent>, FetchError> {
        let failing = self
            .failing
            .read()
            .map(|s| s.contains(subscription))
            .unwrap_or(false);
        if failing {
            return Err(FetchError::Unavailable(format!(
                "subscription '{subscription}' is marked as failing"
            )));
        }
        Ok(self
            .events
            .read()
            .ok()
            .and_then(|m| m.get(subscription).cloned())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn loads_records_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"course-1": [{{"_id": "q1", "schedule": "2024-05-31T00:00:00", "quizLink": "https://q"}}]}}"#
        )
        .unwrap();

        let fetcher = StaticEventFetcher::from_json_file(file.path()).unwrap();
        assert_eq!(fetcher.subscriptions(), vec![SubscriptionId::from("course-1")]);

        let events = fetcher
            .fetch_candidate_events(&SubscriptionId::from("course-1"))
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].subscription_id.as_str(), "course-1");
    }

    #[tokio::test]
    async fn unknown_subscription_yields_nothing() {
        let fetcher = StaticEventFetcher::new();
        let events = fetcher
            .fetch_candidate_events(&SubscriptionId::from("nope"))
            .await
            .unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn failing_subscription_errors() {
        let fetcher = StaticEventFetcher::new();
        let sub = SubscriptionId::from("course-1");
        fetcher.set_failing(sub.clone(), true);
        assert!(fetcher.fetch_candidate_events(&sub).await.is_err());
        fetcher.set_failing(sub.clone(), false);
        assert!(fetcher.fetch_candidate_events(&sub).await.is_ok());
    }
}
