use async_trait::async_trait;

use crate::error::FetchError;
use crate::event::{CandidateEvent, SubscriptionId};

/// Retrieves the candidate events of a single subscription.
///
/// Implementations may fail independently per subscription; callers treat a
/// failure as "no candidates this cycle". No retries happen at this layer.
/// The returned future is dropped (cancelled) when the scheduler tears down.
#[async_trait]
pub trait EventFetcher: Send + Sync {
    async fn fetch_candidate_events(
        &self,
        subscription: &SubscriptionId,
    ) -> Result<Vec<CandidateEvent>, FetchError>;
}

/// The caller's current subscriptions. May be empty.
pub trait SubscriptionSource: Send + Sync {
    fn subscriptions(&self) -> Vec<SubscriptionId>;
}

impl SubscriptionSource for Vec<SubscriptionId> {
    fn subscriptions(&self) -> Vec<SubscriptionId> {
        self.clone()
    }
}

impl SubscriptionSource for std::sync::RwLock<Vec<SubscriptionId>> {
    fn subscriptions(&self) -> Vec<SubscriptionId> {
        self.read().map(|s| s.clone()).unwrap_or_default()
    }
}
