//! Course backend client.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::record::QuizList;
use super::traits::EventFetcher;
use crate::error::FetchError;
use crate::event::{CandidateEvent, SubscriptionId};

/// Fetches quizzes from `GET {base_url}/api/quiz/course/{subscription}`.
#[derive(Debug, Clone)]
pub struct HttpEventFetcher {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpEventFetcher {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: Url,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    fn endpoint(&self, subscription: &SubscriptionId) -> String {
        format!(
            "{}/api/quiz/course/{}",
            self.base_url.as_str().trim_end_matches('/'),
            urlencoding::encode(subscription.as_str())
        )
    }
}

#[async_trait]
impl EventFetcher for HttpEventFetcher {
    async fn fetch_candidate_events(
        &self,
        subscription: &SubscriptionId,
    ) -> Result<Vec<CandidateEvent>, FetchError> {
        let mut request = self.client.get(self.endpoint(subscription));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                subscription: subscription.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let list: QuizList =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))?;
        tracing::debug!(
            subscription = %subscription,
            count = list.quizzes.len(),
            "fetched candidate events"
        );
        Ok(list
            .quizzes
            .into_iter()
            .filter_map(|r| r.into_candidate(subscription))
            .collect())
    }
}
