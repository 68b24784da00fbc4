//! Wire shape of quiz records served by the course backend.

use serde::{Deserialize, Serialize};

use crate::event::{CandidateEvent, Payload, SubscriptionId};

/// Body of `GET /api/quiz/course/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizList {
    #[serde(default)]
    pub quizzes: Vec<QuizRecord>,
}

/// One quiz as stored remotely. Everything besides the id and schedule
/// (`quizLink`, `liveSessionLink`, `instructions`, `rewards`, ...) is kept
/// verbatim in the payload.
///
/// Id and schedule are decoded loosely so that one malformed record drops
/// only itself, never the rest of the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizRecord {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: serde_json::Value,
    #[serde(default)]
    pub schedule: serde_json::Value,
    #[serde(flatten)]
    pub payload: Payload,
}

impl QuizRecord {
    /// `None` when the record has no usable id.
    pub fn into_candidate(self, subscription: &SubscriptionId) -> Option<CandidateEvent> {
        let id = match self.id {
            serde_json::Value::String(s) if !s.trim().is_empty() => s,
            serde_json::Value::Number(n) => n.to_string(),
            other => {
                tracing::debug!(
                    subscription = %subscription,
                    id = %other,
                    "skipping quiz without id"
                );
                return None;
            }
        };
        Some(CandidateEvent {
            id,
            subscription_id: subscription.clone(),
            // Anything but a string stays empty and is excluded at selection time.
            scheduled_at: match self.schedule {
                serde_json::Value::String(s) => s,
                _ => String::new(),
            },
            payload: self.payload,
        })
    }
}
