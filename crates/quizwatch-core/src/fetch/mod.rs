//! External collaborators: where subscriptions and candidate events come from.

mod http;
mod memory;
mod record;
pub mod traits;

pub use http::HttpEventFetcher;
pub use memory::StaticEventFetcher;
pub use record::{QuizList, QuizRecord};
pub use traits::{EventFetcher, SubscriptionSource};
