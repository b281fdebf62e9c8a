//! Reddit listing endpoints.

/// The `RedditApi` fetch client.
pub mod apicall_reddit;

pub use apicall_reddit::{RedditApi, REDDIT_BASE_URL};
