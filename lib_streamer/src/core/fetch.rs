//! The seam between the scheduling core and whatever actually talks to Reddit.

use async_trait::async_trait;

use crate::core::model::{ItemRecord, ItemType, Subject};
use crate::error::StreamerResult;

/// Per-request record cap of the Reddit listing endpoints.
pub const MAX_RECORDS_PER_REQUEST: u32 = 100;

/// Fetches the newest records of one feed.
///
/// Implementations own their retry policy; the streamer never retries a
/// scheduled fetch on its own.
#[async_trait]
pub trait FetchClient: Send + Sync {
    /// Returns up to `limit` records, newest first.
    async fn fetch(&self, item_type: ItemType, subject: &Subject, limit: u32) -> StreamerResult<Vec<ItemRecord>>;

    /// Largest `limit` one request may ask for.
    fn max_records_per_request(&self) -> u32 {
        MAX_RECORDS_PER_REQUEST
    }
}
