use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::quota::QuotaConfig;
use crate::error::StreamerResult;

/// Runtime settings for [`RedditStreamer`](crate::ingestors::RedditStreamer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamerSettings {
    /// Global quota and its split.
    pub quota: QuotaConfig,
    /// Batch size of the one-off fetches that seed the caches.
    pub preload_limit: u32,
    /// Batch size of every scheduled fetch.
    pub stream_limit: u32,
    /// Upper bound on a single scheduled fetch before it is counted as failed.
    pub fetch_timeout_secs: u64,
    /// Start the second counter at the current wall-clock second of the minute
    /// instead of at 1.
    pub align_to_minute: bool,
}

impl Default for StreamerSettings {
    fn default() -> Self {
        Self {
            quota: QuotaConfig::default(),
            preload_limit: 100,
            stream_limit: 100,
            fetch_timeout_secs: 10,
            align_to_minute: false,
        }
    }
}

impl StreamerSettings {
    /// Fails when the quota cannot be planned with.
    pub fn validate(&self) -> StreamerResult<()> {
        self.quota.validate()
    }

    /// The per-fetch timeout.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }
}
