//! Error type shared by every module of the crate.

use thiserror::Error;

use crate::core::model::ItemType;

/// Convenience alias used throughout the crate.
pub type StreamerResult<T> = Result<T, StreamerError>;

/// Everything that can go wrong while configuring or running the streamer.
///
/// Configuration variants are returned before the clock starts. Fetch variants
/// are produced by [`FetchClient`](crate::core::fetch::FetchClient)
/// implementations and never escape the tick loop.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum StreamerError {
    /// The subject list is empty.
    #[error("no subjects configured")]
    NoSubjects,

    /// A subject appears twice in the list.
    #[error("subject '{0}' is configured more than once")]
    DuplicateSubject(String),

    /// A subject or feed that was not configured.
    #[error("unknown subject '{subject}' for {item_type} feed")]
    UnknownSubject { subject: String, item_type: ItemType },

    /// The quota settings cannot be planned with.
    #[error("invalid quota configuration: {0}")]
    InvalidQuota(String),

    /// The even bootstrap split schedules no poll at all.
    #[error("quota of {quota} requests/min schedules no bootstrap polls for {subjects} subjects")]
    QuotaTooSmall { quota: u32, subjects: usize },

    /// `on_retuned` was called twice.
    #[error("a retune receiver is already registered")]
    RetuneAlreadyRegistered,

    /// A plan used a second outside the minute.
    #[error("bucket second {0} is outside 1..=60")]
    InvalidBucket(u8),

    /// A fetch failed for a reason other than transport or status.
    #[error("fetch of {item_type} feed for '{subject}' failed: {reason}")]
    Fetch {
        subject: String,
        item_type: ItemType,
        reason: String,
    },

    /// The upstream answered with a non-2xx status.
    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// A scheduled fetch exceeded its timeout.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// Inconsistent runtime configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Undecodable JSON.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A malformed URL.
    #[cfg(feature = "retrieve")]
    #[error(transparent)]
    Url(#[from] url::ParseError),

    /// Transport failure after the retry policy gave up.
    #[cfg(feature = "retrieve")]
    #[error(transparent)]
    Http(#[from] reqwest_middleware::Error),
}

#[cfg(feature = "retrieve")]
impl From<reqwest::Error> for StreamerError {
    fn from(err: reqwest::Error) -> Self {
        StreamerError::Http(reqwest_middleware::Error::Reqwest(err))
    }
}
