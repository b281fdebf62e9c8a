//! # Reddit API Client
//!
//! Fetches the newest posts or comments of a subreddit from the public JSON
//! listings:
//!
//! ```text
//! GET /r/<subreddit>/new.json?sort=new&show=all&limit=<n>       (posts)
//! GET /r/<subreddit>/comments.json?sort=new&show=all&limit=<n>  (comments)
//! ```
//!
//! ## Core Features:
//! - **Dedicated Client**: wraps a pre-configured `ApiClient`, so transient
//!   network failures are retried with exponential backoff before the streamer
//!   ever sees them.
//! - **Listing Envelope**: only `data.children[].data` is kept; every child
//!   becomes one `ItemRecord` with its full payload.
//! - **Clamped Batches**: `limit` never exceeds the listing maximum of 100.

#![doc(html_logo_url = "https://example.com/logo.png")] // Placeholder
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

use async_trait::async_trait;
use serde::Deserialize;

use crate::core::fetch::{FetchClient, MAX_RECORDS_PER_REQUEST};
use crate::core::model::{ItemRecord, ItemType, Subject};
use crate::error::StreamerResult;
use crate::retrieve::ky_http::{ApiClient, ApiClientOptions};

/// Production base URL.
pub const REDDIT_BASE_URL: &str = "https://www.reddit.com/";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: ItemRecord,
}

impl Listing {
    fn into_records(self) -> Vec<ItemRecord> {
        self.data.children.into_iter().map(|child| child.data).collect()
    }
}

/// # Reddit API Call Client
pub struct RedditApi {
    client: ApiClient,
}

impl RedditApi {
    /// Client for [`REDDIT_BASE_URL`].
    pub fn new(options: ApiClientOptions) -> StreamerResult<Self> {
        Self::with_base_url(REDDIT_BASE_URL, options)
    }

    /// Client for another host serving the same listing paths.
    pub fn with_base_url(base_url: &str, options: ApiClientOptions) -> StreamerResult<Self> {
        Ok(Self {
            client: ApiClient::new(base_url, options)?,
        })
    }

    fn listing_path(item_type: ItemType, subject: &Subject) -> String {
        format!("r/{}/{}.json", subject, item_type.listing())
    }
}

#[async_trait]
impl FetchClient for RedditApi {
    async fn fetch(&self, item_type: ItemType, subject: &Subject, limit: u32) -> StreamerResult<Vec<ItemRecord>> {
        let limit = limit.clamp(1, MAX_RECORDS_PER_REQUEST);
        let path = Self::listing_path(item_type, subject);
        let query = [
            ("sort", "new".to_string()),
            ("show", "all".to_string()),
            ("limit", limit.to_string()),
        ];

        let listing: Listing = self.client.get_json(&path, &query).await?;
        let records = listing.into_records();
        log::trace!("Fetched {} {} records for '{}'", records.len(), item_type, subject);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StreamerError;
    use crate::retrieve::ky_http::tests::serve_once;
    use serde_json::json;

    fn listing(ids: &[&str]) -> String {
        let children: Vec<_> = ids
            .iter()
            .map(|id| json!({"kind": "t3", "data": {"id": id, "title": format!("post {}", id)}}))
            .collect();
        json!({"kind": "Listing", "data": {"after": null, "children": children}}).to_string()
    }

    fn options() -> ApiClientOptions {
        ApiClientOptions {
            max_retries: 0,
            ..ApiClientOptions::default()
        }
    }

    #[test]
    fn decodes_listing_children() {
        let parsed: Listing = serde_json::from_str(&listing(&["abc", "def"])).unwrap();
        let records = parsed.into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "abc");
        assert_eq!(records[1].payload["title"], "post def");
    }

    #[test]
    fn child_without_id_is_rejected() {
        let body = r#"{"data":{"children":[{"data":{"title":"no id"}}]}}"#;
        assert!(serde_json::from_str::<Listing>(body).is_err());
    }

    #[test]
    fn listing_paths() {
        let subject = Subject::from("rust");
        assert_eq!(RedditApi::listing_path(ItemType::Post, &subject), "r/rust/new.json");
        assert_eq!(RedditApi::listing_path(ItemType::Comment, &subject), "r/rust/comments.json");
    }

    #[tokio::test]
    async fn fetch_requests_newest_comments_with_clamped_limit() {
        let (base, seen) = serve_once("200 OK", listing(&["c1", "c2", "c3"]));
        let api = RedditApi::with_base_url(&base, options()).unwrap();

        let records = api.fetch(ItemType::Comment, &Subject::from("rust"), 500).await.unwrap();
        assert_eq!(records.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), ["c1", "c2", "c3"]);

        let request = seen.recv().unwrap();
        assert!(
            request.starts_with("GET /r/rust/comments.json?sort=new&show=all&limit=100 "),
            "{}",
            request
        );
    }

    #[tokio::test]
    async fn forbidden_subreddit_is_an_http_status_error() {
        let (base, _seen) = serve_once("403 Forbidden", r#"{"reason":"private"}"#.to_string());
        let api = RedditApi::with_base_url(&base, options()).unwrap();

        let err = api.fetch(ItemType::Post, &Subject::from("secret"), 10).await.unwrap_err();
        assert!(matches!(err, StreamerError::HttpStatus { status: 403, .. }));
    }
}
