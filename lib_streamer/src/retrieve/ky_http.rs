//! # HTTP Retrieval Utilities
//!
//! An asynchronous API client wrapper around `reqwest`, with middleware-based
//! exponential backoff for transient failures, a per-request timeout and
//! standardized JSON response handling.

use std::time::Duration;

use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::error::{StreamerError, StreamerResult};

/// A standardized container for API responses.
///
/// Wraps the deserialized data along with metadata about the HTTP transaction.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The deserialized response body, set when the request succeeded.
    pub data: Option<T>,
    /// The raw body returned by the server when the request failed.
    pub error_body: Option<String>,
    /// The numeric HTTP status code.
    pub status: u16,
    /// Whether the status code was in the 2xx range.
    pub success: bool,
    /// The headers returned by the server.
    pub headers: HeaderMap,
}

impl<T> ApiResponse<T> {
    /// Turns a non-2xx response into [`StreamerError::HttpStatus`] and returns the body otherwise.
    pub fn into_data(self) -> StreamerResult<T> {
        match self.data {
            Some(data) if self.success => Ok(data),
            _ => Err(StreamerError::HttpStatus {
                status: self.status,
                body: self.error_body.unwrap_or_default(),
            }),
        }
    }
}

/// Construction options for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ApiClientOptions {
    /// Sent as the `User-Agent` header on every request.
    pub user_agent: String,
    /// Upper bound for a single attempt.
    pub timeout: Duration,
    /// Retries for transient failures (connect errors, 5xx, 429).
    pub max_retries: u32,
    /// Optional bearer token.
    pub auth_token: Option<String>,
}

impl Default for ApiClientOptions {
    fn default() -> Self {
        Self {
            user_agent: concat!("lib_streamer/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
            auth_token: None,
        }
    }
}

/// A flexible asynchronous HTTP client.
///
/// Built on top of `reqwest_middleware`, it handles base URLs, authentication
/// tokens and automatic retries.
pub struct ApiClient {
    inner: ClientWithMiddleware,
    base_url: Url,
    auth_token: Option<String>,
}

impl ApiClient {
    /// Creates a new `ApiClient` with an exponential backoff retry policy.
    ///
    /// # Errors
    /// Fails when `base_url` is not an absolute URL or the TLS backend cannot be
    /// initialized.
    pub fn new(base_url: &str, options: ApiClientOptions) -> StreamerResult<Self> {
        let mut base_url = Url::parse(base_url)?;
        // `join` replaces the last segment unless the base ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .user_agent(options.user_agent)
            .timeout(options.timeout)
            .build()?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(options.max_retries);
        let inner = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            inner,
            base_url,
            auth_token: options.auth_token,
        })
    }

    /// The base every request path is joined onto.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Performs an HTTP request and captures the response.
    ///
    /// A non-2xx status is not an error here: it comes back with `success`
    /// unset and the raw body in `error_body`.
    ///
    /// # Errors
    /// URL joining, transport failures and undecodable 2xx bodies.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        headers: Option<HeaderMap>,
        body: Option<B>,
    ) -> StreamerResult<ApiResponse<T>>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let full_url = self.base_url.join(path.trim_start_matches('/'))?;
        let mut req = self.inner.request(method, full_url);

        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(h) = headers {
            req = req.headers(h);
        }
        if let Some(token) = &self.auth_token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(b) = body {
            let json_body = serde_json::to_string(&b)?;
            req = req.header(CONTENT_TYPE, "application/json").body(json_body);
        }

        let response = req.send().await?;
        let status = response.status();
        let resp_headers = response.headers().clone();

        if status.is_success() {
            let bytes = response.bytes().await?;
            let data = serde_json::from_slice::<T>(&bytes)?;
            Ok(ApiResponse {
                data: Some(data),
                error_body: None,
                status: status.as_u16(),
                success: true,
                headers: resp_headers,
            })
        } else {
            let error_text = response.text().await.ok();
            Ok(ApiResponse {
                data: None,
                error_body: error_text,
                status: status.as_u16(),
                success: false,
                headers: resp_headers,
            })
        }
    }

    /// `GET` with query parameters, decoding a JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> StreamerResult<T> {
        self.request::<T, ()>(Method::GET, path, query, None, None)
            .await?
            .into_data()
    }
}
