//! # Data Retrieval Module
//!
//! Generic HTTP plumbing shared by the concrete source clients.
//!
//! ## Contained Modules:
//!
//! - **`ky_http`**: an `ApiClient` built on `reqwest` and `reqwest-middleware`,
//!   with automatic retries and exponential backoff. Source clients such as
//!   `sources::reddit::RedditApi` only deal with paths and payload shapes.

#![doc(html_logo_url = "https://example.com/logo.png")] // Placeholder
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Generic HTTP API client with retry middleware.
pub mod ky_http;

pub use ky_http::{ApiClient, ApiClientOptions, ApiResponse};
