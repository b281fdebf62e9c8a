//! # Sources Module
//!
//! Concrete [`FetchClient`](crate::core::fetch::FetchClient) implementations,
//! one submodule per upstream service.
//!
//! ## Contained Modules:
//! - **`reddit`**: the public `/r/<subreddit>/<listing>.json` endpoints.

#![doc(html_logo_url = "https://example.com/logo.png")] // Placeholder
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Reddit listing client.
pub mod reddit;
