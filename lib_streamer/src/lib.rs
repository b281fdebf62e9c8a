//! # lib_streamer
//!
//! Polls subreddit feeds under one global requests-per-minute quota, drops items
//! that were already seen and fans the fresh ones out to subscribers.
//!
//! ## Layout
//!
//! - **`core`**: model types, the per-feed `DedupCache`, the `RateScheduler` that
//!   plans which second of the minute each feed is polled in, and the event
//!   `Dispatcher`.
//! - **`ingestors`**: the `RedditStreamer`, which drives the one-second clock.
//! - **`configs`**: quota and streamer settings.
//! - **`retrieve`** / **`sources`** (feature `retrieve`): the HTTP client and the
//!   Reddit fetch client built on top of it.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod configs;
pub mod core;
pub mod error;
pub mod ingestors;

#[cfg(feature = "retrieve")]
pub mod retrieve;
#[cfg(feature = "retrieve")]
pub mod sources;

pub use configs::{QuotaConfig, StreamerSettings};
pub use error::{StreamerError, StreamerResult};
pub use ingestors::RedditStreamer;
