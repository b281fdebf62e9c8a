//! # Ingestors Module
//!
//! Clock-driven clients that pull data from an upstream source and push it into
//! the event dispatcher.
//!
//! ## Contained Modules:
//! - **`reddit_streamer`**: polls subreddit listings on a per-second plan,
//!   deduplicates the results and publishes fresh records. The plan is retuned
//!   once, after a full bootstrap minute has been observed.

#![doc(html_logo_url = "https://example.com/logo.png")] // Placeholder
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// The subreddit streamer and its one-second clock.
pub mod reddit_streamer;

pub use reddit_streamer::{RedditStreamer, TUNER_SUBSCRIBER};
