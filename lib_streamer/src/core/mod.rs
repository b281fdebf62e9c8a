//! # Core Engine Module
//!
//! The scheduling loop's building blocks. None of them touch the network or the
//! clock on their own; the [`RedditStreamer`](crate::ingestors::RedditStreamer)
//! wires them together.
//!
//! ## Core Components:
//!
//! - **`model`**: subjects, item types, records, demand, bucket plans and the
//!   1-indexed second counter.
//! - **`dedup_cache`**: bounded, insertion-ordered seen-id sets per feed.
//! - **`scheduler`**: the `RateScheduler`, which turns a quota (and later,
//!   observed traffic) into a second-by-second polling plan.
//! - **`dispatcher`**: typed pub/sub that fans fresh records out to subscribers.
//! - **`fetch`**: the `FetchClient` trait the streamer polls through.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Per-feed bounded cache of seen item ids.
pub mod dedup_cache;
/// Typed event fan-out to named subscribers.
pub mod dispatcher;
/// The `FetchClient` trait.
pub mod fetch;
/// Data types shared across the engine.
pub mod model;
/// Quota-driven bucket planning and one-shot retuning.
pub mod scheduler;

// --- Public API Re-exports ---
pub use dedup_cache::{DedupCache, FilterOutcome, MAX_CACHE_SIZE};
pub use dispatcher::{Dispatcher, EventFilter, EventKind, FetchFailure, PlanSwap, StreamDelta, StreamEvent};
pub use fetch::FetchClient;
pub use model::{BucketPlan, Demand, ItemRecord, ItemType, PollEvent, RequestCounts, SecondCounter, Subject};
pub use scheduler::{Observation, RateScheduler, Retune, TunerPhase};
