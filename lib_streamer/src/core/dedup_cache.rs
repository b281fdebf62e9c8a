//! # Per-Feed Deduplication Cache
//!
//! Remembers the most recent item ids seen for every `(subject, item type)`
//! feed so that overlapping listing pages are only published once.
//!
//! ## Core Design Principles:
//!
//! - **Bounded**: each feed keeps at most [`MAX_CACHE_SIZE`] ids. Inserting past
//!   the cap evicts the oldest id first (FIFO), so memory stays flat no matter
//!   how long the process runs.
//! - **Insertion-ordered**: a `VecDeque` records arrival order for eviction while
//!   a `HashSet` answers membership in O(1).
//! - **Per-key exclusion**: the set of feeds is fixed at construction, so the outer
//!   map is never mutated and needs no lock. Each feed sits behind its own mutex;
//!   two calls for the same feed are serialized, calls for different feeds never
//!   contend.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, PoisonError};

use crate::core::model::{ItemRecord, ItemType, Subject};
use crate::error::{StreamerError, StreamerResult};

/// Ids remembered per feed.
pub const MAX_CACHE_SIZE: usize = 301;

/// Outcome of [`DedupCache::filter_and_add`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    /// Records whose id was not cached yet, in their original order.
    pub fresh: Vec<ItemRecord>,
    /// Size of the feed's cache after the fresh ids were added.
    pub cache_size: usize,
}

/// Insertion-ordered id set for a single feed.
#[derive(Debug, Default)]
struct SeenIds {
    order: VecDeque<String>,
    members: HashSet<String>,
}

impl SeenIds {
    /// Returns `false` when `id` was already present.
    fn insert(&mut self, id: &str, capacity: usize) -> bool {
        if self.members.contains(id) {
            return false;
        }
        self.members.insert(id.to_owned());
        self.order.push_back(id.to_owned());
        if self.order.len() > capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        true
    }

    fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// # Dedup Cache
///
/// Bounded, ordered seen-id sets for every configured `(subject, item type)`.
#[derive(Debug)]
pub struct DedupCache {
    feeds: HashMap<(Subject, ItemType), Mutex<SeenIds>>,
    capacity: usize,
}

impl DedupCache {
    /// Creates an empty cache for every subject and both item types.
    pub fn new(subjects: &[Subject]) -> Self {
        Self::with_capacity(subjects, MAX_CACHE_SIZE)
    }

    /// Same as [`DedupCache::new`] with a custom per-feed cap.
    pub fn with_capacity(subjects: &[Subject], capacity: usize) -> Self {
        let feeds = subjects
            .iter()
            .flat_map(|s| ItemType::ALL.map(|t| ((s.clone(), t), Mutex::new(SeenIds::default()))))
            .collect();
        Self {
            feeds,
            capacity: capacity.max(1),
        }
    }

    /// The per-feed cap.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn feed(&self, subject: &Subject, item_type: ItemType) -> StreamerResult<&Mutex<SeenIds>> {
        self.feeds
            .get(&(subject.clone(), item_type))
            .ok_or_else(|| StreamerError::UnknownSubject {
                subject: subject.to_string(),
                item_type,
            })
    }

    /// Inserts every id not yet present, in call order, evicting the oldest id
    /// whenever the feed grows past its cap. Returns the resulting size.
    pub fn add_many<I, S>(&self, ids: I, subject: &Subject, item_type: ItemType) -> StreamerResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = self.feed(subject, item_type)?.lock().unwrap_or_else(PoisonError::into_inner);
        for id in ids {
            seen.insert(id.as_ref(), self.capacity);
        }
        Ok(seen.len())
    }

    /// Returns the records whose id was not cached, in their original relative
    /// order, and caches those ids.
    ///
    /// Ids are checked and inserted one record at a time, so a repeated id
    /// inside the same batch is returned once, at its first position. This is
    /// intentional: a batch is never checked as a whole before it is cached.
    pub fn filter_and_add(
        &self,
        records: Vec<ItemRecord>,
        subject: &Subject,
        item_type: ItemType,
    ) -> StreamerResult<FilterOutcome> {
        let mut seen = self.feed(subject, item_type)?.lock().unwrap_or_else(PoisonError::into_inner);
        let fresh: Vec<ItemRecord> = records
            .into_iter()
            .filter(|record| seen.insert(&record.id, self.capacity))
            .collect();
        Ok(FilterOutcome {
            fresh,
            cache_size: seen.len(),
        })
    }

    /// True when `id` is currently cached for the feed.
    pub fn contains(&self, id: &str, subject: &Subject, item_type: ItemType) -> StreamerResult<bool> {
        let seen = self.feed(subject, item_type)?.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(seen.contains(id))
    }

    /// Number of ids cached for the feed.
    pub fn len(&self, subject: &Subject, item_type: ItemType) -> StreamerResult<usize> {
        let seen = self.feed(subject, item_type)?.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(seen.len())
    }
}
