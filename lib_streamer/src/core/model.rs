//! # Scheduling Model
//!
//! The plain data types shared by the cache, the scheduler and the streamer:
//! who gets polled (`Subject`), for what (`ItemType`), what comes back
//! (`ItemRecord`), how often it is needed (`Demand`) and when it happens
//! (`BucketPlan`, `SecondCounter`).

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{StreamerError, StreamerResult};

/// Number of one-second buckets in a scheduling window.
pub const SECONDS_IN_MINUTE: u8 = 60;

/// A pollable source partition (a subreddit name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subject(String);

impl Subject {
    /// Wraps a subreddit name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The raw subreddit name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Subject {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Subject {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Fails on an empty subject list or a subject listed twice.
pub fn validate_subjects(subjects: &[Subject]) -> StreamerResult<()> {
    if subjects.is_empty() {
        return Err(StreamerError::NoSubjects);
    }
    let mut seen = std::collections::HashSet::with_capacity(subjects.len());
    for subject in subjects {
        if !seen.insert(subject) {
            return Err(StreamerError::DuplicateSubject(subject.to_string()));
        }
    }
    Ok(())
}

/// The two kinds of content polled per subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    /// Submissions, served from the `new` listing.
    Post,
    /// Comments, served from the `comments` listing.
    Comment,
}

impl ItemType {
    /// Both item types, posts first.
    pub const ALL: [ItemType; 2] = [ItemType::Post, ItemType::Comment];

    /// Lowercase name used in logs and event payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Post => "post",
            ItemType::Comment => "comment",
        }
    }

    /// Path segment of the remote listing that serves this type.
    pub fn listing(self) -> &'static str {
        match self {
            ItemType::Post => "new",
            ItemType::Comment => "comments",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single post or comment as returned by the fetch client.
///
/// Only `id` is interpreted; every other field is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Stable identifier, unique per subject and type.
    pub id: String,
    /// The remaining upstream fields, verbatim.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl ItemRecord {
    /// A record that carries nothing but its id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload: Map::new(),
        }
    }
}

/// One scheduled poll: fetch `item_type` for `subject`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PollEvent {
    /// The subreddit to poll.
    pub subject: Subject,
    /// Which listing to poll.
    pub item_type: ItemType,
}

/// Requests per minute for one subject, split by type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCounts {
    /// Post requests (or, while tuning, observed post records).
    pub post: u32,
    /// Comment requests (or, while tuning, observed comment records).
    pub comment: u32,
}

impl RequestCounts {
    /// Reads the count for one type.
    pub fn get(&self, item_type: ItemType) -> u32 {
        match item_type {
            ItemType::Post => self.post,
            ItemType::Comment => self.comment,
        }
    }

    /// Mutable access to the count for one type.
    pub fn get_mut(&mut self, item_type: ItemType) -> &mut u32 {
        match item_type {
            ItemType::Post => &mut self.post,
            ItemType::Comment => &mut self.comment,
        }
    }

    /// True once both counts reached zero.
    pub fn is_exhausted(&self) -> bool {
        self.post == 0 && self.comment == 0
    }
}

/// Requests per minute needed per subject and type.
///
/// Subjects keep the order they were configured in, which is the order the
/// round-robin assignment walks (back to front).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Demand {
    order: Vec<Subject>,
    counts: HashMap<Subject, RequestCounts>,
}

impl Demand {
    /// Demand with the same `post`/`comment` value for every subject.
    pub fn uniform(subjects: &[Subject], post: u32, comment: u32) -> Self {
        let counts = subjects
            .iter()
            .map(|s| (s.clone(), RequestCounts { post, comment }))
            .collect();
        Self {
            order: subjects.to_vec(),
            counts,
        }
    }

    /// Subjects in configured order.
    pub fn subjects(&self) -> &[Subject] {
        &self.order
    }

    /// Counts for one subject.
    pub fn get(&self, subject: &Subject) -> Option<&RequestCounts> {
        self.counts.get(subject)
    }

    /// Mutable counts for one subject.
    pub fn get_mut(&mut self, subject: &Subject) -> Option<&mut RequestCounts> {
        self.counts.get_mut(subject)
    }

    /// Sum over all subjects for one type.
    pub fn total_for(&self, item_type: ItemType) -> u32 {
        self.counts.values().map(|c| c.get(item_type)).sum()
    }

    /// Sum over all subjects and both types.
    pub fn total(&self) -> u32 {
        self.total_for(ItemType::Post) + self.total_for(ItemType::Comment)
    }

    /// Largest single-subject value for one type.
    pub fn max_for(&self, item_type: ItemType) -> u32 {
        self.counts
            .values()
            .map(|c| c.get(item_type))
            .max()
            .unwrap_or(0)
    }

    /// Iterates `(subject, counts)` in configured order.
    pub fn iter(&self) -> impl Iterator<Item = (&Subject, &RequestCounts)> + '_ {
        self.order
            .iter()
            .filter_map(move |s| self.counts.get(s).map(|c| (s, c)))
    }
}

impl fmt::Display for Demand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (subject, counts) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{}={{post: {}, comment: {}}}", subject, counts.post, counts.comment)?;
        }
        Ok(())
    }
}

/// Second-of-minute → poll events fired in that second.
///
/// Immutable once built; replaced wholesale when the scheduler retunes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketPlan {
    buckets: BTreeMap<u8, Vec<PollEvent>>,
}

impl BucketPlan {
    pub(crate) fn from_buckets(buckets: BTreeMap<u8, Vec<PollEvent>>) -> Self {
        Self { buckets }
    }

    /// Events scheduled for `second`, empty when nothing is.
    pub fn events_at(&self, second: u8) -> &[PollEvent] {
        self.buckets.get(&second).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every bucket second that exists in the plan, ascending.
    pub fn seconds(&self) -> impl Iterator<Item = u8> + '_ {
        self.buckets.keys().copied()
    }

    /// `(second, events)` pairs, ascending by second.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &[PollEvent])> + '_ {
        self.buckets.iter().map(|(s, e)| (*s, e.as_slice()))
    }

    /// Number of poll events across the whole minute.
    pub fn total_events(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// How many times `(subject, item_type)` is polled per minute.
    pub fn count_for(&self, subject: &Subject, item_type: ItemType) -> usize {
        self.buckets
            .values()
            .flatten()
            .filter(|e| &e.subject == subject && e.item_type == item_type)
            .count()
    }

    /// Checks that every second lies in 1..=60 and every subject is configured.
    pub fn validate(&self, subjects: &[Subject]) -> StreamerResult<()> {
        for (second, events) in &self.buckets {
            if *second == 0 || *second > SECONDS_IN_MINUTE {
                return Err(StreamerError::InvalidBucket(*second));
            }
            if let Some(stray) = events.iter().find(|e| !subjects.contains(&e.subject)) {
                return Err(StreamerError::UnknownSubject {
                    subject: stray.subject.to_string(),
                    item_type: stray.item_type,
                });
            }
        }
        Ok(())
    }
}

/// The 1-indexed second-of-minute clock driving the plan.
///
/// The counter assumes the first tick lands on `start`; it increments once
/// per tick and wraps from 60 back to 1, never to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecondCounter(u8);

impl SecondCounter {
    /// A counter whose first tick is `start`. Out-of-range values fold into 1..=60.
    pub fn starting_at(start: u8) -> Self {
        let folded = match start % SECONDS_IN_MINUTE {
            0 => SECONDS_IN_MINUTE,
            s => s,
        };
        Self(folded)
    }

    /// A counter aligned with the current wall-clock second of the minute.
    pub fn aligned_now() -> Self {
        use chrono::Timelike;
        // chrono seconds run 0..=59 (60 on a leap second); bucket 60 is second 0.
        Self::starting_at(chrono::Utc::now().second() as u8)
    }

    /// The second the next tick will execute.
    pub fn current(&self) -> u8 {
        self.0
    }

    /// Moves to the next second and returns the one that was current.
    pub fn advance(&mut self) -> u8 {
        let now = self.0;
        self.0 = if now >= SECONDS_IN_MINUTE { 1 } else { now + 1 };
        now
    }
}

impl Default for SecondCounter {
    fn default() -> Self {
        Self(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_counter_wraps_to_one() {
        let mut counter = SecondCounter::starting_at(59);
        assert_eq!(counter.advance(), 59);
        assert_eq!(counter.advance(), 60);
        assert_eq!(counter.advance(), 1);
        assert_eq!(counter.current(), 2);
    }

    #[test]
    fn second_counter_folds_zero_to_sixty() {
        assert_eq!(SecondCounter::starting_at(0).current(), 60);
        assert_eq!(SecondCounter::starting_at(61).current(), 1);
        assert_eq!(SecondCounter::default().current(), 1);
    }

    #[test]
    fn item_record_keeps_unknown_fields() {
        let raw = serde_json::json!({"id": "t3_abc", "title": "hello", "ups": 12});
        let record: ItemRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(record.id, "t3_abc");
        assert_eq!(record.payload.get("ups"), Some(&serde_json::json!(12)));
        assert!(!record.payload.contains_key("id"));
    }

    #[test]
    fn plan_validation_rejects_second_zero_and_strangers() {
        let known = vec![Subject::from("rust")];
        let mut buckets = BTreeMap::new();
        buckets.insert(
            0,
            vec![PollEvent {
                subject: Subject::from("rust"),
                item_type: ItemType::Post,
            }],
        );
        let plan = BucketPlan::from_buckets(buckets);
        assert!(matches!(plan.validate(&known), Err(StreamerError::InvalidBucket(0))));

        let mut buckets = BTreeMap::new();
        buckets.insert(
            5,
            vec![PollEvent {
                subject: Subject::from("golang"),
                item_type: ItemType::Comment,
            }],
        );
        let plan = BucketPlan::from_buckets(buckets);
        assert!(matches!(
            plan.validate(&known),
            Err(StreamerError::UnknownSubject { .. })
        ));
    }

    #[test]
    fn demand_iterates_in_configured_order() {
        let subjects: Vec<Subject> = ["b", "a", "c"].into_iter().map(Subject::from).collect();
        let demand = Demand::uniform(&subjects, 1, 2);
        let order: Vec<&str> = demand.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
        assert_eq!(demand.total(), 9);
        assert_eq!(demand.to_string(), "b={post: 1, comment: 2}, a={post: 1, comment: 2}, c={post: 1, comment: 2}");
    }
}
