//! # Event Dispatcher
//!
//! Fans every event the streamer produces out to the subscribers that asked for
//! it.
//!
//! ## Core Design Principles:
//!
//! 1.  **Zero-Copy Fan-out**: an event is wrapped in an `Arc` once; each subscriber
//!     receives a clone of the pointer, never of the payload.
//! 2.  **Typed Filters**: subscribers pick event kinds through [`EventFilter`]
//!     rather than free-form strings. The string form (`"all"`,
//!     `"stream,fetch_failed"`) is still accepted by [`EventFilter::parse`] for
//!     configuration files.
//! 3.  **Synchronous, Ordered Delivery**: `publish` calls every matching handler in
//!     registration order before returning, so a subscriber sees events in the
//!     order the streamer emitted them. Handlers run outside the registry lock and
//!     may (un)subscribe from inside a callback.
//! 4.  **Disconnect Cleanup**: channel subscribers whose receiver was dropped are
//!     removed on the next publish.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::core::model::{Demand, ItemRecord, ItemType, Subject};
use crate::error::StreamerError;

/// Fresh records from one executed poll.
#[derive(Debug, Clone)]
pub struct StreamDelta {
    /// Records not seen before, in upstream order.
    pub new_records: Vec<ItemRecord>,
    /// The polled subject.
    pub subject: Subject,
    /// The polled listing.
    pub item_type: ItemType,
    /// Size of the feed's dedup cache after this poll.
    pub cache_size: usize,
}

/// A scheduled poll that did not produce data.
#[derive(Debug, Clone)]
pub struct FetchFailure {
    /// The polled subject.
    pub subject: Subject,
    /// The polled listing.
    pub item_type: ItemType,
    /// Human readable cause.
    pub reason: String,
}

/// The streamer moved from the bootstrap plan to the steady-state plan.
#[derive(Debug, Clone)]
pub struct PlanSwap {
    /// Demand the new plan was built from.
    pub demand: Demand,
    /// Poll events per minute in the new plan.
    pub events_per_minute: usize,
}

/// Everything a subscriber can receive.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Deduplicated records from a scheduled poll.
    Stream(StreamDelta),
    /// A scheduled poll failed; its slot is skipped for this tick.
    FetchFailed(FetchFailure),
    /// The active plan was replaced.
    PlanSwapped(PlanSwap),
}

impl StreamEvent {
    /// The kind used for filtering.
    pub fn kind(&self) -> EventKind {
        match self {
            StreamEvent::Stream(_) => EventKind::Stream,
            StreamEvent::FetchFailed(_) => EventKind::FetchFailed,
            StreamEvent::PlanSwapped(_) => EventKind::PlanSwapped,
        }
    }
}

/// Event names subscribers filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `"stream"`
    Stream,
    /// `"fetch_failed"`
    FetchFailed,
    /// `"plan_swapped"`
    PlanSwapped,
}

impl EventKind {
    /// The configuration name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Stream => "stream",
            EventKind::FetchFailed => "fetch_failed",
            EventKind::PlanSwapped => "plan_swapped",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = StreamerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "stream" => Ok(EventKind::Stream),
            "fetch_failed" => Ok(EventKind::FetchFailed),
            "plan_swapped" => Ok(EventKind::PlanSwapped),
            other => Err(StreamerError::Config(format!("unknown event name '{}'", other))),
        }
    }
}

/// Which events a subscriber wants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventFilter {
    /// Every event.
    All,
    /// Only the listed kinds.
    Only(HashSet<EventKind>),
}

impl EventFilter {
    /// A filter accepting exactly `kinds`.
    pub fn only<I: IntoIterator<Item = EventKind>>(kinds: I) -> Self {
        EventFilter::Only(kinds.into_iter().collect())
    }

    /// Parses `"all"` or a comma separated list of event names.
    pub fn parse(list: &str) -> Result<Self, StreamerError> {
        if list.trim().eq_ignore_ascii_case("all") {
            return Ok(EventFilter::All);
        }
        let kinds = list
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(EventFilter::Only(kinds))
    }

    /// True when events of `kind` pass this filter.
    pub fn accepts(&self, kind: EventKind) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Only(kinds) => kinds.contains(&kind),
        }
    }
}

/// Callback form of a subscriber.
pub type EventHandler = Arc<dyn Fn(Arc<StreamEvent>) + Send + Sync>;

#[derive(Clone)]
enum Sink {
    Callback(EventHandler),
    Channel(mpsc::UnboundedSender<Arc<StreamEvent>>),
}

#[derive(Clone)]
struct Subscription {
    name: String,
    filter: EventFilter,
    sink: Sink,
}

/// # Dispatcher
///
/// Registry of named subscriptions and the publish entry point.
#[derive(Default)]
pub struct Dispatcher {
    subscriptions: Mutex<Vec<Subscription>>,
}

impl Dispatcher {
    /// An empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, name: &str, filter: EventFilter, sink: Sink) {
        let mut subs = self.subscriptions.lock().unwrap_or_else(PoisonError::into_inner);
        if subs.iter().any(|s| s.name == name) {
            log::warn!("Subscriber '{}' registered twice; both receive events", name);
        }
        subs.push(Subscription {
            name: name.to_string(),
            filter,
            sink,
        });
        log::info!("Subscriber '{}' registered", name);
    }

    /// Registers a callback subscriber.
    pub fn subscribe<F>(&self, name: &str, filter: EventFilter, handler: F)
    where
        F: Fn(Arc<StreamEvent>) + Send + Sync + 'static,
    {
        self.register(name, filter, Sink::Callback(Arc::new(handler)));
    }

    /// Registers a channel subscriber and returns its receiving half.
    ///
    /// Dropping the receiver unsubscribes on the next publish.
    pub fn subscribe_channel(&self, name: &str, filter: EventFilter) -> mpsc::UnboundedReceiver<Arc<StreamEvent>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.register(name, filter, Sink::Channel(tx));
        rx
    }

    /// Removes every subscription registered under `name`. Returns whether any existed.
    pub fn unsubscribe(&self, name: &str) -> bool {
        let mut subs = self.subscriptions.lock().unwrap_or_else(PoisonError::into_inner);
        let before = subs.len();
        subs.retain(|s| s.name != name);
        let removed = subs.len() != before;
        if removed {
            log::info!("Subscriber '{}' removed", name);
        }
        removed
    }

    /// Names of the current subscriptions, in registration order.
    pub fn subscriber_names(&self) -> Vec<String> {
        let subs = self.subscriptions.lock().unwrap_or_else(PoisonError::into_inner);
        subs.iter().map(|s| s.name.clone()).collect()
    }

    /// Delivers `event` to every subscriber whose filter accepts it.
    /// Returns the number of subscribers reached.
    pub fn publish(&self, event: StreamEvent) -> usize {
        let kind = event.kind();
        let event = Arc::new(event);

        let targets: Vec<Subscription> = {
            let subs = self.subscriptions.lock().unwrap_or_else(PoisonError::into_inner);
            subs.iter().filter(|s| s.filter.accepts(kind)).cloned().collect()
        };

        let mut delivered = 0;
        let mut disconnected = Vec::new();
        for sub in targets {
            match &sub.sink {
                Sink::Callback(handler) => {
                    handler(Arc::clone(&event));
                    delivered += 1;
                }
                Sink::Channel(tx) => {
                    if tx.send(Arc::clone(&event)).is_ok() {
                        delivered += 1;
                    } else {
                        disconnected.push(sub.name);
                    }
                }
            }
        }

        if !disconnected.is_empty() {
            let mut subs = self.subscriptions.lock().unwrap_or_else(PoisonError::into_inner);
            subs.retain(|s| match &s.sink {
                Sink::Channel(tx) if tx.is_closed() => {
                    log::info!("Subscriber '{}' disconnected. Removing from dispatcher.", s.name);
                    false
                }
                _ => true,
            });
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn delta(subject: &str) -> StreamEvent {
        StreamEvent::Stream(StreamDelta {
            new_records: vec![ItemRecord::with_id("t1_x")],
            subject: Subject::from(subject),
            item_type: ItemType::Comment,
            cache_size: 1,
        })
    }

    fn failure() -> StreamEvent {
        StreamEvent::FetchFailed(FetchFailure {
            subject: Subject::from("rust"),
            item_type: ItemType::Post,
            reason: "timeout".into(),
        })
    }

    #[test]
    fn filters_by_event_kind() {
        let dispatcher = Dispatcher::new();
        let streams = Arc::new(AtomicUsize::new(0));
        let everything = Arc::new(AtomicUsize::new(0));

        let s = Arc::clone(&streams);
        dispatcher.subscribe("ingester", EventFilter::only([EventKind::Stream]), move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });
        let e = Arc::clone(&everything);
        dispatcher.subscribe("audit", EventFilter::All, move |_| {
            e.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(dispatcher.publish(delta("rust")), 2);
        assert_eq!(dispatcher.publish(failure()), 1);
        assert_eq!(streams.load(Ordering::SeqCst), 1);
        assert_eq!(everything.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unsubscribe_by_name() {
        let dispatcher = Dispatcher::new();
        let _rx = dispatcher.subscribe_channel("tuner", EventFilter::only([EventKind::Stream]));
        assert_eq!(dispatcher.subscriber_names(), vec!["tuner".to_string()]);
        assert!(dispatcher.unsubscribe("tuner"));
        assert!(!dispatcher.unsubscribe("tuner"));
        assert_eq!(dispatcher.publish(delta("rust")), 0);
    }

    #[test]
    fn channel_subscriber_gets_its_own_triple() {
        let dispatcher = Dispatcher::new();
        let mut rx = dispatcher.subscribe_channel("sink", EventFilter::All);
        dispatcher.publish(delta("rust"));
        dispatcher.publish(delta("golang"));

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        match (&*first, &*second) {
            (StreamEvent::Stream(a), StreamEvent::Stream(b)) => {
                assert_eq!(a.subject.as_str(), "rust");
                assert_eq!(b.subject.as_str(), "golang");
            }
            other => panic!("unexpected events {:?}", other),
        }
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let dispatcher = Dispatcher::new();
        let rx = dispatcher.subscribe_channel("gone", EventFilter::All);
        drop(rx);
        assert_eq!(dispatcher.publish(delta("rust")), 0);
        assert!(dispatcher.subscriber_names().is_empty());
    }

    #[test]
    fn handler_may_unsubscribe_itself() {
        let dispatcher = Arc::new(Dispatcher::new());
        let inner = Arc::clone(&dispatcher);
        dispatcher.subscribe("once", EventFilter::All, move |_| {
            inner.unsubscribe("once");
        });
        assert_eq!(dispatcher.publish(delta("rust")), 1);
        assert_eq!(dispatcher.publish(delta("rust")), 0);
    }

    #[test]
    fn parses_string_filters() {
        assert_eq!(EventFilter::parse("all").unwrap(), EventFilter::All);
        let filter = EventFilter::parse("stream, plan_swapped").unwrap();
        assert!(filter.accepts(EventKind::Stream));
        assert!(filter.accepts(EventKind::PlanSwapped));
        assert!(!filter.accepts(EventKind::FetchFailed));
        assert!(EventFilter::parse("preload").is_err());
    }
}
