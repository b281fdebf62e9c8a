//! # Reddit Streamer
//!
//! The clock-driven ingestor. Every second it looks up the active plan's events
//! for the current second, fires one fetch per event, strips records that were
//! already seen and publishes what is left.
//!
//! ## Key Design Principles:
//! - **Single Owner**: the streamer loop is the only writer of the dedup cache,
//!   the active plan and the event stream. Fetches run as independent tasks and
//!   hand their results back over a channel; they never touch shared state.
//! - **Non-blocking Tick**: a tick only spawns fetches. Results arrive whenever
//!   the network returns them and are handled between ticks, each carrying its
//!   own subject/type so subscribers never see cross-event data.
//! - **Generations**: every installed plan gets a generation number and a
//!   `CancellationToken`. Installing a new plan cancels the old token; results
//!   tagged with an old generation are dropped instead of published.
//! - **One-shot Retune**: during bootstrap the `RateScheduler` listens to the
//!   stream through the `"tuner"` subscription. When its channel delivers the
//!   steady-state plan the subscription is removed and the plan is swapped in
//!   between two ticks.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::configs::StreamerSettings;
use crate::core::dedup_cache::DedupCache;
use crate::core::dispatcher::{
    Dispatcher, EventFilter, EventKind, FetchFailure, PlanSwap, StreamDelta, StreamEvent,
};
use crate::core::fetch::FetchClient;
use crate::core::model::{validate_subjects, BucketPlan, ItemRecord, ItemType, PollEvent, SecondCounter, Subject};
use crate::core::scheduler::{Observation, RateScheduler, Retune};
use crate::error::{StreamerError, StreamerResult};

/// Name of the bootstrap-only subscription that feeds the scheduler.
pub const TUNER_SUBSCRIBER: &str = "tuner";

/// Result of one spawned fetch, tagged with the plan generation it was fired under.
struct FetchOutcome {
    generation: u64,
    event: PollEvent,
    result: StreamerResult<Vec<ItemRecord>>,
}

struct ActivePlan {
    plan: BucketPlan,
    generation: u64,
    cancel: CancellationToken,
}

/// # Reddit Streamer
pub struct RedditStreamer {
    subjects: Vec<Subject>,
    fetcher: Arc<dyn FetchClient>,
    cache: DedupCache,
    dispatcher: Arc<Dispatcher>,
    settings: StreamerSettings,
    counter: SecondCounter,
    active: Option<ActivePlan>,
    next_generation: u64,
    plan_swaps: usize,
    outcome_tx: mpsc::UnboundedSender<FetchOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<FetchOutcome>,
    in_flight: usize,
}

impl RedditStreamer {
    /// Creates a streamer for `subjects`. Fails on an empty or duplicated subject
    /// list and on an unusable quota.
    pub fn new(
        subjects: Vec<Subject>,
        fetcher: Arc<dyn FetchClient>,
        settings: StreamerSettings,
    ) -> StreamerResult<Self> {
        validate_subjects(&subjects)?;
        settings.validate()?;
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let counter = if settings.align_to_minute {
            SecondCounter::aligned_now()
        } else {
            SecondCounter::default()
        };
        Ok(Self {
            cache: DedupCache::new(&subjects),
            subjects,
            fetcher,
            dispatcher: Arc::new(Dispatcher::new()),
            settings,
            counter,
            active: None,
            next_generation: 0,
            plan_swaps: 0,
            outcome_tx,
            outcome_rx,
            in_flight: 0,
        })
    }

    /// The event dispatcher, for registering subscribers before `run` consumes the streamer.
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Registers a callback subscriber.
    pub fn subscribe<F>(&self, name: &str, filter: EventFilter, handler: F)
    where
        F: Fn(Arc<StreamEvent>) + Send + Sync + 'static,
    {
        self.dispatcher.subscribe(name, filter, handler);
    }

    /// Removes a subscriber by name.
    pub fn unsubscribe(&self, name: &str) -> bool {
        self.dispatcher.unsubscribe(name)
    }

    /// The dedup cache.
    pub fn cache(&self) -> &DedupCache {
        &self.cache
    }

    /// The configured subjects.
    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    /// The plan currently driving the clock.
    pub fn active_plan(&self) -> Option<&BucketPlan> {
        self.active.as_ref().map(|a| &a.plan)
    }

    /// How many times a retuned plan replaced the active one.
    pub fn plan_swaps(&self) -> usize {
        self.plan_swaps
    }

    /// The second the next tick will execute.
    pub fn current_second(&self) -> u8 {
        self.counter.current()
    }

    /// Fetches still running.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    fn batch_limit(&self, wanted: u32) -> u32 {
        wanted.min(self.fetcher.max_records_per_request()).max(1)
    }

    /// Makes `plan` the active plan. In-flight fetches of the previous plan are
    /// cancelled and their results ignored.
    pub fn install_plan(&mut self, plan: BucketPlan) -> StreamerResult<()> {
        plan.validate(&self.subjects)?;
        if let Some(previous) = self.active.take() {
            previous.cancel.cancel();
        }
        let generation = self.next_generation;
        self.next_generation += 1;
        log::info!(
            "Installing plan generation {} ({} events per minute)",
            generation,
            plan.total_events()
        );
        self.active = Some(ActivePlan {
            plan,
            generation,
            cancel: CancellationToken::new(),
        });
        Ok(())
    }

    /// Seeds every feed's cache with one large fetch, without publishing.
    /// Returns the number of ids cached. A failed preload only leaves that feed
    /// without a baseline.
    pub async fn preload(&self) -> usize {
        log::info!("Preloading caches for {} subjects", self.subjects.len());
        let limit = self.batch_limit(self.settings.preload_limit);

        let per_subject = self.subjects.iter().map(|subject| async move {
            let mut cached = 0;
            for item_type in ItemType::ALL {
                match self.fetcher.fetch(item_type, subject, limit).await {
                    Ok(records) => {
                        let ids = records.iter().map(|r| r.id.as_str());
                        match self.cache.add_many(ids, subject, item_type) {
                            Ok(size) => {
                                log::debug!("Preloaded {} records ({} ~ {}) | Cache size: {}", records.len(), item_type, subject, size);
                                cached += size;
                            }
                            Err(e) => log::error!("Preload cache error: {}", e),
                        }
                    }
                    Err(e) => log::warn!("Preload of {} ~ {} failed: {}", item_type, subject, e),
                }
            }
            cached
        });

        join_all(per_subject).await.into_iter().sum()
    }

    /// One heartbeat: fires a fetch for every event scheduled in the current
    /// second, then advances the counter. Returns the number of fetches started.
    pub fn run_one_second_tick(&mut self) -> usize {
        let second = self.counter.advance();
        let Some(active) = &self.active else {
            return 0;
        };
        let events = active.plan.events_at(second);
        if events.is_empty() {
            return 0;
        }
        log::trace!("Second {}: firing {} fetches", second, events.len());

        let limit = self.batch_limit(self.settings.stream_limit);
        let timeout = self.settings.fetch_timeout();
        for event in events {
            let event = event.clone();
            let fetcher = Arc::clone(&self.fetcher);
            let tx = self.outcome_tx.clone();
            let cancel = active.cancel.clone();
            let generation = active.generation;
            tokio::spawn(async move {
                let result = tokio::select! {
                    _ = cancel.cancelled() => Err(StreamerError::Fetch {
                        subject: event.subject.to_string(),
                        item_type: event.item_type,
                        reason: "plan replaced".into(),
                    }),
                    res = tokio::time::timeout(timeout, fetcher.fetch(event.item_type, &event.subject, limit)) => {
                        res.unwrap_or_else(|_| Err(StreamerError::Timeout(timeout.as_secs())))
                    }
                };
                // The receiver lives as long as the streamer.
                let _ = tx.send(FetchOutcome { generation, event, result });
            });
        }
        self.in_flight += events.len();
        events.len()
    }

    fn handle_outcome(&mut self, outcome: FetchOutcome) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let FetchOutcome { generation, event, result } = outcome;

        let current = self.active.as_ref().map(|a| a.generation);
        if current != Some(generation) {
            log::debug!(
                "Dropping result of {} ~ {} from replaced plan generation {}",
                event.item_type,
                event.subject,
                generation
            );
            return;
        }

        match result {
            Ok(records) => match self.cache.filter_and_add(records, &event.subject, event.item_type) {
                Ok(filtered) => {
                    log::debug!(
                        "Streamed {} records ({} ~ {}) | Cache size: {}",
                        filtered.fresh.len(),
                        event.item_type,
                        event.subject,
                        filtered.cache_size
                    );
                    self.dispatcher.publish(StreamEvent::Stream(StreamDelta {
                        new_records: filtered.fresh,
                        subject: event.subject,
                        item_type: event.item_type,
                        cache_size: filtered.cache_size,
                    }));
                }
                Err(e) => log::error!("Cache rejected result: {}", e),
            },
            Err(e) => {
                log::warn!("Fetch {} ~ {} failed: {}", event.item_type, event.subject, e);
                self.dispatcher.publish(StreamEvent::FetchFailed(FetchFailure {
                    subject: event.subject,
                    item_type: event.item_type,
                    reason: e.to_string(),
                }));
            }
        }
    }

    /// Waits for every in-flight fetch and handles its result.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            match self.outcome_rx.recv().await {
                Some(outcome) => self.handle_outcome(outcome),
                None => break,
            }
        }
    }

    fn apply_retune(&mut self, retune: Retune) {
        self.dispatcher.unsubscribe(TUNER_SUBSCRIBER);
        let events_per_minute = retune.plan.total_events();
        match self.install_plan(retune.plan) {
            Ok(()) => {
                self.plan_swaps += 1;
                log::info!("Switched to steady-state plan: {}", retune.demand);
                self.dispatcher.publish(StreamEvent::PlanSwapped(PlanSwap {
                    demand: retune.demand,
                    events_per_minute,
                }));
            }
            Err(e) => log::error!("Rejected retuned plan, keeping the bootstrap plan: {}", e),
        }
    }

    /// Preloads the caches, hooks `tuner` to the stream, installs its bootstrap
    /// plan and returns the channel the steady-state plan will arrive on.
    pub async fn start(&mut self, mut tuner: RateScheduler) -> StreamerResult<oneshot::Receiver<Retune>> {
        if tuner.subjects() != self.subjects.as_slice() {
            return Err(StreamerError::Config(
                "scheduler and streamer were built for different subjects".into(),
            ));
        }
        let retuned = tuner.on_retuned()?;
        let plan = tuner.initial_plan()?;
        plan.validate(&self.subjects)?;

        self.preload().await;

        let (obs_tx, obs_rx) = mpsc::unbounded_channel();
        self.dispatcher.subscribe(
            TUNER_SUBSCRIBER,
            EventFilter::only([EventKind::Stream, EventKind::FetchFailed]),
            move |event| {
                if let Some(obs) = Observation::from_event(&event) {
                    // Closed once tuning is done; the subscription is removed right after.
                    let _ = obs_tx.send(obs);
                }
            },
        );
        tokio::spawn(tuner.run(obs_rx));

        self.install_plan(plan)?;
        Ok(retuned)
    }

    /// Runs the one-second clock until `shutdown` is cancelled, swapping in the
    /// steady-state plan when `retuned` delivers it.
    pub async fn drive(&mut self, mut retuned: oneshot::Receiver<Retune>, shutdown: CancellationToken) {
        let mut clock = tokio::time::interval(Duration::from_secs(1));
        clock.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut retune_pending = true;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                res = &mut retuned, if retune_pending => {
                    retune_pending = false;
                    match res {
                        Ok(retune) => self.apply_retune(retune),
                        Err(_) => {
                            log::warn!("Scheduler stopped before retuning; staying on the bootstrap plan");
                            self.dispatcher.unsubscribe(TUNER_SUBSCRIBER);
                        }
                    }
                }
                Some(outcome) = self.outcome_rx.recv() => self.handle_outcome(outcome),
                _ = clock.tick() => {
                    self.run_one_second_tick();
                }
            }
        }

        if let Some(active) = &self.active {
            active.cancel.cancel();
        }
        self.settle().await;
        log::info!("Streamer stopped");
    }

    /// `start` followed by `drive`: the full lifecycle.
    pub async fn run(mut self, tuner: RateScheduler, shutdown: CancellationToken) -> StreamerResult<()> {
        let retuned = self.start(tuner).await?;
        self.drive(retuned, shutdown).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configs::QuotaConfig;
    use crate::core::model::Demand;
    use crate::core::scheduler::assign_buckets;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns `per_call` never-seen records on every call.
    struct FreshFeed {
        per_call: usize,
        calls: AtomicUsize,
        fail_subject: Option<&'static str>,
        delay: Option<Duration>,
    }

    impl FreshFeed {
        fn new(per_call: usize) -> Self {
            Self {
                per_call,
                calls: AtomicUsize::new(0),
                fail_subject: None,
                delay: None,
            }
        }
    }

    #[async_trait]
    impl FetchClient for FreshFeed {
        async fn fetch(&self, item_type: ItemType, subject: &Subject, _limit: u32) -> StreamerResult<Vec<ItemRecord>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_subject == Some(subject.as_str()) {
                return Err(StreamerError::HttpStatus { status: 503, body: "busy".into() });
            }
            Ok((0..self.per_call)
                .map(|n| ItemRecord::with_id(format!("{}-{}-{}-{}", subject, item_type, call, n)))
                .collect())
        }
    }

    /// Always returns the same two records.
    struct FixedFeed;

    #[async_trait]
    impl FetchClient for FixedFeed {
        async fn fetch(&self, _item_type: ItemType, _subject: &Subject, _limit: u32) -> StreamerResult<Vec<ItemRecord>> {
            Ok(vec![ItemRecord::with_id("a"), ItemRecord::with_id("b")])
        }
    }

    fn subjects(names: &[&str]) -> Vec<Subject> {
        names.iter().map(|n| Subject::from(*n)).collect()
    }

    fn settings(quota: u32) -> StreamerSettings {
        StreamerSettings {
            quota: QuotaConfig::with_quota(quota),
            ..StreamerSettings::default()
        }
    }

    fn tick_until(streamer: &mut RedditStreamer, second: u8) {
        while streamer.current_second() != second {
            streamer.run_one_second_tick();
        }
        streamer.run_one_second_tick();
    }

    #[tokio::test]
    async fn duplicate_records_are_published_once() {
        let names = subjects(&["solo"]);
        let mut streamer = RedditStreamer::new(names.clone(), Arc::new(FixedFeed), settings(10)).unwrap();
        let mut rx = streamer.dispatcher().subscribe_channel("probe", EventFilter::only([EventKind::Stream]));
        let mut tuner = RateScheduler::new(names, QuotaConfig::with_quota(10)).unwrap();
        streamer.install_plan(tuner.initial_plan().unwrap()).unwrap();

        // 7 comments/min → frequency 9 → first comment poll at second 9.
        tick_until(&mut streamer, 9);
        streamer.settle().await;
        let first = rx.try_recv().unwrap();
        match &*first {
            StreamEvent::Stream(delta) => {
                assert_eq!(delta.item_type, ItemType::Comment);
                assert_eq!(delta.new_records.len(), 2);
                assert_eq!(delta.cache_size, 2);
            }
            other => panic!("unexpected {:?}", other),
        }

        tick_until(&mut streamer, 18);
        streamer.settle().await;
        match &*rx.try_recv().unwrap() {
            StreamEvent::Stream(delta) => assert!(delta.new_records.is_empty()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn preload_is_silent() {
        let names = subjects(&["a", "b"]);
        let streamer = RedditStreamer::new(names.clone(), Arc::new(FreshFeed::new(7)), settings(60)).unwrap();
        let mut rx = streamer.dispatcher().subscribe_channel("probe", EventFilter::All);

        assert_eq!(streamer.preload().await, 28);
        assert!(rx.try_recv().is_err());
        assert_eq!(streamer.cache().len(&names[1], ItemType::Comment).unwrap(), 7);
    }

    #[tokio::test]
    async fn failed_fetch_is_published_not_raised() {
        let names = subjects(&["broken"]);
        let feed = FreshFeed {
            fail_subject: Some("broken"),
            ..FreshFeed::new(1)
        };
        let mut streamer = RedditStreamer::new(names.clone(), Arc::new(feed), settings(10)).unwrap();
        let mut rx = streamer.dispatcher().subscribe_channel("probe", EventFilter::All);
        let mut tuner = RateScheduler::new(names, QuotaConfig::with_quota(10)).unwrap();
        streamer.install_plan(tuner.initial_plan().unwrap()).unwrap();

        tick_until(&mut streamer, 9);
        streamer.settle().await;
        assert!(matches!(&*rx.try_recv().unwrap(), StreamEvent::FetchFailed(f) if f.reason.contains("503")));
    }

    #[tokio::test(start_paused = true)]
    async fn results_from_a_replaced_plan_are_dropped() {
        let names = subjects(&["solo"]);
        let feed = FreshFeed {
            delay: Some(Duration::from_secs(5)),
            ..FreshFeed::new(3)
        };
        let mut streamer = RedditStreamer::new(names.clone(), Arc::new(feed), settings(10)).unwrap();
        let mut rx = streamer.dispatcher().subscribe_channel("probe", EventFilter::All);
        let mut tuner = RateScheduler::new(names, QuotaConfig::with_quota(10)).unwrap();
        let plan = tuner.initial_plan().unwrap();
        streamer.install_plan(plan.clone()).unwrap();

        tick_until(&mut streamer, 9);
        assert!(streamer.in_flight() > 0);
        streamer.install_plan(plan).unwrap();
        streamer.settle().await;

        assert_eq!(streamer.in_flight(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn start_rejects_a_scheduler_for_other_subjects() {
        let mut streamer = RedditStreamer::new(subjects(&["a"]), Arc::new(FixedFeed), settings(60)).unwrap();
        let tuner = RateScheduler::new(subjects(&["b"]), QuotaConfig::default()).unwrap();
        assert!(matches!(streamer.start(tuner).await, Err(StreamerError::Config(_))));
    }

    #[test]
    fn rejects_bad_configuration_up_front() {
        assert!(matches!(
            RedditStreamer::new(Vec::new(), Arc::new(FixedFeed), settings(60)),
            Err(StreamerError::NoSubjects)
        ));
        assert!(matches!(
            RedditStreamer::new(subjects(&["a"]), Arc::new(FixedFeed), settings(0)),
            Err(StreamerError::InvalidQuota(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn bootstrap_cycle_retunes_once_and_drops_the_tuner() {
        let names = subjects(&["a", "b", "c"]);
        let streamer = RedditStreamer::new(names.clone(), Arc::new(FreshFeed::new(10)), settings(60)).unwrap();
        let dispatcher = streamer.dispatcher();
        let mut rx = dispatcher.subscribe_channel("ingester", EventFilter::All);
        let tuner = RateScheduler::new(names.clone(), QuotaConfig::with_quota(60)).unwrap();

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(streamer.run(tuner, shutdown.clone()));

        let mut streams_before_swap = 0;
        let swap = loop {
            let event = tokio::time::timeout(Duration::from_secs(600), rx.recv())
                .await
                .unwrap()
                .unwrap();
            match &*event {
                StreamEvent::Stream(delta) => {
                    assert_eq!(delta.new_records.len(), 10);
                    streams_before_swap += 1;
                }
                StreamEvent::PlanSwapped(swap) => break swap.clone(),
                StreamEvent::FetchFailed(f) => panic!("unexpected failure {:?}", f),
            }
        };

        assert!(streams_before_swap >= 54);
        assert!(!dispatcher.subscriber_names().contains(&TUNER_SUBSCRIBER.to_string()));
        for subject in &names {
            // 4 posts * 10 = 40 → 1 request; 14 comments * 10 = 140 → 2 requests.
            let counts = swap.demand.get(subject).unwrap();
            assert_eq!(counts.post, 1);
            assert_eq!(counts.comment, 2);
        }
        assert_eq!(swap.events_per_minute, 9);

        // Another full minute on the new plan, then stop.
        let mut streams_after = 0;
        while streams_after < 9 {
            let event = rx.recv().await.unwrap();
            match &*event {
                StreamEvent::Stream(_) => streams_after += 1,
                StreamEvent::PlanSwapped(_) => panic!("plan swapped twice"),
                StreamEvent::FetchFailed(f) => panic!("unexpected failure {:?}", f),
            }
        }
        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }

    /// Starts a two-feed streamer but drives it on `retuned` instead of the
    /// scheduler's own channel, for two minutes. Returns the stopped streamer,
    /// everything "ingester" received and the subscribers left at the end.
    async fn drive_two_minutes_on(
        retuned: oneshot::Receiver<Retune>,
    ) -> (RedditStreamer, Vec<Arc<StreamEvent>>, Vec<String>) {
        let names = subjects(&["a", "b"]);
        let mut streamer = RedditStreamer::new(names.clone(), Arc::new(FreshFeed::new(3)), settings(60)).unwrap();
        let dispatcher = streamer.dispatcher();
        let mut rx = dispatcher.subscribe_channel("ingester", EventFilter::All);
        let tuner = RateScheduler::new(names, QuotaConfig::with_quota(60)).unwrap();
        drop(streamer.start(tuner).await.unwrap());
        assert!(dispatcher.subscriber_names().contains(&TUNER_SUBSCRIBER.to_string()));

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn({
            let shutdown = shutdown.clone();
            async move {
                streamer.drive(retuned, shutdown).await;
                streamer
            }
        });
        tokio::time::sleep(Duration::from_secs(120)).await;
        let subscribers = dispatcher.subscriber_names();
        shutdown.cancel();
        let streamer = handle.await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        (streamer, events, subscribers)
    }

    fn count_streams(events: &[Arc<StreamEvent>]) -> usize {
        events.iter().filter(|e| matches!(***e, StreamEvent::Stream(_))).count()
    }

    #[tokio::test(start_paused = true)]
    async fn closed_retune_channel_keeps_the_bootstrap_plan() {
        let (tx, rx) = oneshot::channel::<Retune>();
        drop(tx);

        let (streamer, events, subscribers) = drive_two_minutes_on(rx).await;

        assert_eq!(streamer.plan_swaps(), 0);
        assert!(!subscribers.contains(&TUNER_SUBSCRIBER.to_string()));
        assert!(subscribers.contains(&"ingester".to_string()));
        // 6 posts and 21 comments per feed: 54 events a minute, still polled
        // after the first cycle.
        assert_eq!(streamer.active_plan().unwrap().total_events(), 54);
        assert!(count_streams(&events) > 54);
        assert!(!events.iter().any(|e| matches!(**e, StreamEvent::PlanSwapped(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn retuned_plan_for_unknown_subject_is_rejected() {
        let demand = Demand::uniform(&subjects(&["stranger"]), 1, 1);
        let (tx, rx) = oneshot::channel();
        tx.send(Retune {
            plan: assign_buckets(&demand),
            demand,
        })
        .unwrap();

        let (streamer, events, subscribers) = drive_two_minutes_on(rx).await;

        assert_eq!(streamer.plan_swaps(), 0);
        assert!(!subscribers.contains(&TUNER_SUBSCRIBER.to_string()));
        assert_eq!(streamer.active_plan().unwrap().count_for(&Subject::from("stranger"), ItemType::Post), 0);
        assert_eq!(streamer.active_plan().unwrap().total_events(), 54);
        assert!(count_streams(&events) > 54);
        assert!(!events.iter().any(|e| matches!(**e, StreamEvent::PlanSwapped(_))));
    }
}
