//! # Rate Scheduler
//!
//! Decides in which second of the minute every `(subject, item type)` feed is
//! polled, under a single global requests-per-minute quota.
//!
//! ## Phases
//!
//! - **Bootstrapping**: the quota is split evenly (posts 25%, comments 75%, minus
//!   a 5% safety margin each) across all subjects. While that plan runs, every
//!   executed poll is fed back through [`RateScheduler::observe`] and the number of
//!   fresh records per feed is accumulated.
//! - **SteadyState**: once every event of the bootstrap plan has been observed
//!   once, demand is recomputed from the observed volume and a new plan is sent
//!   through the retune channel. This happens exactly once.
//!
//! ## Bucket assignment
//!
//! For each type, `frequency = ceil(60 / total requests)` gives the spacing of
//! the trigger seconds `frequency, 2*frequency, .. <= 60`. Subjects are walked
//! back to front, round-robin, each placing one post and one comment event per
//! pass on the next trigger second of that type (wrapping at the end of the
//! list) until their demand is used up. A type's cursor only moves when an event
//! of that type is placed.

use std::collections::BTreeMap;

use tokio::sync::{mpsc, oneshot};

use crate::configs::QuotaConfig;
use crate::core::dispatcher::StreamEvent;
use crate::core::model::{
    validate_subjects, BucketPlan, Demand, ItemType, PollEvent, Subject, SECONDS_IN_MINUTE,
};
use crate::error::{StreamerError, StreamerResult};

/// One executed poll as seen by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// The polled subject.
    pub subject: Subject,
    /// The polled listing.
    pub item_type: ItemType,
    /// Fresh records the poll produced (zero for a failed poll).
    pub record_count: u32,
}

impl Observation {
    /// Maps stream and fetch-failure events to observations; other events yield `None`.
    pub fn from_event(event: &StreamEvent) -> Option<Self> {
        match event {
            StreamEvent::Stream(delta) => Some(Self {
                subject: delta.subject.clone(),
                item_type: delta.item_type,
                record_count: u32::try_from(delta.new_records.len()).unwrap_or(u32::MAX),
            }),
            StreamEvent::FetchFailed(failure) => Some(Self {
                subject: failure.subject.clone(),
                item_type: failure.item_type,
                record_count: 0,
            }),
            StreamEvent::PlanSwapped(_) => None,
        }
    }
}

/// The steady-state plan and the demand it was built from.
#[derive(Debug, Clone)]
pub struct Retune {
    /// Plan to run from now on.
    pub plan: BucketPlan,
    /// Requests per minute per feed behind `plan`.
    pub demand: Demand,
}

/// Public view of the scheduler's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunerPhase {
    /// The even-split plan is running and yield is being observed.
    Bootstrapping,
    /// Demand has been recalibrated; no further tuning happens.
    SteadyState,
}

enum Phase {
    Bootstrapping {
        observed: Demand,
        seen: usize,
        expected: usize,
    },
    SteadyState {
        demand: Demand,
    },
}

/// # Rate Scheduler
///
/// Owns demand and the bootstrap counters. Meant to be owned by a single task
/// (see [`RateScheduler::run`]); every mutation goes through `&mut self`, so the
/// completion check can never fire twice.
pub struct RateScheduler {
    subjects: Vec<Subject>,
    quota: QuotaConfig,
    phase: Phase,
    retune_tx: Option<oneshot::Sender<Retune>>,
    retune_registered: bool,
}

impl RateScheduler {
    /// Creates a scheduler in the Bootstrapping phase with zeroed demand.
    pub fn new(subjects: Vec<Subject>, quota: QuotaConfig) -> StreamerResult<Self> {
        validate_subjects(&subjects)?;
        quota.validate()?;
        let observed = Demand::uniform(&subjects, 0, 0);
        Ok(Self {
            subjects,
            quota,
            phase: Phase::Bootstrapping {
                observed,
                seen: 0,
                expected: 0,
            },
            retune_tx: None,
            retune_registered: false,
        })
    }

    /// The configured subjects, in order.
    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    /// Current phase.
    pub fn phase(&self) -> TunerPhase {
        match self.phase {
            Phase::Bootstrapping { .. } => TunerPhase::Bootstrapping,
            Phase::SteadyState { .. } => TunerPhase::SteadyState,
        }
    }

    /// Demand computed at the end of tuning, once in SteadyState.
    pub fn steady_demand(&self) -> Option<&Demand> {
        match &self.phase {
            Phase::SteadyState { demand } => Some(demand),
            Phase::Bootstrapping { .. } => None,
        }
    }

    /// Events that make up one full tuning cycle (zero before `initial_plan`).
    pub fn expected_events(&self) -> usize {
        match self.phase {
            Phase::Bootstrapping { expected, .. } => expected,
            Phase::SteadyState { .. } => 0,
        }
    }

    /// Even-split demand for the bootstrap plan.
    ///
    /// A type whose floor share per subject is zero is simply not polled while
    /// bootstrapping; the retune floor gives it one request per minute later.
    /// Fails only when nothing at all would be polled, since tuning could then
    /// never complete.
    pub fn initial_demand(&self) -> StreamerResult<Demand> {
        let subjects = self.subjects.len();
        let per_subject = |item_type: ItemType| -> u32 {
            let share = self.quota.requests_per_minute(item_type) / subjects as u32;
            if share == 0 {
                log::warn!(
                    "Quota of {} requests/min leaves no bootstrap {} polls for {} subjects",
                    self.quota.max_requests_per_minute,
                    item_type,
                    subjects
                );
            }
            share
        };
        let demand = Demand::uniform(&self.subjects, per_subject(ItemType::Post), per_subject(ItemType::Comment));
        if demand.total() == 0 {
            return Err(StreamerError::QuotaTooSmall {
                quota: self.quota.max_requests_per_minute,
                subjects,
            });
        }
        Ok(demand)
    }

    /// Builds the bootstrap plan and (re)starts the tuning cycle.
    pub fn initial_plan(&mut self) -> StreamerResult<BucketPlan> {
        let demand = self.initial_demand()?;
        let plan = assign_buckets(&demand);
        self.phase = Phase::Bootstrapping {
            observed: Demand::uniform(&self.subjects, 0, 0),
            seen: 0,
            expected: demand.total() as usize,
        };
        log::info!(
            "Bootstrap plan ready: {} events per minute over {} subjects",
            plan.total_events(),
            self.subjects.len()
        );
        Ok(plan)
    }

    /// Registers the one-shot channel that receives the steady-state plan.
    pub fn on_retuned(&mut self) -> StreamerResult<oneshot::Receiver<Retune>> {
        if self.retune_registered {
            return Err(StreamerError::RetuneAlreadyRegistered);
        }
        let (tx, rx) = oneshot::channel();
        self.retune_tx = Some(tx);
        self.retune_registered = true;
        Ok(rx)
    }

    /// Feeds back one executed poll.
    ///
    /// Returns `true` on the call that completed the tuning cycle. Calls made in
    /// SteadyState are ignored.
    pub fn observe(&mut self, subject: &Subject, item_type: ItemType, record_count: u32) -> StreamerResult<bool> {
        let Phase::Bootstrapping { observed, seen, expected } = &mut self.phase else {
            log::trace!("Ignoring {} observation for '{}' after tuning", item_type, subject);
            return Ok(false);
        };

        let counts = observed.get_mut(subject).ok_or_else(|| StreamerError::UnknownSubject {
            subject: subject.to_string(),
            item_type,
        })?;
        let slot = counts.get_mut(item_type);
        *slot = slot.saturating_add(record_count);
        *seen += 1;

        if *seen != *expected {
            return Ok(false);
        }

        let expected = *expected;
        let demand = recalibrate(&self.quota, observed);
        let plan = assign_buckets(&demand);
        log::info!(
            "Tuning complete after {} events: {} events per minute in steady state",
            expected,
            plan.total_events()
        );
        if demand.total() > self.quota.max_requests_per_minute {
            log::warn!(
                "Steady-state demand of {} requests/min exceeds the quota of {}",
                demand.total(),
                self.quota.max_requests_per_minute
            );
        }

        self.phase = Phase::SteadyState { demand: demand.clone() };
        match self.retune_tx.take() {
            Some(tx) => {
                if tx.send(Retune { plan, demand }).is_err() {
                    log::warn!("Retuned plan computed but nobody is waiting for it");
                }
            }
            None => log::warn!("Retuned plan computed without a registered receiver"),
        }
        Ok(true)
    }

    /// Drives the scheduler from a stream of observations until tuning completes.
    ///
    /// Returns the scheduler (now in SteadyState, unless the channel closed first).
    pub async fn run(mut self, mut observations: mpsc::UnboundedReceiver<Observation>) -> Self {
        while let Some(obs) = observations.recv().await {
            match self.observe(&obs.subject, obs.item_type, obs.record_count) {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => log::error!("Dropping observation: {}", e),
            }
        }
        self
    }
}

/// Observed per-cycle volume → requests per minute, with overflow head-room.
fn recalibrate(quota: &QuotaConfig, observed: &Demand) -> Demand {
    let mut demand = observed.clone();
    for subject in observed.subjects() {
        if let Some(counts) = demand.get_mut(subject) {
            counts.post = quota.requests_for_volume(counts.post);
            counts.comment = quota.requests_for_volume(counts.comment);
        }
    }
    demand
}

/// Spacing in seconds between polls of one type, `None` when nothing is scheduled.
pub fn frequency(total_requests: u32) -> Option<u8> {
    if total_requests == 0 {
        return None;
    }
    Some(u32::from(SECONDS_IN_MINUTE).div_ceil(total_requests) as u8)
}

/// `frequency, 2*frequency, ..` up to and including 60.
pub fn trigger_seconds(frequency: Option<u8>) -> Vec<u8> {
    match frequency {
        Some(f) if f > 0 => (f..=SECONDS_IN_MINUTE).step_by(usize::from(f)).collect(),
        _ => Vec::new(),
    }
}

/// Round-robin cursor over one type's trigger seconds.
struct Cursor<'a> {
    triggers: &'a [u8],
    next: usize,
}

impl<'a> Cursor<'a> {
    fn new(triggers: &'a [u8]) -> Self {
        Self { triggers, next: 0 }
    }

    fn take(&mut self) -> Option<u8> {
        let second = *self.triggers.get(self.next)?;
        self.next += 1;
        if self.next == self.triggers.len() {
            self.next = 0;
        }
        Some(second)
    }
}

/// Spreads `demand` over the minute. Every feed appears exactly as many times as
/// its demand, only on its type's trigger seconds.
pub fn assign_buckets(demand: &Demand) -> BucketPlan {
    let post_triggers = trigger_seconds(frequency(demand.total_for(ItemType::Post)));
    let comment_triggers = trigger_seconds(frequency(demand.total_for(ItemType::Comment)));

    log::info!(
        "Post frequency: {:?}s, post buckets: {}, max per subject: {}",
        frequency(demand.total_for(ItemType::Post)),
        post_triggers.len(),
        demand.max_for(ItemType::Post)
    );
    log::info!(
        "Comment frequency: {:?}s, comment buckets: {}, max per subject: {}",
        frequency(demand.total_for(ItemType::Comment)),
        comment_triggers.len(),
        demand.max_for(ItemType::Comment)
    );

    let mut buckets: BTreeMap<u8, Vec<PollEvent>> = post_triggers
        .iter()
        .chain(comment_triggers.iter())
        .map(|s| (*s, Vec::new()))
        .collect();

    let mut remaining = demand.clone();
    let mut rotation: Vec<Subject> = demand.subjects().to_vec();
    let mut cursors = [Cursor::new(&post_triggers), Cursor::new(&comment_triggers)];

    while !rotation.is_empty() {
        for index in (0..rotation.len()).rev() {
            let subject = &rotation[index];
            let Some(counts) = remaining.get_mut(subject) else {
                rotation.remove(index);
                continue;
            };
            for (item_type, cursor) in ItemType::ALL.into_iter().zip(cursors.iter_mut()) {
                let left = counts.get_mut(item_type);
                if *left == 0 {
                    continue;
                }
                // A positive total always yields at least one trigger second.
                if let Some(second) = cursor.take() {
                    buckets.entry(second).or_default().push(PollEvent {
                        subject: subject.clone(),
                        item_type,
                    });
                }
                *left -= 1;
            }
            if counts.is_exhausted() {
                rotation.remove(index);
            }
        }
    }

    log::debug!("Scheduler buckets: {:?}", buckets);
    BucketPlan::from_buckets(buckets)
}
