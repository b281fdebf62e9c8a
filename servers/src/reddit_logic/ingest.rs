use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lib_streamer::core::{EventFilter, StreamEvent};
use lib_streamer::RedditStreamer;

pub const INGEST_SUBSCRIBER: &str = "ingest";

/// Running totals of what the ingest subscriber has seen.
#[derive(Debug, Default)]
pub struct IngestStats {
    pub records: AtomicU64,
    pub failures: AtomicU64,
    pub swaps: AtomicU64,
}

impl IngestStats {
    pub fn summary(&self) -> String {
        format!(
            "{} records, {} failed polls, {} plan swaps",
            self.records.load(Ordering::Relaxed),
            self.failures.load(Ordering::Relaxed),
            self.swaps.load(Ordering::Relaxed)
        )
    }
}

/// Logs one event and updates the running counts.
pub fn handle_event(stats: &IngestStats, event: &StreamEvent) {
    match event {
        StreamEvent::Stream(delta) => {
            if delta.new_records.is_empty() {
                return;
            }
            stats.records.fetch_add(delta.new_records.len() as u64, Ordering::Relaxed);
            log::info!(
                "r/{}: {} new {} records",
                delta.subject,
                delta.new_records.len(),
                delta.item_type
            );
            for record in &delta.new_records {
                match serde_json::to_string(record) {
                    Ok(line) => log::trace!("{}", line),
                    Err(e) => log::warn!("Could not serialize record {}: {}", record.id, e),
                }
            }
        }
        StreamEvent::FetchFailed(failure) => {
            stats.failures.fetch_add(1, Ordering::Relaxed);
            log::debug!("r/{} {} poll failed: {}", failure.subject, failure.item_type, failure.reason);
        }
        StreamEvent::PlanSwapped(swap) => {
            stats.swaps.fetch_add(1, Ordering::Relaxed);
            log::info!(
                "Steady-state plan active: {} polls per minute ({})",
                swap.events_per_minute,
                swap.demand
            );
        }
    }
}

pub fn register(streamer: &RedditStreamer, filter: EventFilter) -> Arc<IngestStats> {
    let stats = Arc::new(IngestStats::default());
    let sink = Arc::clone(&stats);
    streamer.subscribe(INGEST_SUBSCRIBER, filter, move |event| handle_event(&sink, &event));
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_streamer::core::{Demand, FetchFailure, ItemRecord, ItemType, PlanSwap, StreamDelta, Subject};

    #[test]
    fn counts_records_failures_and_swaps() {
        let stats = IngestStats::default();
        let subject = Subject::from("rust");

        handle_event(
            &stats,
            &StreamEvent::Stream(StreamDelta {
                new_records: vec![ItemRecord::with_id("a"), ItemRecord::with_id("b")],
                subject: subject.clone(),
                item_type: ItemType::Post,
                cache_size: 2,
            }),
        );
        handle_event(
            &stats,
            &StreamEvent::FetchFailed(FetchFailure {
                subject: subject.clone(),
                item_type: ItemType::Comment,
                reason: "timeout".into(),
            }),
        );
        handle_event(
            &stats,
            &StreamEvent::PlanSwapped(PlanSwap {
                demand: Demand::uniform(&[subject], 1, 2),
                events_per_minute: 3,
            }),
        );

        assert_eq!(stats.summary(), "2 records, 1 failed polls, 1 plan swaps");
    }
}
