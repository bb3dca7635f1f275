//! Deterministic simulation testing for `ack-tracker`: drives randomized ack
//! interleavings through a seeded RNG and checks the universal properties
//! every variant must uphold regardless of arrival order (every tracked
//! message eventually returns exactly one flow-control credit and releases
//! exactly one source hold, no matter what order acks arrive in or from how
//! many threads).
//!
//! Seeded with `rand`'s `SmallRng` so a failing trial is always
//! reproducible from its seed alone.

use ack_tracker::test_support::RecordingSource;
use ack_tracker::{AckTracker, AckType, BatchConfig, RingConfig, Source, Ticket};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Totals observed after a trial: every tracked message should contribute
/// exactly one credit and exactly one source release, regardless of how the
/// acks were interleaved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialReport {
    pub message_count: u32,
    pub credits: u64,
    pub refcount: i64,
}

impl TrialReport {
    pub fn holds_universal_properties(&self) -> bool {
        self.credits == u64::from(self.message_count) && self.refcount == 0
    }
}

/// Tracks `message_count` messages then acks them in an order shuffled by
/// `seed`, independent of the tracker variant's internal ordering
/// guarantees — every variant must return all its credits and references
/// under this regardless of whether it also happens to persist in order.
///
/// Async because the batched variant's bookkeeping completes on its
/// background owner task, not synchronously inside `ack`/`deinit`: a
/// flushed-early batch takes a source hold via `request_restart_timer` that
/// only the owner task's `restart_notify` arm releases, and `deinit` doesn't
/// wait for that task to run. Must be driven from within a Tokio runtime
/// whose owner task actually gets polled (a real `#[tokio::test]`, not a
/// synchronous function called from one).
pub async fn run_trial(seed: u64, message_count: u32, mut tracker: AckTracker, source: &Arc<RecordingSource>) -> TrialReport {
    let mut rng = SmallRng::seed_from_u64(seed);

    let mut tickets: Vec<Ticket> = Vec::with_capacity(message_count as usize);
    for _ in 0..message_count {
        tracker
            .request_bookmark()
            .expect("trial window sized to avoid back-pressure");
        tickets.push(tracker.track());
    }

    tickets.shuffle(&mut rng);

    for ticket in tickets {
        // A small, fixed chance of an abort keeps the trial honest about
        // the "no save on Aborted" property without dominating the run.
        let ack_type = if rng.gen_bool(0.1) {
            AckType::Aborted
        } else if rng.gen_bool(0.05) {
            AckType::Suspended
        } else {
            AckType::Processed
        };
        tracker.ack(ticket, ack_type);
    }

    tracker.deinit();
    drop(tracker);

    // Give the batched variant's owner task a chance to drain any pending
    // restart/destroy notifications (each a queued wake, not a real-time
    // event) before the counters below are read. A no-op for the other three
    // variants, which have no background task to wait on.
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }

    TrialReport {
        message_count,
        credits: source.credits(),
        refcount: source.refcount(),
    }
}

pub fn consecutive_tracker(window: usize) -> (AckTracker, Arc<RecordingSource>) {
    let source = Arc::new(RecordingSource::new());
    let tracker = AckTracker::consecutive(Arc::clone(&source) as Arc<dyn Source>, RingConfig::new(window));
    (tracker, source)
}

pub fn instant_tracker() -> (AckTracker, Arc<RecordingSource>) {
    let source = Arc::new(RecordingSource::new());
    let tracker = AckTracker::instant(Arc::clone(&source) as Arc<dyn Source>);
    (tracker, source)
}

pub fn bookmarkless_instant_tracker() -> (AckTracker, Arc<RecordingSource>) {
    let source = Arc::new(RecordingSource::new());
    let tracker = AckTracker::bookmarkless_instant(Arc::clone(&source) as Arc<dyn Source>);
    (tracker, source)
}

/// Must be called from within a Tokio runtime: the batched tracker spawns
/// its owner task at construction time.
pub fn batched_tracker(batch_size: usize) -> (AckTracker, Arc<RecordingSource>) {
    let source = Arc::new(RecordingSource::new());
    let config = BatchConfig::new(batch_size, std::time::Duration::from_millis(50))
        .expect("non-zero batch size in every trial constructor here");
    let tracker = AckTracker::batched(Arc::clone(&source) as Arc<dyn Source>, config, Box::new(|_| {}));
    (tracker, source)
}
