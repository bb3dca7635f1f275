//! Shared test double for `Source`, used by every tracker variant's inline
//! tests and by the simulation crate (gated behind the `test-util` feature
//! there, since it lives in a separate crate).

use crate::source::Source;
use ack_ring::PersistHandle;
use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// A `Source` that records flow-control credits and reference-count
/// traffic instead of driving a real transport.
pub struct RecordingSource {
    credits: AtomicU64,
    suspended_credits: AtomicU64,
    refcount: AtomicI64,
    suspensions: AtomicU32,
    dynamic_window: bool,
}

impl RecordingSource {
    pub fn new() -> Self {
        Self {
            credits: AtomicU64::new(0),
            suspended_credits: AtomicU64::new(0),
            refcount: AtomicI64::new(0),
            suspensions: AtomicU32::new(0),
            dynamic_window: false,
        }
    }

    pub fn dynamic() -> Self {
        Self {
            dynamic_window: true,
            ..Self::new()
        }
    }

    /// Total credits returned via either flow-control path.
    pub fn credits(&self) -> u64 {
        self.credits.load(Ordering::SeqCst) + self.suspended_credits.load(Ordering::SeqCst)
    }

    pub fn refcount(&self) -> i64 {
        self.refcount.load(Ordering::SeqCst)
    }

    pub fn suspensions(&self) -> u32 {
        self.suspensions.load(Ordering::SeqCst)
    }
}

impl Source for RecordingSource {
    fn flow_control_adjust(&self, credits: u32) {
        self.credits.fetch_add(u64::from(credits), Ordering::SeqCst);
    }

    fn flow_control_adjust_when_suspended(&self, credits: u32) {
        self.suspended_credits
            .fetch_add(u64::from(credits), Ordering::SeqCst);
    }

    fn flow_control_suspend(&self) {
        self.suspensions.fetch_add(1, Ordering::SeqCst);
    }

    fn window_size(&self) -> u32 {
        1000
    }

    fn is_dynamic_window(&self) -> bool {
        self.dynamic_window
    }

    fn persist_state(&self) -> PersistHandle {
        Arc::new(())
    }

    fn incref(&self) {
        self.refcount.fetch_add(1, Ordering::SeqCst);
    }

    fn decref(&self) -> bool {
        self.refcount.fetch_sub(1, Ordering::SeqCst) == 1
    }
}
