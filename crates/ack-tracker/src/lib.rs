//! Acknowledgement-tracking core for a log pipeline.
//!
//! A tracker sits between a log source and the downstream destinations it
//! feeds: the source calls `request_bookmark`/`track` for every message it
//! reads, and gets back a [`Ticket`]; once a destination has finished with
//! that message (successfully, with back-pressure, or by discarding it), it
//! calls `ack` with the matching ticket. What happens between those two
//! calls — whether and when the message's position gets persisted, how
//! source holds are managed, how flow control is adjusted — is exactly
//! what differs across the four variants in this crate.

mod batch_accumulator;
mod batched;
mod bookmarkless;
mod config;
mod consecutive;
mod error;
mod instant;
mod source;
#[cfg(any(test, feature = "test-util"))]
pub mod test_support;

pub use batched::{BatchedAckTracker, BatchedAckTrackerBuilder, OnBatchAcked};
pub use bookmarkless::BookmarklessInstantAckTracker;
pub use config::{BatchConfig, RingConfig};
pub use consecutive::ConsecutiveAckTracker;
pub use error::TrackerError;
pub use instant::InstantAckTracker;
pub use source::{AckType, Source, SourceRef, Ticket};

use ack_ring::Bookmark;
use std::sync::Arc;

/// The four interchangeable tracker strategies behind one source-facing
/// contract. Dispatch is a tagged enum rather than a trait object: the
/// variants don't share enough of their internal shape (only `Consecutive`
/// holds a prefix-ordering invariant; only `Batched` owns a background
/// task) for a single v-table to pull its weight over a `match`.
pub enum AckTracker {
    Instant(InstantAckTracker),
    BookmarklessInstant(BookmarklessInstantAckTracker),
    Consecutive(ConsecutiveAckTracker),
    Batched(BatchedAckTracker),
}

impl AckTracker {
    pub fn instant(source: Arc<dyn Source>) -> Self {
        AckTracker::Instant(InstantAckTracker::new(source))
    }

    pub fn bookmarkless_instant(source: Arc<dyn Source>) -> Self {
        AckTracker::BookmarklessInstant(BookmarklessInstantAckTracker::new(source))
    }

    /// Picks a static or dynamic record container internally, based on
    /// `source.is_dynamic_window()`.
    pub fn consecutive(source: Arc<dyn Source>, ring: RingConfig) -> Self {
        AckTracker::Consecutive(ConsecutiveAckTracker::new(source, ring))
    }

    /// Spawns the batch owner task; see [`BatchedAckTracker::new`] for the
    /// runtime requirement this carries.
    pub fn batched(source: Arc<dyn Source>, config: BatchConfig, on_batch_acked: OnBatchAcked) -> Self {
        AckTracker::Batched(BatchedAckTracker::new(source, config, on_batch_acked))
    }

    pub fn init(&mut self) -> bool {
        match self {
            AckTracker::Instant(t) => t.init(),
            AckTracker::BookmarklessInstant(t) => t.init(),
            AckTracker::Consecutive(t) => t.init(),
            AckTracker::Batched(t) => t.init(),
        }
    }

    pub fn request_bookmark(&mut self) -> Option<&mut Bookmark> {
        match self {
            AckTracker::Instant(t) => t.request_bookmark(),
            AckTracker::BookmarklessInstant(t) => t.request_bookmark(),
            AckTracker::Consecutive(t) => t.request_bookmark(),
            AckTracker::Batched(t) => t.request_bookmark(),
        }
    }

    /// # Panics
    ///
    /// Panics if called without a preceding, still-pending `request_bookmark`
    /// (every variant enforces this the same way).
    pub fn track(&mut self) -> Ticket {
        match self {
            AckTracker::Instant(t) => t.track(),
            AckTracker::BookmarklessInstant(t) => t.track(),
            AckTracker::Consecutive(t) => t.track(),
            AckTracker::Batched(t) => t.track(),
        }
    }

    pub fn ack(&self, ticket: Ticket, ack_type: AckType) {
        match self {
            AckTracker::Instant(t) => t.ack(ticket, ack_type),
            AckTracker::BookmarklessInstant(t) => t.ack(ticket, ack_type),
            AckTracker::Consecutive(t) => t.ack(ticket, ack_type),
            AckTracker::Batched(t) => t.ack(ticket, ack_type),
        }
    }

    pub fn deinit(&mut self) {
        match self {
            AckTracker::Instant(t) => t.deinit(),
            AckTracker::BookmarklessInstant(t) => t.deinit(),
            AckTracker::Consecutive(t) => t.deinit(),
            AckTracker::Batched(t) => t.deinit(),
        }
    }

    /// Only `Consecutive` ever saves out of order in the first place; a
    /// no-op on the other three.
    pub fn disable_bookmark_saving(&self) {
        if let AckTracker::Consecutive(t) = self {
            t.disable_bookmark_saving();
        }
    }

    /// Only `Consecutive` holds anything back to empty out of; a no-op on
    /// the other three.
    pub fn set_on_all_acked(&self, f: Box<dyn FnMut() + Send>) {
        if let AckTracker::Consecutive(t) = self {
            t.set_on_all_acked(f);
        }
    }

    /// `true` for the other three variants: they never hold a record back
    /// once it's acked, so there's nothing to be non-empty about.
    pub fn is_empty(&self) -> bool {
        match self {
            AckTracker::Consecutive(t) => t.is_empty(),
            AckTracker::Instant(_) | AckTracker::BookmarklessInstant(_) | AckTracker::Batched(_) => true,
        }
    }
}
