//! The external interface a log source must expose to its tracker, and the
//! owned "in-flight" handle that models the reference it holds while a
//! message is outstanding.

use ack_ring::PersistHandle;
use std::sync::Arc;

/// How downstream finished with a tracked message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckType {
    /// Normal success. The bookmark will eventually be saved.
    Processed,
    /// Like `Processed`, but the source should enter a suspended state
    /// (no new fetches until explicitly resumed).
    Suspended,
    /// The message is discarded without persisting its bookmark.
    Aborted,
}

/// Opaque per-message ticket handed back by `AckTracker::track` and
/// consumed by the matching `AckTracker::ack`. Tickets are assigned in
/// track order and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub(crate) u64);

/// The log source a tracker is attached to (1:1). Transport I/O and window
/// sizing live entirely on the source's side of this boundary; the tracker
/// only calls back through it.
pub trait Source: Send + Sync {
    /// Returns `credits` flow-control credits for new reads.
    fn flow_control_adjust(&self, credits: u32);
    /// Like `flow_control_adjust`, used on the suspended path.
    fn flow_control_adjust_when_suspended(&self, credits: u32);
    /// Enters the suspended state: no new fetches until explicitly resumed.
    fn flow_control_suspend(&self);
    /// The source's current flow-control window size.
    fn window_size(&self) -> u32;
    /// Whether the window may grow at runtime (selects static vs. dynamic
    /// container for the `Consecutive` variant).
    fn is_dynamic_window(&self) -> bool;
    /// Opaque handle into the persistent-state store, stamped into
    /// bookmarks by `track`.
    fn persist_state(&self) -> PersistHandle;
    /// Increments the source's reference count.
    fn incref(&self);
    /// Decrements the source's reference count. Returns `true` if it
    /// dropped to zero.
    fn decref(&self) -> bool;
}

/// An owned hold on a source, taken by `track` and released by `ack` —
/// exactly once, matching the "one track, one ack" contract. Wraps the
/// source's `incref`/`decref` as an RAII guard so the tracker never has to
/// reason about the raw counter directly.
pub struct SourceRef {
    source: Arc<dyn Source>,
    released: bool,
}

impl SourceRef {
    pub fn new(source: Arc<dyn Source>) -> Self {
        source.incref();
        Self {
            source,
            released: false,
        }
    }

    pub fn source(&self) -> &Arc<dyn Source> {
        &self.source
    }

    /// Releases the hold, returning `true` if this was the last reference
    /// (the source has fully torn down).
    pub fn release(mut self) -> bool {
        self.released = true;
        self.source.decref()
    }
}

impl Drop for SourceRef {
    fn drop(&mut self) {
        if !self.released {
            self.source.decref();
        }
    }
}
