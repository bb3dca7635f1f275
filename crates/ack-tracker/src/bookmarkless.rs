//! Bookmarkless-Instant — for sources that never need a bookmark at all.
//! No allocation, no save, no destroy.

use crate::source::{AckType, Source, SourceRef, Ticket};
use ack_ring::Bookmark;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A single embedded bookmark slot is reused for every message; its
/// contents are never read because nothing here ever calls `save`.
pub struct BookmarklessInstantAckTracker {
    source: Arc<dyn Source>,
    embedded: Bookmark,
    next_ticket: u64,
    in_flight: Mutex<HashMap<u64, SourceRef>>,
}

impl BookmarklessInstantAckTracker {
    pub fn new(source: Arc<dyn Source>) -> Self {
        Self {
            source,
            embedded: Bookmark::new(),
            next_ticket: 0,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn init(&mut self) -> bool {
        true
    }

    /// Always returns the same embedded slot.
    pub fn request_bookmark(&mut self) -> Option<&mut Bookmark> {
        Some(&mut self.embedded)
    }

    pub fn track(&mut self) -> Ticket {
        let source_ref = SourceRef::new(Arc::clone(&self.source));
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.in_flight.lock().unwrap().insert(ticket.0, source_ref);
        ticket
    }

    /// Returns one flow-control credit and releases the source hold. No
    /// persistence is ever performed.
    pub fn ack(&self, ticket: Ticket, ack_type: AckType) {
        let source_ref = self
            .in_flight
            .lock()
            .unwrap()
            .remove(&ticket.0)
            .expect("ack for a ticket that was never tracked");

        if ack_type == AckType::Suspended {
            self.source.flow_control_suspend();
            self.source.flow_control_adjust_when_suspended(1);
        } else {
            self.source.flow_control_adjust(1);
        }

        source_ref.release();
    }

    pub fn deinit(&mut self) {
        // Nothing to flush: no bookmarks were ever allocated.
    }
}
