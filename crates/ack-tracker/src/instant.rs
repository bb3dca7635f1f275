//! Instant — one message, one independent bookmark, persisted immediately
//! on ack.

use crate::source::{AckType, Source, SourceRef, Ticket};
use ack_ring::Bookmark;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

struct InFlight {
    bookmark: Bookmark,
    source_ref: SourceRef,
}

/// One message = one independently allocated, independently persisted
/// bookmark. No ordering is enforced between concurrently in-flight
/// messages.
///
/// `request_bookmark`/`track` are called only from the source's single
/// reader thread and so take `&mut self`; `ack` may arrive from any thread
/// and so takes `&self`, guarding its in-flight table with a mutex.
pub struct InstantAckTracker {
    source: Arc<dyn Source>,
    pending: Option<Bookmark>,
    next_ticket: u64,
    in_flight: Mutex<HashMap<u64, InFlight>>,
}

impl InstantAckTracker {
    pub fn new(source: Arc<dyn Source>) -> Self {
        Self {
            source,
            pending: None,
            next_ticket: 0,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn init(&mut self) -> bool {
        true
    }

    /// Lazily allocates a fresh record and returns its bookmark for the
    /// source to populate.
    pub fn request_bookmark(&mut self) -> Option<&mut Bookmark> {
        if self.pending.is_none() {
            self.pending = Some(Bookmark::new());
        }
        self.pending.as_mut()
    }

    /// Stamps persist-state into the bookmark, takes a hold on the source,
    /// and returns the ticket downstream will later `ack`.
    ///
    /// # Panics
    ///
    /// Panics if called without a preceding `request_bookmark` — tracking
    /// without a pending slot is a programmer error, not a recoverable
    /// condition.
    pub fn track(&mut self) -> Ticket {
        let mut bookmark = self
            .pending
            .take()
            .expect("track called without a preceding request_bookmark");
        bookmark.stamp_persist_state(self.source.persist_state());
        let source_ref = SourceRef::new(Arc::clone(&self.source));
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.in_flight
            .lock()
            .unwrap()
            .insert(ticket.0, InFlight { bookmark, source_ref });
        ticket
    }

    /// Saves (unless aborted) and destroys the record, returns one
    /// flow-control credit, and releases the source hold.
    pub fn ack(&self, ticket: Ticket, ack_type: AckType) {
        let InFlight { mut bookmark, source_ref } = self
            .in_flight
            .lock()
            .unwrap()
            .remove(&ticket.0)
            .expect("ack for a ticket that was never tracked");

        // Aborted messages skip the save; every other outcome persists the
        // bookmark immediately.
        if ack_type != AckType::Aborted {
            bookmark.save();
        }
        bookmark.destroy();

        if ack_type == AckType::Suspended {
            self.source.flow_control_suspend();
            self.source.flow_control_adjust_when_suspended(1);
        } else {
            self.source.flow_control_adjust(1);
        }

        source_ref.release();
    }

    /// Destroys the pending record's bookmark, if any.
    pub fn deinit(&mut self) {
        if let Some(mut bookmark) = self.pending.take() {
            bookmark.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingSource;
    use std::sync::{Arc, Mutex};

    #[test]
    fn s1_instant_success_saves_in_order() {
        let saved = Arc::new(Mutex::new(Vec::new()));
        let source = Arc::new(RecordingSource::new());
        let mut tracker = InstantAckTracker::new(source.clone());

        for i in 0u8..3 {
            let bookmark = tracker.request_bookmark().unwrap();
            bookmark.payload_mut()[0] = i;
            let saved2 = Arc::clone(&saved);
            bookmark.set_save(Box::new(move |payload, _| {
                saved2.lock().unwrap().push(payload[0]);
            }));
            let ticket = tracker.track();
            tracker.ack(ticket, AckType::Processed);
        }

        assert_eq!(*saved.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(source.credits(), 3);
        assert_eq!(source.refcount(), 0);
    }

    #[test]
    fn aborted_message_is_never_saved() {
        let saved = Arc::new(Mutex::new(false));
        let source = Arc::new(RecordingSource::new());
        let mut tracker = InstantAckTracker::new(source.clone());

        let bookmark = tracker.request_bookmark().unwrap();
        let saved2 = Arc::clone(&saved);
        bookmark.set_save(Box::new(move |_, _| {
            *saved2.lock().unwrap() = true;
        }));
        let ticket = tracker.track();
        tracker.ack(ticket, AckType::Aborted);

        assert!(!*saved.lock().unwrap());
        assert_eq!(source.credits(), 1);
    }

    #[test]
    fn deinit_destroys_unconsumed_pending_record() {
        let destroyed = Arc::new(Mutex::new(false));
        let source = Arc::new(RecordingSource::new());
        let mut tracker = InstantAckTracker::new(source);

        let bookmark = tracker.request_bookmark().unwrap();
        let destroyed2 = Arc::clone(&destroyed);
        bookmark.set_destroy(Box::new(move |_| {
            *destroyed2.lock().unwrap() = true;
        }));
        tracker.deinit();

        assert!(*destroyed.lock().unwrap());
    }
}
