//! Consecutive — the hardest of the four variants: bookmarks are persisted
//! strictly in source order, even though acks arrive out of order and on
//! arbitrary threads.

use crate::config::RingConfig;
use crate::source::{AckType, Source, SourceRef, Ticket};
use ack_ring::{Ackable, Bookmark, ConsecutiveRecord, DynamicRecordContainer, RecordContainer, StaticRecordContainer};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Either container flavor, chosen once at construction based on whether
/// the source's flow-control window can grow.
enum Container {
    Static(StaticRecordContainer<ConsecutiveRecord>),
    Dynamic(DynamicRecordContainer<ConsecutiveRecord>),
}

impl Container {
    fn is_empty(&self) -> bool {
        match self {
            Container::Static(c) => c.is_empty(),
            Container::Dynamic(c) => c.is_empty(),
        }
    }
    fn size(&self) -> usize {
        match self {
            Container::Static(c) => c.size(),
            Container::Dynamic(c) => c.size(),
        }
    }
    fn request_pending(&mut self) -> Option<&mut Bookmark> {
        match self {
            Container::Static(c) => c.request_pending(),
            Container::Dynamic(c) => c.request_pending(),
        }
    }
    fn store_pending(&mut self) {
        match self {
            Container::Static(c) => c.store_pending(),
            Container::Dynamic(c) => c.store_pending(),
        }
    }
    fn drop_front(&mut self, n: usize) {
        match self {
            Container::Static(c) => c.drop_front(n),
            Container::Dynamic(c) => c.drop_front(n),
        }
    }
    fn at(&self, i: usize) -> Option<&ConsecutiveRecord> {
        match self {
            Container::Static(c) => c.at(i),
            Container::Dynamic(c) => c.at(i),
        }
    }
    fn at_mut(&mut self, i: usize) -> Option<&mut ConsecutiveRecord> {
        match self {
            Container::Static(c) => c.at_mut(i),
            Container::Dynamic(c) => c.at_mut(i),
        }
    }
    fn continual_range_length(&self) -> usize {
        match self {
            Container::Static(c) => c.continual_range_length(),
            Container::Dynamic(c) => c.continual_range_length(),
        }
    }
    fn free(&mut self) {
        match self {
            Container::Static(c) => c.free(),
            Container::Dynamic(c) => c.free(),
        }
    }
}

struct Inner {
    container: Container,
    /// Source holds for stored records, in the same FIFO order as the
    /// container itself — `drop_front(k)` on the container is always
    /// paired with popping `k` entries from the front here.
    source_refs: VecDeque<SourceRef>,
    /// First ticket number still present in the container; `ticket -
    /// base_ticket` is the record's position. Valid because `track` calls
    /// are serialized by the source, so ticket order equals insertion order.
    base_ticket: u64,
    disable_saving: bool,
    on_all_acked: Option<Box<dyn FnMut() + Send>>,
}

/// Persists bookmarks strictly in source order: a record preceding an
/// unacked one is never saved ahead of it, regardless of ack arrival order.
pub struct ConsecutiveAckTracker {
    source: Arc<dyn Source>,
    next_ticket: u64,
    inner: Mutex<Inner>,
}

impl ConsecutiveAckTracker {
    /// Picks a static (ring-backed) container if the source's window is
    /// fixed, or a dynamic (list-backed) one if it can grow.
    pub fn new(source: Arc<dyn Source>, ring: RingConfig) -> Self {
        let container = if source.is_dynamic_window() {
            Container::Dynamic(DynamicRecordContainer::new())
        } else {
            Container::Static(StaticRecordContainer::new(ring.capacity))
        };
        Self {
            source,
            next_ticket: 0,
            inner: Mutex::new(Inner {
                container,
                source_refs: VecDeque::new(),
                base_ticket: 0,
                disable_saving: false,
                on_all_acked: None,
            }),
        }
    }

    pub fn init(&mut self) -> bool {
        true
    }

    /// Suppresses all future saves. Latches permanently once set.
    pub fn disable_bookmark_saving(&self) {
        self.inner.lock().unwrap().disable_saving = true;
    }

    /// Installs a callback fired whenever the container becomes empty
    /// following an ack. Replaces any previously set callback.
    pub fn set_on_all_acked(&self, f: Box<dyn FnMut() + Send>) {
        self.inner.lock().unwrap().on_all_acked = Some(f);
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().container.is_empty()
    }

    /// Returns the pending slot, or `None` if the static container is full
    /// (back-pressure: the source must stop reading until the window
    /// drains).
    pub fn request_bookmark(&mut self) -> Option<&mut Bookmark> {
        // SAFETY-free workaround for the borrow checker: MutexGuard can't
        // outlive this call, so request_bookmark stamps persist-state here
        // and hands back a short-lived reference via `inner.get_mut()`
        // (single-owner-thread access, no lock needed for request/track).
        let inner = self.inner.get_mut();
        let handle = self.source.persist_state();
        let bookmark = inner.container.request_pending()?;
        bookmark.stamp_persist_state(handle);
        inner.container.request_pending()
    }

    /// Commits the pending slot, takes a source hold, and returns the
    /// ticket downstream will later `ack`.
    ///
    /// # Panics
    ///
    /// Panics if called without a preceding, still-pending `request_bookmark`.
    pub fn track(&mut self) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        let inner = self.inner.get_mut();
        assert!(
            inner.container.request_pending().is_some(),
            "track called without a preceding request_bookmark"
        );
        inner.container.store_pending();
        let source_ref = SourceRef::new(Arc::clone(&self.source));
        inner.source_refs.push_back(source_ref);
        ticket
    }

    /// Marks the record acked, computes the continual-ack prefix under
    /// lock, saves the last non-aborted record of that prefix (unless
    /// saving is disabled or it was itself aborted), drops the prefix, and
    /// returns one credit per dropped record.
    pub fn ack(&self, ticket: Ticket, ack_type: AckType) {
        if ack_type == AckType::Suspended {
            self.source.flow_control_suspend();
        }

        let (credits, became_empty) = {
            let mut inner = self.inner.lock().unwrap();
            let position = (ticket.0 - inner.base_ticket) as usize;
            if let Some(record) = inner.container.at_mut(position) {
                record.set_acked();
            }

            let k = inner.container.continual_range_length();
            if k == 0 {
                (0u32, false)
            } else {
                if ack_type != AckType::Aborted && !inner.disable_saving {
                    if let Some(last) = inner.container.at_mut(k - 1) {
                        last.bookmark_mut().save();
                    }
                }
                inner.container.drop_front(k);
                for _ in 0..k {
                    if let Some(source_ref) = inner.source_refs.pop_front() {
                        source_ref.release();
                    }
                }
                inner.base_ticket += k as u64;
                let became_empty = inner.container.is_empty();
                (k as u32, became_empty)
            }
        };

        if ack_type == AckType::Suspended {
            self.source.flow_control_adjust_when_suspended(credits);
        } else {
            self.source.flow_control_adjust(credits);
        }

        if became_empty {
            let mut inner = self.inner.lock().unwrap();
            if let Some(cb) = inner.on_all_acked.as_mut() {
                cb();
            }
        }
    }

    /// Discards every remaining record — stored and pending alike —
    /// destroying their bookmarks and releasing the source holds taken for
    /// the stored ones. A requested-but-never-`track`ed bookmark carries no
    /// source hold of its own (`track` is what takes one), so `free` alone
    /// accounts for it.
    pub fn deinit(&mut self) {
        let inner = self.inner.get_mut();
        let n = inner.container.size();
        inner.container.free();
        for _ in 0..n {
            if let Some(source_ref) = inner.source_refs.pop_front() {
                source_ref.release();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingSource;
    use std::sync::{Arc, Mutex};

    fn write_and_track(tracker: &mut ConsecutiveAckTracker, tag: u8, saved: &Arc<Mutex<Vec<u8>>>) -> Ticket {
        let bookmark = tracker.request_bookmark().expect("window not exhausted");
        bookmark.payload_mut()[0] = tag;
        let saved2 = Arc::clone(saved);
        bookmark.set_save(Box::new(move |payload, _| {
            saved2.lock().unwrap().push(payload[0]);
        }));
        tracker.track()
    }

    #[test]
    fn s2_out_of_order_ack_saves_only_the_completed_prefix_tail() {
        let saved = Arc::new(Mutex::new(Vec::new()));
        let source = Arc::new(RecordingSource::new());
        let mut tracker = ConsecutiveAckTracker::new(Arc::clone(&source) as Arc<dyn Source>, RingConfig::new(4));

        let t0 = write_and_track(&mut tracker, 0, &saved);
        let t1 = write_and_track(&mut tracker, 1, &saved);
        let t2 = write_and_track(&mut tracker, 2, &saved);
        let t3 = write_and_track(&mut tracker, 3, &saved);

        tracker.ack(t1, AckType::Processed);
        assert!(saved.lock().unwrap().is_empty());
        tracker.ack(t2, AckType::Processed);
        assert!(saved.lock().unwrap().is_empty());
        tracker.ack(t0, AckType::Processed); // completes prefix 0..2
        assert_eq!(*saved.lock().unwrap(), vec![2]);
        tracker.ack(t3, AckType::Processed);
        assert_eq!(*saved.lock().unwrap(), vec![2, 3]);

        assert_eq!(source.credits(), 4);
        assert_eq!(source.refcount(), 0);
    }

    #[test]
    fn s3_aborted_in_middle_never_saves_the_aborted_record() {
        // Each ack that completes a non-empty prefix saves that prefix's
        // tail immediately, so positions 0, 2 and 3 each get their own save;
        // only the aborted position 1 is skipped.
        let saved = Arc::new(Mutex::new(Vec::new()));
        let source = Arc::new(RecordingSource::new());
        let mut tracker = ConsecutiveAckTracker::new(Arc::clone(&source) as Arc<dyn Source>, RingConfig::new(4));

        let t0 = write_and_track(&mut tracker, 0, &saved);
        let t1 = write_and_track(&mut tracker, 1, &saved);
        let t2 = write_and_track(&mut tracker, 2, &saved);
        let t3 = write_and_track(&mut tracker, 3, &saved);

        tracker.ack(t0, AckType::Processed);
        assert_eq!(*saved.lock().unwrap(), vec![0]);
        tracker.ack(t1, AckType::Aborted);
        assert_eq!(*saved.lock().unwrap(), vec![0]); // position 1 never saved
        tracker.ack(t2, AckType::Processed);
        tracker.ack(t3, AckType::Processed);

        assert_eq!(*saved.lock().unwrap(), vec![0, 2, 3]);
        assert_eq!(source.credits(), 4);
    }

    #[test]
    fn static_window_exhausted_backpressures() {
        let source = Arc::new(RecordingSource::new());
        let mut tracker = ConsecutiveAckTracker::new(Arc::clone(&source) as Arc<dyn Source>, RingConfig::new(2));
        tracker.request_bookmark();
        tracker.track();
        tracker.request_bookmark();
        tracker.track();
        assert!(tracker.request_bookmark().is_none());
    }

    #[test]
    fn on_all_acked_fires_when_container_empties() {
        let fired = Arc::new(Mutex::new(false));
        let source = Arc::new(RecordingSource::new());
        let mut tracker = ConsecutiveAckTracker::new(Arc::clone(&source) as Arc<dyn Source>, RingConfig::new(4));
        let fired2 = Arc::clone(&fired);
        tracker.set_on_all_acked(Box::new(move || {
            *fired2.lock().unwrap() = true;
        }));

        let saved = Arc::new(Mutex::new(Vec::new()));
        let t0 = write_and_track(&mut tracker, 0, &saved);
        tracker.ack(t0, AckType::Processed);

        assert!(*fired.lock().unwrap());
    }

    #[test]
    fn disable_bookmark_saving_suppresses_all_saves() {
        let saved = Arc::new(Mutex::new(Vec::new()));
        let source = Arc::new(RecordingSource::new());
        let mut tracker = ConsecutiveAckTracker::new(Arc::clone(&source) as Arc<dyn Source>, RingConfig::new(4));
        tracker.disable_bookmark_saving();

        let t0 = write_and_track(&mut tracker, 0, &saved);
        tracker.ack(t0, AckType::Processed);

        assert!(saved.lock().unwrap().is_empty());
        assert_eq!(source.credits(), 1);
    }

    #[test]
    fn dynamic_container_is_selected_for_growable_windows() {
        let source = Arc::new(RecordingSource::dynamic());
        let mut tracker = ConsecutiveAckTracker::new(Arc::clone(&source) as Arc<dyn Source>, RingConfig::new(1));
        // A dynamic window never back-pressures, unlike a static one this small.
        for _ in 0..10 {
            assert!(tracker.request_bookmark().is_some());
            tracker.track();
        }
    }

    #[test]
    fn deinit_destroys_a_requested_but_never_tracked_bookmark() {
        let destroyed = Arc::new(Mutex::new(false));
        let source = Arc::new(RecordingSource::new());
        let mut tracker = ConsecutiveAckTracker::new(Arc::clone(&source) as Arc<dyn Source>, RingConfig::new(4));

        let destroyed2 = Arc::clone(&destroyed);
        let bookmark = tracker.request_bookmark().expect("window not exhausted");
        bookmark.set_destroy(Box::new(move |_| {
            *destroyed2.lock().unwrap() = true;
        }));
        // Deliberately never call track(): the pending slot must still be
        // destroyed by deinit.

        tracker.deinit();
        assert!(*destroyed.lock().unwrap());
    }
}
