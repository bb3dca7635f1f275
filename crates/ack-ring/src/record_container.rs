//! `RecordContainer` — owns a flight of outstanding records plus at most one
//! pending slot being filled, in both ring-backed (static) and list-backed
//! (dynamic) flavors.

use crate::bookmark::Bookmark;
use crate::invariants::{
    assert_drop_in_bounds, debug_assert_has_pending, debug_assert_prefix_in_bounds,
};
use crate::ring_buffer::RingBuffer;
use std::collections::VecDeque;

/// A record that carries a bookmark and an `acked` flag, flipped from
/// `false` to `true` exactly once over its lifetime.
pub trait Ackable: Default {
    fn bookmark(&self) -> &Bookmark;
    fn bookmark_mut(&mut self) -> &mut Bookmark;
    fn is_acked(&self) -> bool;
    fn set_acked(&mut self);
}

/// Record flavor used by the `Consecutive` tracker.
#[derive(Default)]
pub struct ConsecutiveRecord {
    bookmark: Bookmark,
    acked: bool,
}

impl Ackable for ConsecutiveRecord {
    fn bookmark(&self) -> &Bookmark {
        &self.bookmark
    }
    fn bookmark_mut(&mut self) -> &mut Bookmark {
        &mut self.bookmark
    }
    fn is_acked(&self) -> bool {
        self.acked
    }
    fn set_acked(&mut self) {
        self.acked = true;
    }
}

/// Record flavor used by the late-ack container. Structurally identical to
/// `ConsecutiveRecord`; kept as a distinct type to preserve the "two record
/// types" data model rather than collapsing both into a single reused
/// struct.
#[derive(Default)]
pub struct LateAckRecord {
    bookmark: Bookmark,
    acked: bool,
}

impl Ackable for LateAckRecord {
    fn bookmark(&self) -> &Bookmark {
        &self.bookmark
    }
    fn bookmark_mut(&mut self) -> &mut Bookmark {
        &mut self.bookmark
    }
    fn is_acked(&self) -> bool {
        self.acked
    }
    fn set_acked(&mut self) {
        self.acked = true;
    }
}

/// Unified contract shared by the static (ring-backed) and dynamic
/// (list-backed) containers.
pub trait RecordContainer {
    type Record: Ackable;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }
    fn size(&self) -> usize;

    /// Returns the pending slot's bookmark, allocating one if none is
    /// outstanding. Idempotent until `store_pending`. Returns `None` only
    /// for the static container when the ring is already full.
    fn request_pending(&mut self) -> Option<&mut Bookmark>;

    /// Commits the pending slot as the new tail of stored records and
    /// clears the pending marker. A no-op if there is no pending slot, or
    /// (static only) if the ring filled up between `request_pending` and
    /// this call.
    fn store_pending(&mut self);

    /// Removes the oldest `n` stored records, invoking `Bookmark::destroy`
    /// on each.
    ///
    /// # Panics
    ///
    /// Panics if `n > size()`.
    fn drop_front(&mut self, n: usize);

    fn at(&self, i: usize) -> Option<&Self::Record>;
    fn at_mut(&mut self, i: usize) -> Option<&mut Self::Record>;

    /// Length of the maximal head-adjacent run of acked records.
    fn continual_range_length(&self) -> usize;

    /// Destroys every remaining record (stored and pending).
    fn free(&mut self);
}

/// Ring-backed container. Sized at creation — typically the source's
/// initial flow-control window. `request_pending`/`store_pending` back onto
/// the ring's overflow semantics: full means back-pressure.
pub struct StaticRecordContainer<R: Ackable> {
    ring: RingBuffer<R>,
    pending: Option<R>,
}

impl<R: Ackable> StaticRecordContainer<R> {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: RingBuffer::new(capacity),
            pending: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

impl<R: Ackable> RecordContainer for StaticRecordContainer<R> {
    type Record = R;

    fn size(&self) -> usize {
        self.ring.len()
    }

    fn request_pending(&mut self) -> Option<&mut Bookmark> {
        if self.pending.is_none() {
            if self.ring.is_full() {
                return None;
            }
            self.pending = Some(R::default());
        }
        debug_assert_has_pending!(self.pending.is_some());
        self.pending.as_mut().map(Ackable::bookmark_mut)
    }

    fn store_pending(&mut self) {
        if self.pending.is_none() {
            return;
        }
        if self.ring.is_full() {
            // Static-full: store_pending is a no-op, the slot stays pending.
            return;
        }
        let record = self.pending.take().expect("checked above");
        self.ring.push(record);
    }

    fn drop_front(&mut self, n: usize) {
        assert_drop_in_bounds!(n, self.ring.len());
        for i in 0..n {
            if let Some(r) = self.ring.at_mut(i) {
                r.bookmark_mut().destroy();
            }
        }
        self.ring.drop_front(n);
    }

    fn at(&self, i: usize) -> Option<&R> {
        self.ring.at(i)
    }

    fn at_mut(&mut self, i: usize) -> Option<&mut R> {
        self.ring.at_mut(i)
    }

    fn continual_range_length(&self) -> usize {
        let k = self.ring.continual_range_length(Ackable::is_acked);
        debug_assert_prefix_in_bounds!(k, self.ring.len());
        k
    }

    fn free(&mut self) {
        self.drop_front(self.size());
        if let Some(mut pending) = self.pending.take() {
            pending.bookmark_mut().destroy();
        }
    }
}

/// List-backed container with O(1) append at tail and O(1) head trim.
/// Never back-pressures: `request_pending` always succeeds.
pub struct DynamicRecordContainer<R: Ackable> {
    stored: VecDeque<R>,
    pending: Option<R>,
}

impl<R: Ackable> DynamicRecordContainer<R> {
    pub fn new() -> Self {
        Self {
            stored: VecDeque::new(),
            pending: None,
        }
    }
}

impl<R: Ackable> Default for DynamicRecordContainer<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Ackable> RecordContainer for DynamicRecordContainer<R> {
    type Record = R;

    fn size(&self) -> usize {
        self.stored.len()
    }

    fn request_pending(&mut self) -> Option<&mut Bookmark> {
        if self.pending.is_none() {
            self.pending = Some(R::default());
        }
        debug_assert_has_pending!(self.pending.is_some());
        self.pending.as_mut().map(Ackable::bookmark_mut)
    }

    fn store_pending(&mut self) {
        // The pending slot lives outside `stored`, so it survives any prior
        // `drop_front` (including a drop-to-empty) and becomes the sole
        // element here, regardless of what `stored` looked like a moment ago.
        if let Some(record) = self.pending.take() {
            self.stored.push_back(record);
        }
    }

    fn drop_front(&mut self, n: usize) {
        assert_drop_in_bounds!(n, self.stored.len());
        for _ in 0..n {
            if let Some(mut record) = self.stored.pop_front() {
                record.bookmark_mut().destroy();
            }
        }
    }

    fn at(&self, i: usize) -> Option<&R> {
        self.stored.get(i)
    }

    fn at_mut(&mut self, i: usize) -> Option<&mut R> {
        self.stored.get_mut(i)
    }

    fn continual_range_length(&self) -> usize {
        let k = self.stored.iter().take_while(|r| r.is_acked()).count();
        debug_assert_prefix_in_bounds!(k, self.stored.len());
        k
    }

    fn free(&mut self) {
        self.drop_front(self.size());
        if let Some(mut pending) = self.pending.take() {
            pending.bookmark_mut().destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark_acked<R: Ackable>(r: &mut R) {
        r.set_acked();
    }

    #[test]
    fn static_request_pending_is_idempotent_until_stored() {
        let mut c: StaticRecordContainer<ConsecutiveRecord> = StaticRecordContainer::new(2);
        let b1 = c.request_pending().unwrap() as *mut Bookmark;
        let b2 = c.request_pending().unwrap() as *mut Bookmark;
        assert_eq!(b1, b2);
        c.store_pending();
        assert_eq!(c.size(), 1);
    }

    #[test]
    fn static_overflow_request_pending_returns_null_and_store_is_noop() {
        let mut c: StaticRecordContainer<ConsecutiveRecord> = StaticRecordContainer::new(1);
        c.request_pending();
        c.store_pending();
        assert_eq!(c.size(), 1);
        assert!(c.request_pending().is_none());
        c.store_pending(); // no-op
        assert_eq!(c.size(), 1);
    }

    #[test]
    fn static_drop_then_reacquire_after_full() {
        let mut c: StaticRecordContainer<ConsecutiveRecord> = StaticRecordContainer::new(1);
        c.request_pending();
        c.store_pending();
        assert!(c.request_pending().is_none());
        c.drop_front(1);
        assert!(c.request_pending().is_some());
        c.store_pending();
        assert_eq!(c.size(), 1);
    }

    #[test]
    fn static_continual_range_length_and_drop() {
        let mut c: StaticRecordContainer<ConsecutiveRecord> = StaticRecordContainer::new(4);
        for _ in 0..4 {
            c.request_pending();
            c.store_pending();
        }
        mark_acked(c.at_mut(0).unwrap());
        mark_acked(c.at_mut(1).unwrap());
        assert_eq!(c.continual_range_length(), 2);
        c.drop_front(2);
        assert_eq!(c.size(), 2);
        assert_eq!(c.continual_range_length(), 0);
    }

    #[test]
    #[should_panic]
    fn static_drop_more_than_size_panics() {
        let mut c: StaticRecordContainer<ConsecutiveRecord> = StaticRecordContainer::new(2);
        c.drop_front(1);
    }

    #[test]
    fn dynamic_store_pending_after_drop_all_survives_as_sole_element() {
        let mut c: DynamicRecordContainer<ConsecutiveRecord> = DynamicRecordContainer::new();
        c.request_pending();
        c.store_pending();
        c.request_pending();
        c.store_pending();
        assert_eq!(c.size(), 2);

        c.drop_front(2);
        assert!(c.is_empty());

        // pending survives the drop-to-empty
        c.request_pending();
        c.store_pending();
        assert_eq!(c.size(), 1);
    }

    #[test]
    fn dynamic_never_back_pressures() {
        let mut c: DynamicRecordContainer<ConsecutiveRecord> = DynamicRecordContainer::new();
        for _ in 0..1000 {
            assert!(c.request_pending().is_some());
            c.store_pending();
        }
        assert_eq!(c.size(), 1000);
    }

    #[test]
    fn late_record_container_is_ring_backed_like_consecutive() {
        let mut c: StaticRecordContainer<LateAckRecord> = StaticRecordContainer::new(2);
        c.request_pending();
        c.store_pending();
        mark_acked(c.at_mut(0).unwrap());
        assert_eq!(c.continual_range_length(), 1);
    }
}
