//! Pure batch accumulation for the `Batched` tracker. No `Arc`, no atomics,
//! no locking — the concurrency boundary lives entirely in `batched.rs`.

use ack_ring::Bookmark;

/// Collects bookmarks until `batch_size` is reached, or until the owner
/// flushes early on a timeout or teardown.
pub struct BatchAccumulator {
    pending: Vec<Bookmark>,
    batch_size: usize,
}

impl BatchAccumulator {
    pub fn new(batch_size: usize) -> Self {
        Self {
            pending: Vec::with_capacity(batch_size),
            batch_size,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Records a bookmark in reverse arrival order — each new ack is
    /// prepended, not appended. Returns the full batch once this prepend
    /// brings the accumulator to `batch_size`, leaving it empty for the next
    /// one.
    pub fn push(&mut self, bookmark: Bookmark) -> Option<Vec<Bookmark>> {
        self.pending.insert(0, bookmark);
        if self.pending.len() >= self.batch_size {
            Some(std::mem::replace(&mut self.pending, Vec::with_capacity(self.batch_size)))
        } else {
            None
        }
    }

    /// Detaches whatever is currently pending (possibly empty), leaving the
    /// accumulator ready to collect the next batch.
    pub fn take(&mut self) -> Vec<Bookmark> {
        std::mem::replace(&mut self.pending, Vec::with_capacity(self.batch_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_returns_the_batch_only_once_full() {
        let mut acc = BatchAccumulator::new(2);
        assert!(acc.push(Bookmark::new()).is_none());
        assert_eq!(acc.len(), 1);
        let batch = acc.push(Bookmark::new()).expect("second push fills the batch");
        assert_eq!(batch.len(), 2);
        assert!(acc.is_empty());
    }

    #[test]
    fn take_detaches_a_partial_batch() {
        let mut acc = BatchAccumulator::new(10);
        acc.push(Bookmark::new());
        acc.push(Bookmark::new());
        let partial = acc.take();
        assert_eq!(partial.len(), 2);
        assert!(acc.is_empty());
    }
}
