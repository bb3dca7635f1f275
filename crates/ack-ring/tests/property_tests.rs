//! Property-based tests for `RingBuffer<T>`'s structural invariants.
//!
//! Coverage mirrors the testable properties in the data-model spec:
//! - INV-RING-01 (bounded count) and FIFO ordering, checked against a plain
//!   `VecDeque` reference model.
//! - The "continual-ack prefix" query equals the longest true-prefix length.
//! - `drop_front` then `push` repositions `at(0)`/`at(len-1)` correctly.

use ack_ring::RingBuffer;
use proptest::prelude::*;
use std::collections::VecDeque;

/// A scripted sequence of pushes and bulk drops, replayed against both the
/// ring buffer and a `VecDeque` model — the two must agree after every step.
#[derive(Debug, Clone)]
enum Op {
    Push(i32),
    Drop(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![any::<i32>().prop_map(Op::Push), (0usize..8).prop_map(Op::Drop),]
}

proptest! {
    /// INV-RING-01 / FIFO storage: after any sequence of pushes and bulk
    /// drops, the ring's contents and length match a `VecDeque` model.
    #[test]
    fn matches_a_vecdeque_model(capacity in 1usize..16, ops in prop::collection::vec(op_strategy(), 0..200)) {
        let mut ring = RingBuffer::new(capacity);
        let mut model: VecDeque<i32> = VecDeque::new();

        for op in ops {
            match op {
                Op::Push(v) => {
                    if model.len() < capacity {
                        prop_assert!(ring.push(v).is_some());
                        model.push_back(v);
                    } else {
                        prop_assert!(ring.push(v).is_none());
                    }
                }
                Op::Drop(n) => {
                    let n = n.min(model.len());
                    ring.drop_front(n);
                    for _ in 0..n {
                        model.pop_front();
                    }
                }
            }
            prop_assert_eq!(ring.len(), model.len());
            for i in 0..model.len() {
                prop_assert_eq!(ring.at(i), model.get(i));
            }
        }
    }

    /// `continual_range_length(pred)` equals the length of the longest
    /// prefix satisfying `pred`.
    #[test]
    fn continual_range_length_matches_longest_true_prefix(
        capacity in 1usize..16,
        values in prop::collection::vec(any::<bool>(), 0..16),
    ) {
        let mut ring = RingBuffer::new(capacity);
        for &v in values.iter().take(capacity) {
            ring.push(v);
        }
        let expected = values.iter().take(capacity).take_while(|&&v| v).count();
        prop_assert_eq!(ring.continual_range_length(|&v| v), expected);
    }

    /// After `drop_front(k)` followed by `push`, `at(len-1)` is the newly
    /// pushed element and `at(0)` is the `(k+1)`-th original element.
    #[test]
    fn drop_then_push_repositions_at_for_any_capacity(capacity in 1usize..16, pushes in 1usize..32, drop_count in 0usize..16) {
        let mut ring = RingBuffer::new(capacity);
        let fill = pushes.min(capacity);
        for i in 0..fill {
            ring.push(i as i32);
        }
        let k = drop_count.min(ring.len());
        ring.drop_front(k);
        if ring.len() < capacity {
            ring.push(999);
            prop_assert_eq!(*ring.at(ring.len() - 1).unwrap(), 999);
        }
        if k < fill {
            prop_assert_eq!(*ring.at(0).unwrap(), k as i32);
        }
    }
}
