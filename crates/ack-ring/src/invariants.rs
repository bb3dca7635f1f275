//! Debug assertion macros for ring buffer and record container invariants.
//!
//! These macros provide runtime checks for the structural invariants of
//! `RingBuffer<T>` and the `RecordContainer` implementations. They are only
//! active in debug builds (`#[cfg(debug_assertions)]`), so there is zero
//! overhead in release builds.

// =============================================================================
// INV-RING-01: Bounded Count
// =============================================================================

/// Assert that count never exceeds capacity.
///
/// **Invariant**: `0 ≤ count ≤ capacity`
///
/// Used in: `RingBuffer::push`, `RingBuffer::drop_front`
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "INV-RING-01 violated: count {} exceeds capacity {}",
            $count,
            $capacity
        )
    };
}

// =============================================================================
// INV-RING-02: Drop Bounds
// =============================================================================

/// Assert that a bulk drop never removes more elements than are present.
///
/// **Invariant**: `drop_front(n)` requires `n ≤ count`. A violation is a
/// programming error (container misuse), not a recoverable condition.
///
/// Used in: `RingBuffer::drop_front`, `RecordContainer::drop_front`
macro_rules! assert_drop_in_bounds {
    ($n:expr, $count:expr) => {
        assert!(
            $n <= $count,
            "INV-RING-02 violated: drop({}) requested but only {} elements stored",
            $n,
            $count
        )
    };
}

// =============================================================================
// INV-CONT-01: Pending Uniqueness
// =============================================================================

/// Assert that a freshly returned pending slot really left the container in
/// the "has pending" state.
///
/// **Invariant**: at most one pending record exists at a time;
/// `request_pending` is idempotent until `store_pending`.
///
/// Used in: `StaticRecordContainer::request_pending`, `DynamicRecordContainer::request_pending`
macro_rules! debug_assert_has_pending {
    ($has_pending:expr) => {
        debug_assert!(
            $has_pending,
            "INV-CONT-01 violated: request_pending returned a slot but left none pending"
        )
    };
}

// =============================================================================
// INV-CONT-02: Continual-Ack Prefix Bound
// =============================================================================

/// Assert the continual-ack prefix length never exceeds the stored size.
///
/// **Invariant**: `0 ≤ continual_range_length() ≤ size()`
///
/// Used in: `RecordContainer::continual_range_length`
macro_rules! debug_assert_prefix_in_bounds {
    ($k:expr, $size:expr) => {
        debug_assert!(
            $k <= $size,
            "INV-CONT-02 violated: continual-ack prefix {} exceeds stored size {}",
            $k,
            $size
        )
    };
}

// =============================================================================
// INV-BOOK-01: Single-Use Callbacks
// =============================================================================

/// Assert that a bookmark callback slot is empty after being invoked.
///
/// **Invariant**: `save`/`destroy` are each called at most once per record.
/// Structurally enforced by `Option::take`; this macro documents the call
/// site's reliance on that fact.
///
/// Used in: `Bookmark::save`, `Bookmark::destroy`
macro_rules! debug_assert_callback_consumed {
    ($slot:expr) => {
        debug_assert!(
            $slot.is_none(),
            "INV-BOOK-01 violated: callback slot still populated after invocation"
        )
    };
}

pub(crate) use assert_drop_in_bounds;
pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_callback_consumed;
pub(crate) use debug_assert_has_pending;
pub(crate) use debug_assert_prefix_in_bounds;
