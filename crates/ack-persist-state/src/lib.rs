//! Minimal demo persistent-state backend.
//!
//! `ack-tracker` only ever stamps an opaque [`ack_ring::PersistHandle`] into
//! a bookmark and invokes whatever `save`/`destroy` closures the source
//! installed on it — it never reads or writes storage itself. This crate is
//! a small, real backend those closures can target so tests and examples
//! have something to exercise instead of a no-op stub. It is explicitly not
//! a production store: no fsync-on-commit durability guarantee, no
//! compaction, no concurrent-writer coordination beyond the one mutex below.

mod store;

pub use store::{FileBackedStore, PendingWrite, PersistError};
