//! Bookmark — an opaque, persistable position into the upstream transport.

use crate::invariants::debug_assert_callback_consumed;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Size of a bookmark's opaque payload, in bytes.
pub const PAYLOAD_LEN: usize = 128;

/// Opaque handle into the persistent-state store. The tracker only stamps
/// this into a bookmark; it never interprets or dereferences it. Concrete
/// stores (e.g. `ack-persist-state`) hand out handles of their own type
/// wrapped behind this `Any` bound.
pub type PersistHandle = Arc<dyn Any + Send + Sync>;

type SaveFn = Box<dyn FnOnce(&[u8; PAYLOAD_LEN], Option<&PersistHandle>) + Send>;
type DestroyFn = Box<dyn FnOnce(&[u8; PAYLOAD_LEN]) + Send>;

/// A fixed-size, source-interpretable position into the underlying
/// transport, plus the two callbacks that make it persistable.
///
/// The payload format is defined entirely by the source that populates it;
/// the tracker and containers never read it. `save`/`destroy` are each
/// invoked at most once per record — enforced here by `Option::take`, which
/// also makes both calls cheap no-ops once consumed.
#[repr(align(8))]
pub struct Bookmark {
    payload: [u8; PAYLOAD_LEN],
    persist_state: Option<PersistHandle>,
    save: Option<SaveFn>,
    destroy: Option<DestroyFn>,
}

impl Bookmark {
    /// Creates an empty bookmark with no callbacks and a zeroed payload.
    pub fn new() -> Self {
        Self {
            payload: [0u8; PAYLOAD_LEN],
            persist_state: None,
            save: None,
            destroy: None,
        }
    }

    /// Read access to the opaque payload.
    pub fn payload(&self) -> &[u8; PAYLOAD_LEN] {
        &self.payload
    }

    /// Write access to the opaque payload, for the source to populate
    /// between `request_bookmark` and `track`.
    pub fn payload_mut(&mut self) -> &mut [u8; PAYLOAD_LEN] {
        &mut self.payload
    }

    /// Installs the save callback. Replaces any previously set callback.
    pub fn set_save(&mut self, f: SaveFn) {
        self.save = Some(f);
    }

    /// Installs the destroy callback. Replaces any previously set callback.
    pub fn set_destroy(&mut self, f: DestroyFn) {
        self.destroy = Some(f);
    }

    /// Stamps the persistent-state handle into this bookmark. Called by
    /// `track` before the record is handed off to the source.
    pub fn stamp_persist_state(&mut self, handle: PersistHandle) {
        self.persist_state = Some(handle);
    }

    pub fn persist_state(&self) -> Option<&PersistHandle> {
        self.persist_state.as_ref()
    }

    /// Durably commits the bookmark's payload via its save callback, if one
    /// is set. No-op otherwise, and a no-op on every call after the first.
    pub fn save(&mut self) {
        if let Some(f) = self.save.take() {
            f(&self.payload, self.persist_state.as_ref());
        }
        debug_assert_callback_consumed!(self.save);
    }

    /// Releases payload-owned resources via its destroy callback, if one is
    /// set. No-op otherwise, and a no-op on every call after the first.
    pub fn destroy(&mut self) {
        if let Some(f) = self.destroy.take() {
            f(&self.payload);
        }
        debug_assert_callback_consumed!(self.destroy);
    }

    /// Clears payload, callbacks and persist-state handle so a reused ring
    /// slot cannot re-invoke a prior record's callbacks (see `RecordContainer::drop_front`).
    pub fn reset(&mut self) {
        self.payload = [0u8; PAYLOAD_LEN];
        self.persist_state = None;
        self.save = None;
        self.destroy = None;
    }
}

impl Default for Bookmark {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Bookmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bookmark")
            .field("has_save", &self.save.is_some())
            .field("has_destroy", &self.destroy.is_some())
            .field("has_persist_state", &self.persist_state.is_some())
            .finish()
    }
}
