//! Bookmark/AckRecord data model, the fixed-capacity ring buffer, and the
//! static/dynamic record containers shared by every `AckTracker` variant.

mod bookmark;
pub(crate) mod invariants;
mod record_container;
mod ring_buffer;

pub use bookmark::{Bookmark, PersistHandle, PAYLOAD_LEN};
pub use record_container::{
    Ackable, ConsecutiveRecord, DynamicRecordContainer, LateAckRecord, RecordContainer,
    StaticRecordContainer,
};
pub use ring_buffer::RingBuffer;
