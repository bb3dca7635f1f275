//! Error taxonomy for the ack-tracker crate.
//!
//! Only two kinds ever surface to a caller; everything else named in the
//! design is a programmer error and asserts rather than returning `Err`.

use thiserror::Error;

/// Recoverable and configuration-time failures.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// `Batched::new` was given `batch_size == 0`.
    #[error("batch_size must be greater than zero")]
    ZeroBatchSize,

    /// `Batched::new` was given no batch-acked callback.
    #[error("on_batch_acked callback is required")]
    MissingBatchCallback,
}
