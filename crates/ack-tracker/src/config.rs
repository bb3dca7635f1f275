//! Small `*Config` structs: a `Default` impl plus builder-style `with_*`
//! setters.

use crate::error::TrackerError;
use std::time::Duration;

/// Ring-backed container sizing for the static `Consecutive` tracker.
#[derive(Debug, Clone, Copy)]
pub struct RingConfig {
    /// Ring buffer capacity. Typically the source's initial flow-control
    /// window.
    pub capacity: usize,
}

impl RingConfig {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

impl Default for RingConfig {
    fn default() -> Self {
        Self { capacity: 1000 }
    }
}

/// Batch size and latency bound for the `Batched` tracker.
///
/// Validated in `BatchConfig::new`, mirroring the asserts in
/// `batched_ack_tracker_new`: a zero batch size is a construction-time
/// error, not a runtime one.
#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub timeout: Duration,
}

impl BatchConfig {
    /// # Errors
    ///
    /// Returns [`TrackerError::ZeroBatchSize`] if `batch_size == 0`.
    pub fn new(batch_size: usize, timeout: Duration) -> Result<Self, TrackerError> {
        if batch_size == 0 {
            return Err(TrackerError::ZeroBatchSize);
        }
        Ok(Self {
            batch_size,
            timeout,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
