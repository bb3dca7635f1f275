//! Batched — groups acked records into fixed-size batches (or flushes early
//! on a timeout) and hands each batch to a user callback for bulk
//! persistence. The only variant that needs a dedicated background task: a
//! single-shot timer plus a cross-thread "restart my timer" signal, built on
//! a `Notify`-plus-idempotent-flag pattern with a `tokio::select!` owner loop.

use crate::batch_accumulator::BatchAccumulator;
use crate::config::BatchConfig;
use crate::error::TrackerError;
use crate::source::{AckType, Source, SourceRef, Ticket};
use ack_ring::Bookmark;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Invoked with a full (or teardown-flushed partial) batch of bookmarks, in
/// reverse ack-arrival order. Persisting them is entirely the callback's
/// business — the tracker's only remaining duty afterward is to `destroy`
/// each one exactly once, same as every other variant.
pub type OnBatchAcked = Box<dyn Fn(&mut [Bookmark]) + Send + Sync>;

struct InFlight {
    bookmark: Bookmark,
    source_ref: SourceRef,
}

/// State shared between the tracker handle and its owner task. Lives behind
/// an `Arc` so the task can outlive a dropped `BatchedAckTracker` just long
/// enough to flush on teardown.
struct Shared {
    accumulator: Mutex<BatchAccumulator>,
    restart_pending: Mutex<bool>,
    restart_notify: Notify,
    destroy_notify: Notify,
    source: Arc<dyn Source>,
    on_batch: OnBatchAcked,
}

impl Shared {
    fn flush(&self, batch: Vec<Bookmark>) {
        if batch.is_empty() {
            return;
        }
        let mut batch = batch;
        (self.on_batch)(&mut batch);
        for mut bookmark in batch {
            bookmark.destroy();
        }
    }

    /// Coalesces concurrent restart requests into a single pending flag:
    /// only the request that flips the flag from clear to set takes the
    /// extra source hold and wakes the owner task.
    fn request_restart_timer(&self) {
        let mut pending = self.restart_pending.lock().unwrap();
        if !*pending {
            *pending = true;
            self.source.incref();
            self.restart_notify.notify_one();
        }
    }
}

/// Accumulates acked records into groups of `batch_size`, bounding latency
/// with a single-shot timer owned by a dedicated background task.
///
/// `request_bookmark`/`track` run on the source's single reader thread and
/// take `&mut self`; `ack` may be called from any thread and takes `&self`.
pub struct BatchedAckTracker {
    source: Arc<dyn Source>,
    pending: Option<Bookmark>,
    next_ticket: u64,
    in_flight: Mutex<HashMap<u64, InFlight>>,
    shared: Arc<Shared>,
}

impl BatchedAckTracker {
    /// Spawns the owner task that hosts the batch timer and the cross-thread
    /// restart/destroy events.
    ///
    /// # Panics
    ///
    /// Panics if called outside a running Tokio runtime (the owner task is
    /// spawned immediately, same requirement `tokio::spawn` always has).
    pub fn new(source: Arc<dyn Source>, config: BatchConfig, on_batch_acked: OnBatchAcked) -> Self {
        let shared = Arc::new(Shared {
            accumulator: Mutex::new(BatchAccumulator::new(config.batch_size)),
            restart_pending: Mutex::new(false),
            restart_notify: Notify::new(),
            destroy_notify: Notify::new(),
            source: Arc::clone(&source),
            on_batch: on_batch_acked,
        });

        tokio::spawn(Self::owner_loop(Arc::clone(&shared), config.timeout));

        Self {
            source,
            pending: None,
            next_ticket: 0,
            in_flight: Mutex::new(HashMap::new()),
            shared,
        }
    }

    /// Owns the batch timer: flushes whatever has accumulated when it fires,
    /// restarts it on request (coalescing concurrent requests via
    /// `restart_pending`), and flushes once more on teardown before exiting.
    ///
    /// The dying-source path intentionally skips re-arming the timer after a
    /// restart request observes `decref() == true` — the source has nothing
    /// left to flow-control, and the owner task still exits cleanly on the
    /// next `destroy_notify`. Preserved as implementation-defined rather than
    /// "fixed"; see `DESIGN.md`.
    async fn owner_loop(shared: Arc<Shared>, timeout: Duration) {
        let mut deadline = Self::arm(timeout);

        loop {
            tokio::select! {
                _ = async { deadline.as_mut().unwrap().await }, if deadline.is_some() => {
                    let batch = shared.accumulator.lock().unwrap().take();
                    shared.flush(batch);
                    deadline = Self::arm(timeout);
                }
                () = shared.restart_notify.notified() => {
                    {
                        let mut pending = shared.restart_pending.lock().unwrap();
                        *pending = false;
                    }
                    if shared.source.decref() {
                        deadline = None;
                    } else {
                        deadline = Self::arm(timeout);
                    }
                }
                () = shared.destroy_notify.notified() => {
                    let batch = shared.accumulator.lock().unwrap().take();
                    shared.flush(batch);
                    break;
                }
            }
        }
    }

    fn arm(timeout: Duration) -> Option<std::pin::Pin<Box<tokio::time::Sleep>>> {
        if timeout.is_zero() {
            None
        } else {
            Some(Box::pin(tokio::time::sleep(timeout)))
        }
    }

    pub fn init(&mut self) -> bool {
        true
    }

    /// Lazily allocates a fresh record and returns its bookmark for the
    /// source to populate.
    pub fn request_bookmark(&mut self) -> Option<&mut Bookmark> {
        if self.pending.is_none() {
            self.pending = Some(Bookmark::new());
        }
        self.pending.as_mut()
    }

    /// # Panics
    ///
    /// Panics if called without a preceding `request_bookmark`.
    pub fn track(&mut self) -> Ticket {
        let mut bookmark = self
            .pending
            .take()
            .expect("track called without a preceding request_bookmark");
        bookmark.stamp_persist_state(self.source.persist_state());
        let source_ref = SourceRef::new(Arc::clone(&self.source));
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.in_flight
            .lock()
            .unwrap()
            .insert(ticket.0, InFlight { bookmark, source_ref });
        ticket
    }

    /// Returns one flow-control credit and releases the source hold
    /// immediately — batching only delays persistence, never the credit or
    /// the reference release. `Aborted` records are destroyed without ever
    /// joining a batch; every other outcome appends to the accumulator and,
    /// if that completes a batch, flushes it right away and asks the owner
    /// task to restart its timer.
    pub fn ack(&self, ticket: Ticket, ack_type: AckType) {
        let InFlight { mut bookmark, source_ref } = self
            .in_flight
            .lock()
            .unwrap()
            .remove(&ticket.0)
            .expect("ack for a ticket that was never tracked");

        if ack_type == AckType::Suspended {
            self.source.flow_control_suspend();
            self.source.flow_control_adjust_when_suspended(1);
        } else {
            self.source.flow_control_adjust(1);
        }

        let mut flushed_early = false;
        if ack_type == AckType::Aborted {
            bookmark.destroy();
        } else if let Some(batch) = self.shared.accumulator.lock().unwrap().push(bookmark) {
            self.shared.flush(batch);
            flushed_early = true;
        }

        // Only request a restart if this release did not just tear the
        // source down: a dying source has nothing left to flow-control, and
        // there is no point waking the owner task for it.
        let was_last = source_ref.release();

        if flushed_early && !was_last {
            self.shared.request_restart_timer();
        }
    }

    /// Flushes whatever is currently accumulated through the user callback,
    /// once. The owner task's timer is left running: its next tick finds an
    /// empty accumulator and is a harmless no-op, so this never double-flushes.
    pub fn deinit(&mut self) {
        let batch = self.shared.accumulator.lock().unwrap().take();
        self.shared.flush(batch);
    }
}

impl Drop for BatchedAckTracker {
    /// Signals the owner task to flush and exit rather than blocking here —
    /// mirrors `batched_ack_tracker_free` posting `request_destroy` instead
    /// of tearing the timer down synchronously.
    fn drop(&mut self) {
        self.shared.destroy_notify.notify_one();
    }
}

/// Builder for call sites that assemble the batch-acked callback separately
/// from the rest of construction — e.g. a plugin that parses `BatchConfig`
/// up front but only wires the callback once its destination is resolved.
/// `BatchedAckTracker::new` remains the direct constructor for everyone
/// else; this only exists to make a missing callback a catchable
/// [`TrackerError`] instead of a type error for those call sites.
pub struct BatchedAckTrackerBuilder {
    source: Arc<dyn Source>,
    config: BatchConfig,
    on_batch_acked: Option<OnBatchAcked>,
}

impl BatchedAckTrackerBuilder {
    pub fn new(source: Arc<dyn Source>, config: BatchConfig) -> Self {
        Self {
            source,
            config,
            on_batch_acked: None,
        }
    }

    pub fn on_batch_acked(mut self, f: OnBatchAcked) -> Self {
        self.on_batch_acked = Some(f);
        self
    }

    /// # Errors
    ///
    /// Returns [`TrackerError::MissingBatchCallback`] if [`Self::on_batch_acked`]
    /// was never called.
    pub fn build(self) -> Result<BatchedAckTracker, TrackerError> {
        let on_batch_acked = self.on_batch_acked.ok_or(TrackerError::MissingBatchCallback)?;
        Ok(BatchedAckTracker::new(self.source, self.config, on_batch_acked))
    }
}
