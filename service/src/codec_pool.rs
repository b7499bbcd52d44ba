//! Bounded worker pool for CPU-bound codec work: decode, steganography,
//! canonical hashing, and encode (spec.md §5: "Worker pool for codec:
//! bounded (default = number of CPU cores); queue length bounded (requests
//! exceeding the bound return `ServerBusy`)").
//!
//! Codec work itself stays synchronous and runs inline on the calling task
//! (it's CPU-bound, not I/O-bound, so there's nothing to `.await` inside
//! it); this pool only bounds how many requests may be doing that work, or
//! queued waiting to, at once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{Semaphore, SemaphorePermit};

/// Returned by [`CodecPool::acquire`] once `max_queue_depth` callers are
/// already waiting for a worker slot.
#[derive(Debug, thiserror::Error)]
#[error("codec worker pool is at capacity")]
pub struct PoolFull;

/// A worker-slot reservation. Dropping it frees the slot for the next
/// queued caller.
pub struct CodecPermit<'a> {
    _permit: SemaphorePermit<'a>,
}

#[derive(Clone)]
pub struct CodecPool {
    semaphore: Arc<Semaphore>,
    queued: Arc<AtomicUsize>,
    max_queue_depth: usize,
}

impl CodecPool {
    #[must_use]
    pub fn new(worker_threads: usize, max_queue_depth: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(worker_threads.max(1))),
            queued: Arc::new(AtomicUsize::new(0)),
            max_queue_depth,
        }
    }

    /// Reserve a worker slot, waiting if every slot is currently busy.
    /// Fails fast with [`PoolFull`] instead of queueing once
    /// `max_queue_depth` other callers are already waiting.
    pub async fn acquire(&self) -> Result<CodecPermit<'_>, PoolFull> {
        // A slot is free right now: no need to count this caller against
        // the queue depth at all.
        if let Ok(permit) = self.semaphore.try_acquire() {
            return Ok(CodecPermit { _permit: permit });
        }

        let queued_now = self.queued.fetch_add(1, Ordering::SeqCst) + 1;
        if queued_now > self.max_queue_depth {
            self.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(PoolFull);
        }

        let permit = self.semaphore.acquire().await;
        self.queued.fetch_sub(1, Ordering::SeqCst);

        match permit {
            Ok(permit) => Ok(CodecPermit { _permit: permit }),
            // The semaphore is never closed, so this never happens in
            // practice; treat it the same as a full pool rather than panic.
            Err(_closed) => Err(PoolFull),
        }
    }
}
