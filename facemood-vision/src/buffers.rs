//! Scoped ownership of per-tick buffers.
//!
//! Every buffer a tick allocates (frame, grayscale plane, tensor, scores) is
//! wrapped in a [`Scoped`] handle obtained from the pipeline's [`BufferLedger`].
//! The handle is released when it goes out of scope, on the success path as
//! well as on early returns and `?` propagation, so the ledger's live count is
//! back to zero whenever a tick has ended.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Counters {
    live: AtomicUsize,
    peak: AtomicUsize,
    acquired: AtomicU64,
}

#[derive(Debug, Clone, Default)]
pub struct BufferLedger {
    counters: Arc<Counters>,
}

impl BufferLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire<T>(&self, value: T) -> Scoped<T> {
        let live = self.counters.live.fetch_add(1, Ordering::AcqRel) + 1;
        self.counters.peak.fetch_max(live, Ordering::AcqRel);
        self.counters.acquired.fetch_add(1, Ordering::Relaxed);
        Scoped {
            value,
            counters: Arc::clone(&self.counters),
        }
    }

    /// Buffers currently alive.
    pub fn live(&self) -> usize {
        self.counters.live.load(Ordering::Acquire)
    }

    /// Highest number of buffers alive at the same time.
    pub fn peak(&self) -> usize {
        self.counters.peak.load(Ordering::Acquire)
    }

    pub fn total_acquired(&self) -> u64 {
        self.counters.acquired.load(Ordering::Relaxed)
    }
}

/// A buffer owned by the current tick.
#[derive(Debug)]
pub struct Scoped<T> {
    value: T,
    counters: Arc<Counters>,
}

impl<T> Deref for Scoped<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Scoped<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T> Drop for Scoped<T> {
    fn drop(&mut self) {
        self.counters.live.fetch_sub(1, Ordering::AcqRel);
    }
}
