//! Publisher worker metrics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters for one publisher worker
#[derive(Debug, Default)]
pub struct PublisherMetrics {
    /// Approximate queue depth
    queue_len: AtomicUsize,
    /// Messages the transport accepted
    sent: AtomicU64,
    /// Transport send failures
    failed: AtomicU64,
    /// Messages dropped on a full queue
    dropped: AtomicU64,
}

impl PublisherMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn inc_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn inc_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PublisherSnapshot {
        PublisherSnapshot {
            queue_len: self.queue_len(),
            sent: self.sent(),
            failed: self.failed(),
            dropped: self.dropped(),
        }
    }
}

/// Point-in-time copy of `PublisherMetrics`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublisherSnapshot {
    pub queue_len: usize,
    pub sent: u64,
    pub failed: u64,
    pub dropped: u64,
}
