//! Session state shared between the ingestion loop and the reporter
//!
//! Counters are atomics incremented by the ingestion side and read as a
//! (possibly slightly stale) snapshot by the reporter. The detected schema is
//! a one-shot latch.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::{FrameKind, StreamSchema};

/// Per-category session counters, monotonic for the session lifetime
#[derive(Debug, Default)]
pub struct SessionCounters {
    /// Lines pulled from the transport
    pub lines_read: AtomicU64,

    /// Lines that decoded into a frame and were accepted
    pub samples_accepted: AtomicU64,

    /// Rows appended to the store
    pub samples_stored: AtomicU64,

    /// Messages handed to the publisher, per frame kind
    pub axis_published: AtomicU64,
    pub wide_published: AtomicU64,
    pub summary_published: AtomicU64,
    pub batch_published: AtomicU64,

    /// Candidates skipped by a publish gate
    pub publish_skipped: AtomicU64,

    /// Publish failures (send errors and queue overflow)
    pub publish_errors: AtomicU64,

    /// Lines rejected by decode or classification
    pub decode_errors: AtomicU64,

    /// Subset of decode errors caused by a schema mismatch
    pub schema_mismatches: AtomicU64,

    /// Diagnostic (comment) lines
    pub diagnostics: AtomicU64,

    /// Periodic reports delivered
    pub reports_sent: AtomicU64,

    /// Periodic reports that failed or timed out
    pub report_errors: AtomicU64,
}

impl SessionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_line(&self) {
        self.lines_read.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the accepted count after the increment
    pub fn record_accepted(&self) -> u64 {
        self.samples_accepted.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_stored(&self) {
        self.samples_stored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self, kind: FrameKind) {
        let counter = match kind {
            FrameKind::Axis => &self.axis_published,
            FrameKind::Wide => &self.wide_published,
            FrameKind::Summary => &self.summary_published,
            FrameKind::Batch => &self.batch_published,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_skipped(&self) {
        self.publish_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_error(&self) {
        self.publish_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_schema_mismatch(&self) {
        self.schema_mismatches.fetch_add(1, Ordering::Relaxed);
        self.record_decode_error();
    }

    pub fn record_diagnostic(&self) {
        self.diagnostics.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_report_sent(&self) {
        self.reports_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_report_error(&self) {
        self.report_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            lines_read: self.lines_read.load(Ordering::Relaxed),
            samples_accepted: self.samples_accepted.load(Ordering::Relaxed),
            samples_stored: self.samples_stored.load(Ordering::Relaxed),
            axis_published: self.axis_published.load(Ordering::Relaxed),
            wide_published: self.wide_published.load(Ordering::Relaxed),
            summary_published: self.summary_published.load(Ordering::Relaxed),
            batch_published: self.batch_published.load(Ordering::Relaxed),
            publish_skipped: self.publish_skipped.load(Ordering::Relaxed),
            publish_errors: self.publish_errors.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            schema_mismatches: self.schema_mismatches.load(Ordering::Relaxed),
            diagnostics: self.diagnostics.load(Ordering::Relaxed),
            reports_sent: self.reports_sent.load(Ordering::Relaxed),
            report_errors: self.report_errors.load(Ordering::Relaxed),
        }
    }
}

/// Counters snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountersSnapshot {
    pub lines_read: u64,
    pub samples_accepted: u64,
    pub samples_stored: u64,
    pub axis_published: u64,
    pub wide_published: u64,
    pub summary_published: u64,
    pub batch_published: u64,
    pub publish_skipped: u64,
    pub publish_errors: u64,
    pub decode_errors: u64,
    pub schema_mismatches: u64,
    pub diagnostics: u64,
    pub reports_sent: u64,
    pub report_errors: u64,
}

impl CountersSnapshot {
    /// Total messages handed to the publisher
    pub fn published(&self) -> u64 {
        self.axis_published + self.wide_published + self.summary_published + self.batch_published
    }

    /// All error categories combined
    pub fn errors(&self) -> u64 {
        self.decode_errors + self.publish_errors + self.report_errors
    }
}

/// State shared across the session's concurrent units
#[derive(Debug)]
pub struct SessionState {
    counters: SessionCounters,
    schema: OnceLock<StreamSchema>,
    active: AtomicBool,
    started_at: Instant,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            counters: SessionCounters::new(),
            schema: OnceLock::new(),
            active: AtomicBool::new(true),
            started_at: Instant::now(),
        }
    }

    pub fn counters(&self) -> &SessionCounters {
        &self.counters
    }

    /// Latch the detected schema
    ///
    /// Returns false if a schema was already latched; the first one wins.
    pub fn commit_schema(&self, schema: StreamSchema) -> bool {
        schema.is_known() && self.schema.set(schema).is_ok()
    }

    /// Detected schema, `Unknown` until committed
    pub fn schema(&self) -> StreamSchema {
        self.schema.get().copied().unwrap_or_default()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Mark the session as no longer accepting work
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_latch_is_one_way() {
        let state = SessionState::new();
        assert_eq!(state.schema(), StreamSchema::Unknown);
        assert!(!state.commit_schema(StreamSchema::Unknown));
        assert!(state.commit_schema(StreamSchema::Summary));
        assert!(!state.commit_schema(StreamSchema::Narrow(16)));
        assert_eq!(state.schema(), StreamSchema::Summary);
    }

    #[test]
    fn test_schema_mismatch_counts_as_decode_error() {
        let counters = SessionCounters::new();
        counters.record_schema_mismatch();
        let snapshot = counters.snapshot();
        assert_eq!(snapshot.schema_mismatches, 1);
        assert_eq!(snapshot.decode_errors, 1);
    }

    #[test]
    fn test_published_total() {
        let counters = SessionCounters::new();
        counters.record_published(FrameKind::Axis);
        counters.record_published(FrameKind::Axis);
        counters.record_published(FrameKind::Batch);
        let snapshot = counters.snapshot();
        assert_eq!(snapshot.axis_published, 2);
        assert_eq!(snapshot.published(), 3);
    }

    #[test]
    fn test_deactivate() {
        let state = SessionState::new();
        assert!(state.is_active());
        state.deactivate();
        assert!(!state.is_active());
    }
}
