//! Gateway metric recording
//!
//! Thin helpers over the `metrics` facade so metric names live in one place.
//! All names carry the `gateway_` prefix.

use std::fmt;

use contracts::{FrameKind, StreamSchema};
use metrics::{counter, gauge, histogram};

/// How one input line ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// Decoded and dispatched
    Accepted,
    /// Comment-marker line
    Diagnostic,
    /// Empty after trimming
    Blank,
    /// Decode or classification failure
    Rejected,
}

impl LineOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            LineOutcome::Accepted => "accepted",
            LineOutcome::Diagnostic => "diagnostic",
            LineOutcome::Blank => "blank",
            LineOutcome::Rejected => "rejected",
        }
    }
}

/// Count one input line and record its processing time
pub fn record_line(outcome: LineOutcome, process_us: f64) {
    counter!("gateway_lines_total", "outcome" => outcome.as_str()).increment(1);
    histogram!("gateway_line_process_us").record(process_us);
}

/// Count a rejected line by reason (`too_short`, `malformed`, ...)
pub fn record_rejection(reason: &'static str) {
    counter!("gateway_lines_rejected_total", "reason" => reason).increment(1);
}

pub fn record_sample_stored(flushed: bool) {
    counter!("gateway_samples_stored_total").increment(1);
    if flushed {
        counter!("gateway_store_flushes_total").increment(1);
    }
}

pub fn record_published(kind: FrameKind) {
    counter!("gateway_messages_published_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_publish_gated(kind: FrameKind) {
    counter!("gateway_messages_gated_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_publish_dropped(kind: FrameKind) {
    counter!("gateway_publish_errors_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_report(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("gateway_reports_total", "status" => status).increment(1);
}

/// Latch the detected schema as a labelled gauge
pub fn record_schema(schema: StreamSchema) {
    let channels = match schema {
        StreamSchema::Narrow(channels) => channels as f64,
        StreamSchema::Summary | StreamSchema::Unknown => 0.0,
    };
    gauge!("gateway_schema_detected", "mode" => schema.mode_name()).set(1.0);
    gauge!("gateway_schema_channels").set(channels);
}

/// Online mean/min/max/stddev (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.mean }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            count: self.count,
            min: self.min,
            max: self.max,
            mean: self.mean(),
            std_dev: self.std_dev(),
        }
    }
}

/// Frozen `RunningStats`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            return f.write_str("N/A");
        }
        write!(
            f,
            "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
            self.min, self.max, self.mean, self.std_dev, self.count
        )
    }
}
