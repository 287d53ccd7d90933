//! Payload builders for the remote publish channel
//!
//! Every payload is a compact JSON object with a fixed key set per category.

use bytes::Bytes;
use chrono::{DateTime, Local};
use contracts::{AxisSample, ChannelBatch, CountersSnapshot, SummarySample, WideSample};
use serde_json::{Value, json};

/// Capture timestamp format shared by store rows and payloads
pub fn iso_timestamp(at: &DateTime<Local>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Device status carried on the status topic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Online,
    Offline,
    Alive,
}

impl DeviceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceStatus::Online => "online",
            DeviceStatus::Offline => "offline",
            DeviceStatus::Alive => "alive",
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

fn encode(value: Value) -> Bytes {
    Bytes::from(value.to_string())
}

/// Seconds since the first axis frame of the session
pub fn axis_time(index: u64, rate_hz: f64) -> f64 {
    round_to(index as f64 / rate_hz, 3)
}

/// Seconds since the first batch of the session, assuming back-to-back batches
pub fn batch_time(index: u64, batch_len: usize, rate_hz: f64) -> f64 {
    round_to(index as f64 * batch_len as f64 / rate_hz, 4)
}

pub fn axis_payload(sample: &AxisSample, t: f64, at: &DateTime<Local>) -> Bytes {
    encode(json!({
        "x": sample.x,
        "y": sample.y,
        "z": sample.z,
        "t": t,
        "ts": iso_timestamp(at),
    }))
}

pub fn batch_payload(batch: &ChannelBatch, index: u64, t: f64, at: &DateTime<Local>) -> Bytes {
    encode(json!({
        "samples": batch.samples,
        "batch": index,
        "t": t,
        "ts": iso_timestamp(at),
    }))
}

pub fn summary_payload(sample: &SummarySample, at: &DateTime<Local>) -> Bytes {
    encode(json!({
        "x": sample.x,
        "y": sample.y,
        "z": sample.z,
        "peak": sample.peak,
        "avg": sample.avg,
        "ts": iso_timestamp(at),
    }))
}

pub fn wide_payload(sample: &WideSample, at: &DateTime<Local>) -> Bytes {
    encode(json!({
        "x": sample.x,
        "y": sample.y,
        "z": sample.z,
        "channels": sample.channels,
        "ts": iso_timestamp(at),
    }))
}

pub fn status_payload(status: DeviceStatus, device: &str, at: &DateTime<Local>) -> Bytes {
    encode(json!({
        "status": status.as_str(),
        "device": device,
        "timestamp": iso_timestamp(at),
    }))
}

/// Liveness status with the session counters attached
pub fn heartbeat_payload(
    device: &str,
    counters: &CountersSnapshot,
    uptime_secs: u64,
    at: &DateTime<Local>,
) -> Bytes {
    encode(json!({
        "status": DeviceStatus::Alive.as_str(),
        "device": device,
        "timestamp": iso_timestamp(at),
        "uptime_secs": uptime_secs,
        "samples": counters.samples_accepted,
        "published": counters.published(),
        "errors": counters.errors(),
    }))
}
