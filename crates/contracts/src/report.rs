//! Report - PeriodicReporter output

use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::{ContractError, CountersSnapshot, StreamSchema};

/// Periodic report built from a snapshot of session state
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Local>,
    pub device: String,
    pub schema: StreamSchema,
    pub counters: CountersSnapshot,

    /// Store file to attach, if the store has one
    pub attachment: Option<PathBuf>,
}

impl Report {
    /// Subject line, e.g. `SensorTile Report - 2026-02-01 14:05`
    pub fn subject(&self) -> String {
        format!(
            "{} Report - {}",
            self.device,
            self.generated_at.format("%Y-%m-%d %H:%M")
        )
    }

    /// Plain-text body
    pub fn body(&self) -> String {
        let file = self
            .attachment
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "-".to_string());

        format!(
            "{} Data Report\n\nGenerated: {}\nMode: {}\nSamples: {}\nErrors: {}\nFile: {}\n",
            self.device,
            self.generated_at.format("%Y-%m-%dT%H:%M:%S%.6f"),
            self.schema.mode_name(),
            self.counters.samples_stored,
            self.counters.errors(),
            file,
        )
    }
}

/// Report transmit primitive (message composer + transmit)
#[trait_variant::make(ReportTransmitter: Send)]
pub trait LocalReportTransmitter {
    /// Transmitter name (used for logging)
    fn name(&self) -> &str;

    /// Deliver one report
    async fn transmit(&mut self, report: &Report) -> Result<(), ContractError>;
}
