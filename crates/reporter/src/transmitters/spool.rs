//! SpoolTransmitter - drops reports into an outbox directory
//!
//! Each report becomes `report_<stamp>.json` (subject, recipients, body and
//! the raw counters) plus a copy of the store file taken at report time. An
//! external mailer picks the outbox up.

use std::path::{Path, PathBuf};

use contracts::{ContractError, Report, ReportTransmitter};
use serde_json::json;
use tokio::fs;
use tracing::{debug, instrument};

use crate::error::ReporterError;

pub struct SpoolTransmitter {
    name: String,
    dir: PathBuf,
    recipients: Vec<String>,
}

impl SpoolTransmitter {
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>, recipients: Vec<String>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            recipients,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn spool(&self, report: &Report) -> Result<PathBuf, ReporterError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ReporterError::spool(&self.dir, e.to_string()))?;

        let stamp = report.generated_at.format("%Y%m%d_%H%M%S").to_string();
        let attachment = match report.attachment.as_deref() {
            Some(source) => self.copy_attachment(source, &stamp).await?,
            None => None,
        };

        let document = json!({
            "subject": report.subject(),
            "recipients": self.recipients,
            "body": report.body(),
            "attachment": attachment,
            "report": report,
        });
        let path = self.dir.join(format!("report_{stamp}.json"));
        fs::write(&path, serde_json::to_vec_pretty(&document)?)
            .await
            .map_err(|e| ReporterError::spool(&path, e.to_string()))?;
        Ok(path)
    }

    /// Copy the store file; a store that has not been created yet is skipped
    async fn copy_attachment(
        &self,
        source: &Path,
        stamp: &str,
    ) -> Result<Option<PathBuf>, ReporterError> {
        if !fs::try_exists(source).await.unwrap_or(false) {
            debug!(transmitter = %self.name, path = %source.display(), "No store file yet");
            return Ok(None);
        }
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "samples.csv".to_string());
        let target = self.dir.join(format!("report_{stamp}_{file_name}"));
        fs::copy(source, &target)
            .await
            .map_err(|e| ReporterError::spool(&target, e.to_string()))?;
        Ok(Some(target))
    }
}

impl ReportTransmitter for SpoolTransmitter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "spool_transmitter_transmit",
        skip(self, report),
        fields(transmitter = %self.name)
    )]
    async fn transmit(&mut self, report: &Report) -> Result<(), ContractError> {
        let path = self
            .spool(report)
            .await
            .map_err(|e| ContractError::report(&self.name, e.to_string()))?;
        debug!(transmitter = %self.name, path = %path.display(), "Report spooled");
        Ok(())
    }
}
