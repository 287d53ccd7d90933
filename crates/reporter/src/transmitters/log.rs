//! LogTransmitter - writes the report into the log

use contracts::{ContractError, Report, ReportTransmitter};
use tracing::info;

pub struct LogTransmitter {
    name: String,
}

impl LogTransmitter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl ReportTransmitter for LogTransmitter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn transmit(&mut self, report: &Report) -> Result<(), ContractError> {
        info!(
            transmitter = %self.name,
            subject = %report.subject(),
            body = %report.body(),
            "Report"
        );
        Ok(())
    }
}
