//! Reporter error types

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReporterError {
    /// Writing into the outbox failed
    #[error("spool '{}' error: {message}", path.display())]
    Spool { path: PathBuf, message: String },

    /// Report serialization failed
    #[error("report encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Transmit exceeded its time bound
    #[error("transmit via '{transmitter}' timed out after {secs}s")]
    Timeout { transmitter: String, secs: u64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReporterError {
    pub fn spool(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Spool {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<ReporterError> for contracts::ContractError {
    fn from(e: ReporterError) -> Self {
        contracts::ContractError::report("reporter", e.to_string())
    }
}
