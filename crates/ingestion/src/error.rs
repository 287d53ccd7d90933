//! Ingestion error types

use contracts::ContractError;
use dispatcher::DispatcherError;
use thiserror::Error;

use crate::ingestor::IngestState;

/// Session-ending errors
///
/// Per-line failures are never errors here; they are counted rejections.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Opening the device transport failed
    #[error("failed to open source '{source_name}': {message}")]
    SourceOpen {
        source_name: String,
        message: String,
    },

    /// Reading from the device transport failed
    #[error("transport failure: {0}")]
    Transport(#[source] ContractError),

    /// Store append/flush/close failed
    #[error("store failure: {0}")]
    Store(#[from] DispatcherError),

    /// Operation on a drained session
    #[error("session is {state:?}, no further operations accepted")]
    SessionClosed { state: IngestState },
}

impl IngestionError {
    pub fn source_open(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceOpen {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

/// Ingestion Result alias
pub type Result<T> = std::result::Result<T, IngestionError>;
