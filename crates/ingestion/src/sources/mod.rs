//! Line sources
//!
//! - `ReaderLineSource`: any async buffered reader (replay file, stdin)
//! - `SerialLineSource`: serial/USB-CDC device on a blocking reader thread
//! - `MockLineSource`: scripted lines for tests

mod mock;
mod reader;
mod serial;

pub use mock::MockLineSource;
pub use reader::{FileLineSource, ReaderLineSource, StdinLineSource};
pub use serial::SerialLineSource;

use contracts::{ContractError, DeviceConfig, LineSource, RawLine, SourceKind};
use tracing::info;

use crate::error::{IngestionError, Result};

/// Source selected by `DeviceConfig::source`
pub enum DeviceSource {
    Serial(SerialLineSource),
    File(FileLineSource),
    Stdin(StdinLineSource),
}

impl DeviceSource {
    /// Open the configured transport
    ///
    /// # Errors
    /// Missing port/path or a transport that cannot be opened.
    pub async fn open(config: &DeviceConfig) -> Result<Self> {
        let source = match config.source {
            SourceKind::Serial => {
                let port = config.port.as_deref().ok_or_else(|| {
                    IngestionError::source_open(&config.name, "serial source needs a port")
                })?;
                let source =
                    SerialLineSource::open(port, config.baud_rate, config.read_timeout())
                        .map_err(|e| IngestionError::source_open(&config.name, e.to_string()))?;
                Self::Serial(source)
            }
            SourceKind::File => {
                let path = config.path.as_deref().ok_or_else(|| {
                    IngestionError::source_open(&config.name, "file source needs a path")
                })?;
                let source = ReaderLineSource::open_file(path)
                    .await
                    .map_err(|e| IngestionError::source_open(&config.name, e.to_string()))?;
                Self::File(source)
            }
            SourceKind::Stdin => Self::Stdin(ReaderLineSource::stdin()),
        };
        info!(device = %config.name, source = %source.name(), "Source opened");
        Ok(source)
    }
}

impl LineSource for DeviceSource {
    fn name(&self) -> &str {
        match self {
            Self::Serial(s) => s.name(),
            Self::File(s) => s.name(),
            Self::Stdin(s) => s.name(),
        }
    }

    async fn next_line(&mut self) -> std::result::Result<Option<RawLine>, ContractError> {
        match self {
            Self::Serial(s) => s.next_line().await,
            Self::File(s) => s.next_line().await,
            Self::Stdin(s) => s.next_line().await,
        }
    }

    async fn close(&mut self) -> std::result::Result<(), ContractError> {
        match self {
            Self::Serial(s) => s.close().await,
            Self::File(s) => s.close().await,
            Self::Stdin(s) => s.close().await,
        }
    }
}

/// Strip a trailing `\n` or `\r\n`
pub(crate) fn strip_terminator(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
}
