//! Line source over an async buffered reader

use std::path::Path;

use contracts::{ContractError, LineSource, RawLine};
use tokio::fs::File;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tracing::debug;

use super::strip_terminator;

/// Replay-file source
pub type FileLineSource = ReaderLineSource<BufReader<File>>;

/// Standard-input source
pub type StdinLineSource = ReaderLineSource<BufReader<Stdin>>;

pub struct ReaderLineSource<R> {
    name: String,
    reader: Option<R>,
    // Partial line survives a cancelled read
    pending: Vec<u8>,
}

impl<R> ReaderLineSource<R> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            reader: Some(reader),
            pending: Vec::new(),
        }
    }
}

impl FileLineSource {
    pub async fn open_file(path: &Path) -> Result<Self, ContractError> {
        let name = path.display().to_string();
        let file = File::open(path)
            .await
            .map_err(|e| ContractError::transport(&name, e.to_string()))?;
        Ok(Self::new(name, BufReader::new(file)))
    }
}

impl StdinLineSource {
    pub fn stdin() -> Self {
        Self::new("stdin", BufReader::new(io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin + Send> LineSource for ReaderLineSource<R> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_line(&mut self) -> Result<Option<RawLine>, ContractError> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        let read = reader
            .read_until(b'\n', &mut self.pending)
            .await
            .map_err(|e| ContractError::transport(&self.name, e.to_string()))?;

        if read == 0 && self.pending.is_empty() {
            return Ok(None);
        }

        let mut line = std::mem::take(&mut self.pending);
        strip_terminator(&mut line);
        Ok(Some(RawLine::new(line)))
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        if self.reader.take().is_some() {
            debug!(source = %self.name, "Reader closed");
        }
        Ok(())
    }
}
