//! MemoryWriter - in-memory row writer for tests and dry runs

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use contracts::{ContractError, RowWriter};

/// Shared view of what a MemoryWriter received
#[derive(Debug, Default)]
pub struct WriterLog {
    rows: Mutex<Vec<Vec<String>>>,
    flushes: AtomicU64,
    closed: AtomicBool,
    fail_writes: AtomicBool,
}

impl WriterLog {
    /// All rows, header first
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.rows.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Rows whose first field is the `x` column name
    pub fn header_writes(&self) -> usize {
        self.rows().iter().filter(|r| r.first().is_some_and(|f| f == "x")).count()
    }

    pub fn flushes(&self) -> u64 {
        self.flushes.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Make every later write fail (simulates a full disk)
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }
}

/// Row writer that records into a shared `WriterLog`
pub struct MemoryWriter {
    name: String,
    log: Arc<WriterLog>,
}

impl MemoryWriter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            log: Arc::new(WriterLog::default()),
        }
    }

    pub fn log(&self) -> Arc<WriterLog> {
        Arc::clone(&self.log)
    }
}

impl RowWriter for MemoryWriter {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_row(&mut self, fields: &[String]) -> Result<(), ContractError> {
        if self.log.fail_writes.load(Ordering::SeqCst) || self.log.is_closed() {
            return Err(ContractError::sink_write(&self.name, "write rejected"));
        }
        let mut rows = self
            .log
            .rows
            .lock()
            .map_err(|_| ContractError::sink_write(&self.name, "row log poisoned"))?;
        rows.push(fields.to_vec());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ContractError> {
        self.log.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) -> Result<(), ContractError> {
        self.log.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
