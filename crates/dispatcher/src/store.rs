//! SampleStore - append-only row sink with header-on-first-write
//!
//! Rows are buffered by the underlying writer and force-flushed every
//! `flush_every` rows, bounding loss on crash to less than one batch.

use std::path::Path;

use chrono::{DateTime, Local};
use contracts::{Frame, RowWriter, StreamSchema};
use tracing::{debug, info, instrument};

use crate::error::DispatcherError;
use crate::payload::iso_timestamp;

/// Mutable sink state, owned by the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkState {
    /// Rows appended (monotonic)
    pub sample_count: u64,

    /// Header written
    pub initialized: bool,

    /// Rows appended since the last forced flush
    pub pending: u64,

    /// Forced flushes so far
    pub flush_count: u64,
}

/// Result of one append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    pub sample_count: u64,

    /// This append triggered a forced flush
    pub flushed: bool,
}

/// Append-only store over a row writer
pub struct SampleStore {
    writer: Box<dyn RowWriter>,
    schema: StreamSchema,
    state: SinkState,
    flush_every: u64,
    closed: bool,
}

impl SampleStore {
    /// Create a store; `flush_every` is clamped to at least 1
    pub fn new(writer: Box<dyn RowWriter>, flush_every: u64) -> Self {
        Self {
            writer,
            schema: StreamSchema::Unknown,
            state: SinkState::default(),
            flush_every: flush_every.max(1),
            closed: false,
        }
    }

    pub fn name(&self) -> &str {
        self.writer.name()
    }

    pub fn state(&self) -> SinkState {
        self.state
    }

    pub fn schema(&self) -> StreamSchema {
        self.schema
    }

    /// Backing file, if the writer has one
    pub fn location(&self) -> Option<&Path> {
        self.writer.location()
    }

    /// Write the column header for `schema` on the first call only
    ///
    /// Returns true if the header was written by this call. `Unknown` never
    /// writes a header.
    #[instrument(name = "sample_store_ensure_header", skip(self), fields(sink = %self.name()))]
    pub fn ensure_header(&mut self, schema: StreamSchema) -> Result<bool, DispatcherError> {
        self.check_open()?;
        if self.state.initialized || !schema.is_known() {
            return Ok(false);
        }

        let columns = schema.columns();
        self.writer.write_row(&columns)?;
        self.schema = schema;
        self.state.initialized = true;

        info!(sink = %self.name(), columns = ?columns, "Store header written");
        Ok(true)
    }

    /// Append one row stamped with `captured_at`
    ///
    /// # Errors
    /// Writer failures are fatal; a frame that does not fit the committed
    /// schema is rejected without writing.
    pub fn append(
        &mut self,
        frame: &Frame,
        captured_at: &DateTime<Local>,
    ) -> Result<AppendOutcome, DispatcherError> {
        self.check_open()?;
        if !self.state.initialized {
            return Err(DispatcherError::HeaderMissing {
                sink_name: self.name().to_string(),
            });
        }

        let mut row = self.row_values(frame)?;
        row.push(iso_timestamp(captured_at));
        self.writer.write_row(&row)?;

        self.state.sample_count += 1;
        self.state.pending += 1;

        let flushed = self.state.sample_count.is_multiple_of(self.flush_every);
        if flushed {
            self.flush()?;
            info!(
                sink = %self.name(),
                samples = self.state.sample_count,
                "Store progress"
            );
        }

        Ok(AppendOutcome {
            sample_count: self.state.sample_count,
            flushed,
        })
    }

    /// Force buffered rows to storage
    pub fn flush(&mut self) -> Result<(), DispatcherError> {
        self.check_open()?;
        self.writer.flush()?;
        self.state.pending = 0;
        self.state.flush_count += 1;
        debug!(sink = %self.name(), flushes = self.state.flush_count, "Store flushed");
        Ok(())
    }

    /// Release the writer; the store rejects every later call
    #[instrument(name = "sample_store_close", skip(self), fields(sink = %self.name()))]
    pub fn close(&mut self) -> Result<(), DispatcherError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.writer.close()?;
        info!(
            sink = %self.name(),
            samples = self.state.sample_count,
            "Store closed"
        );
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn check_open(&self) -> Result<(), DispatcherError> {
        if self.closed {
            return Err(DispatcherError::Closed {
                name: self.name().to_string(),
            });
        }
        Ok(())
    }

    fn row_values(&self, frame: &Frame) -> Result<Vec<String>, DispatcherError> {
        let values: Vec<i32> = match (frame, self.schema) {
            (Frame::Summary(s), StreamSchema::Summary) => vec![s.x, s.y, s.z, s.peak, s.avg],
            (Frame::Wide(w), StreamSchema::Narrow(width)) if w.channels.len() == width => {
                let mut values = Vec::with_capacity(3 + width);
                values.extend([w.x, w.y, w.z]);
                values.extend_from_slice(&w.channels);
                values
            }
            _ => {
                return Err(DispatcherError::Unstorable {
                    sink_name: self.name().to_string(),
                    kind: frame.kind(),
                    schema: self.schema,
                })
            }
        };
        Ok(values.into_iter().map(|v| v.to_string()).collect())
    }
}
