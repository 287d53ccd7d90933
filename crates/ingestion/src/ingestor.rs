//! StreamIngestor - the per-line control loop
//!
//! State machine:
//!
//! ```text
//! AwaitingSchema --schema commit--> Streaming --end of input / stop--> Draining --> Closed
//! ```
//!
//! Tagged framing starts in `Streaming` and never consults the classifier;
//! frames of the other framing are rejected. One line is handled at a time:
//! decode, classify, dispatch. Only the read wait suspends, and it is
//! bounded by the read timeout so a stop signal is seen promptly.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::Local;
use contracts::{
    FrameKind, Framing, GatewayConfig, LineRejection, LineSource, RawLine, SessionState,
    StreamSchema,
};
use dispatcher::{DispatchOutcome, Dispatcher, SinkState};
use observability::metrics::{self, LineOutcome};
use observability::{RunningStats, StatsSummary};
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::classifier::{Classification, FormatClassifier};
use crate::decoder::FrameDecoder;
use crate::error::{IngestionError, Result};

/// Ingestor lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestState {
    AwaitingSchema,
    Streaming,
    Draining,
    Closed,
}

/// Why the read loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Transport reported end of input
    EndOfInput,
    /// External stop signal
    StopSignal,
    /// Configured line limit reached
    LineLimit,
}

/// Teardown results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Final offline status went out
    pub offline_published: bool,
    /// Store state before close
    pub store: Option<SinkState>,
}

/// Line-at-a-time ingestion over one line source
pub struct StreamIngestor<S> {
    source: S,
    decoder: FrameDecoder,
    classifier: FormatClassifier,
    dispatcher: Dispatcher,
    session: Arc<SessionState>,
    framing: Framing,
    state: IngestState,
    read_timeout: Duration,
    progress_every: u64,
    line_limit: Option<u64>,
    latency_us: RunningStats,
}

impl<S: LineSource> StreamIngestor<S> {
    pub fn new(
        config: &GatewayConfig,
        source: S,
        dispatcher: Dispatcher,
        session: Arc<SessionState>,
    ) -> Self {
        let state = match config.ingest.framing {
            Framing::Tagged => IngestState::Streaming,
            Framing::Untagged => IngestState::AwaitingSchema,
        };
        Self {
            source,
            decoder: FrameDecoder::new(&config.decoder),
            classifier: FormatClassifier::new(),
            dispatcher,
            session,
            framing: config.ingest.framing,
            state,
            read_timeout: config.device.read_timeout(),
            progress_every: config.ingest.progress_every.max(1),
            line_limit: None,
            latency_us: RunningStats::default(),
        }
    }

    /// Stop after this many lines (counted across the session)
    pub fn with_line_limit(mut self, limit: Option<u64>) -> Self {
        self.line_limit = limit;
        self
    }

    pub fn state(&self) -> IngestState {
        self.state
    }

    pub fn schema(&self) -> StreamSchema {
        self.classifier.schema()
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Per-line processing time, in microseconds since arrival
    pub fn latency_summary(&self) -> StatsSummary {
        self.latency_us.summary()
    }

    /// Pull and process lines until end of input, a stop signal or the line limit
    ///
    /// # Errors
    /// Transport read failures and store failures. Both leave the ingestor
    /// ready for `drain`.
    #[instrument(name = "stream_ingestor_run", skip(self, stop), fields(source = %self.source.name()))]
    pub async fn run(&mut self, stop: &mut watch::Receiver<bool>) -> Result<StopReason> {
        self.ensure_open()?;
        info!(state = ?self.state, "Ingestion started");

        loop {
            if self.limit_reached() {
                info!(limit = ?self.line_limit, "Line limit reached");
                return Ok(StopReason::LineLimit);
            }
            if *stop.borrow() {
                return Ok(StopReason::StopSignal);
            }

            let read = tokio::select! {
                biased;
                _ = stop_requested(stop) => return Ok(StopReason::StopSignal),
                read = time::timeout(self.read_timeout, self.source.next_line()) => read,
            };

            match read {
                Err(_) => trace!("Read wait timed out"),
                Ok(Ok(Some(line))) => {
                    self.process_line(&line)?;
                }
                Ok(Ok(None)) => {
                    info!("End of input");
                    return Ok(StopReason::EndOfInput);
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Transport read failed");
                    return Err(IngestionError::Transport(e));
                }
            }
        }
    }

    /// Handle one raw line
    ///
    /// Decode and classification failures are counted and reported as
    /// `LineOutcome::Rejected`; only store failures are errors.
    pub fn process_line(&mut self, line: &RawLine) -> Result<LineOutcome> {
        self.ensure_open()?;
        self.session.counters().record_line();

        let outcome = self.handle_line(line)?;

        let elapsed_us = line.arrived_at.elapsed().as_secs_f64() * 1e6;
        self.latency_us.push(elapsed_us);
        metrics::record_line(outcome, elapsed_us);
        Ok(outcome)
    }

    /// Teardown: flush store, final status, close transports, close store
    ///
    /// The reporter must already be stopped. Every step runs even if an
    /// earlier one failed; the first store error is returned.
    #[instrument(name = "stream_ingestor_drain", skip(self), fields(source = %self.source.name()))]
    pub async fn drain(&mut self) -> Result<DrainReport> {
        self.ensure_open()?;
        self.state = IngestState::Draining;
        self.session.deactivate();
        info!("Draining");

        let mut first_error = None;
        if let Err(e) = self.dispatcher.flush_store() {
            error!(error = %e, "Final store flush failed");
            first_error.get_or_insert(IngestionError::Store(e));
        }

        let offline_published = self.dispatcher.close_publisher().await;

        if let Err(e) = self.source.close().await {
            warn!(error = %e, "Source close failed");
        }

        let store = self.dispatcher.store_state();
        if let Err(e) = self.dispatcher.close_store() {
            error!(error = %e, "Store close failed");
            first_error.get_or_insert(IngestionError::Store(e));
        }

        self.state = IngestState::Closed;
        info!(offline_published, "Session closed");

        match first_error {
            Some(e) => Err(e),
            None => Ok(DrainReport {
                offline_published,
                store,
            }),
        }
    }

    fn handle_line(&mut self, line: &RawLine) -> Result<LineOutcome> {
        let Some(text) = line.as_text() else {
            return Ok(self.reject(LineRejection::NotText));
        };
        if text.trim().is_empty() {
            return Ok(LineOutcome::Blank);
        }

        let frame = match self.decoder.decode(text) {
            Ok(frame) => frame,
            Err(LineRejection::Diagnostic(message)) => {
                self.session.counters().record_diagnostic();
                debug!(line = %message, "Device diagnostic");
                return Ok(LineOutcome::Diagnostic);
            }
            Err(rejection) => return Ok(self.reject(rejection)),
        };

        if !self.framing.admits(frame.kind()) {
            return Ok(self.reject(LineRejection::FramingMismatch {
                framing: self.framing,
                got: frame.kind(),
            }));
        }

        match self.classifier.observe(&frame) {
            Ok(Classification::Committed(schema)) => self.on_schema_committed(schema)?,
            Ok(Classification::Matched | Classification::Bypassed) => {}
            Err(rejection) => return Ok(self.reject(rejection)),
        }

        let captured_at = Local::now();
        let outcome = self.dispatcher.dispatch(&frame, &captured_at)?;
        record_dispatch(frame.kind(), &outcome);

        let accepted = self.session.counters().record_accepted();
        if accepted.is_multiple_of(self.progress_every) {
            self.log_progress();
        }
        Ok(LineOutcome::Accepted)
    }

    fn on_schema_committed(&mut self, schema: StreamSchema) -> Result<()> {
        self.session.commit_schema(schema);
        self.dispatcher.ensure_header(schema)?;
        metrics::record_schema(schema);
        info!(
            mode = schema.mode_name(),
            schema = %schema,
            columns = schema.columns().len(),
            "Mode detected"
        );
        if self.state == IngestState::AwaitingSchema {
            self.state = IngestState::Streaming;
        }
        Ok(())
    }

    fn reject(&self, rejection: LineRejection) -> LineOutcome {
        let counters = self.session.counters();
        match rejection {
            LineRejection::SchemaMismatch { .. } => counters.record_schema_mismatch(),
            _ => counters.record_decode_error(),
        }
        metrics::record_rejection(rejection_label(&rejection));
        debug!(reason = %rejection, "Line rejected");
        LineOutcome::Rejected
    }

    fn log_progress(&self) {
        let snapshot = self.session.counters().snapshot();
        info!(
            accepted = snapshot.samples_accepted,
            stored = snapshot.samples_stored,
            axis = snapshot.axis_published,
            batch = snapshot.batch_published,
            summary = snapshot.summary_published,
            wide = snapshot.wide_published,
            gated = snapshot.publish_skipped,
            errors = snapshot.errors(),
            "Progress"
        );
    }

    fn limit_reached(&self) -> bool {
        self.line_limit.is_some_and(|limit| {
            self.session.counters().lines_read.load(Ordering::Relaxed) >= limit
        })
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            IngestState::Draining | IngestState::Closed => {
                Err(IngestionError::SessionClosed { state: self.state })
            }
            IngestState::AwaitingSchema | IngestState::Streaming => Ok(()),
        }
    }
}

fn record_dispatch(kind: FrameKind, outcome: &DispatchOutcome) {
    if outcome.stored {
        metrics::record_sample_stored(outcome.flushed);
    }
    if outcome.published {
        metrics::record_published(kind);
    }
    if outcome.gated {
        metrics::record_publish_gated(kind);
    }
    if outcome.dropped {
        metrics::record_publish_dropped(kind);
    }
}

fn rejection_label(rejection: &LineRejection) -> &'static str {
    match rejection {
        LineRejection::Diagnostic(_) => "diagnostic",
        LineRejection::TooShort { .. } => "too_short",
        LineRejection::UnsupportedArity { .. } => "unsupported_arity",
        LineRejection::WrongArity { .. } => "wrong_arity",
        LineRejection::Malformed { .. } => "malformed",
        LineRejection::NotText => "not_text",
        LineRejection::SchemaMismatch { .. } => "schema_mismatch",
        LineRejection::FramingMismatch { .. } => "framing_mismatch",
    }
}

/// Resolve once the flag is true; a dropped sender never stops the loop
async fn stop_requested(rx: &mut watch::Receiver<bool>) {
    let signalled = rx.wait_for(|stopped| *stopped).await.is_ok();
    if !signalled {
        std::future::pending::<()>().await;
    }
}
