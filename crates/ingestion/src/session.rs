//! Session runner: ingest, stop the reporter, drain
//!
//! Teardown always runs, including after a fatal transport or store error,
//! so the final flush and offline status are never skipped.

use std::time::Duration;

use contracts::{CountersSnapshot, LineSource, StreamSchema};
use dispatcher::SinkState;
use observability::StatsSummary;
use reporter::{ReporterHandle, ReporterSummary};
use tokio::sync::watch;
use tracing::{error, info};

use crate::error::Result;
use crate::ingestor::{StopReason, StreamIngestor};

/// Final statistics of one session
#[derive(Debug, Clone)]
pub struct SessionSummary {
    /// `None` when the read loop ended with an error
    pub reason: Option<StopReason>,
    pub counters: CountersSnapshot,
    pub schema: StreamSchema,
    pub uptime: Duration,
    pub store: Option<SinkState>,
    pub offline_published: bool,
    pub latency_us: StatsSummary,
    pub reporter: Option<ReporterSummary>,
}

impl SessionSummary {
    /// Samples accepted per second of uptime
    pub fn accept_rate(&self) -> f64 {
        let secs = self.uptime.as_secs_f64();
        if secs > 0.0 {
            self.counters.samples_accepted as f64 / secs
        } else {
            0.0
        }
    }

    fn log(&self) {
        let c = &self.counters;
        info!(
            reason = ?self.reason,
            schema = %self.schema,
            uptime_secs = self.uptime.as_secs_f64(),
            lines = c.lines_read,
            accepted = c.samples_accepted,
            stored = c.samples_stored,
            published = c.published(),
            gated = c.publish_skipped,
            decode_errors = c.decode_errors,
            schema_mismatches = c.schema_mismatches,
            publish_errors = c.publish_errors,
            reports_sent = c.reports_sent,
            report_errors = c.report_errors,
            accept_rate = self.accept_rate(),
            latency_us = %self.latency_us,
            "Session summary"
        );
    }
}

/// Drive one session from first line to closed transports
///
/// The reporter is stopped before teardown so no report races the final
/// flush. The first error wins: a read-loop failure is returned even when
/// teardown also fails.
pub async fn run_session<S: LineSource>(
    mut ingestor: StreamIngestor<S>,
    reporter: Option<ReporterHandle>,
    mut stop: watch::Receiver<bool>,
) -> Result<SessionSummary> {
    let run_result = ingestor.run(&mut stop).await;
    if let Err(e) = &run_result {
        error!(error = %e, "Ingestion ended with error");
    }

    let reporter = match reporter {
        Some(handle) => Some(handle.stop().await),
        None => None,
    };

    let drain_result = ingestor.drain().await;
    let (offline_published, store) = match &drain_result {
        Ok(report) => (report.offline_published, report.store),
        Err(_) => (false, ingestor.dispatcher().store_state()),
    };

    let session = ingestor.session();
    let summary = SessionSummary {
        reason: run_result.as_ref().ok().copied(),
        counters: session.counters().snapshot(),
        schema: session.schema(),
        uptime: session.uptime(),
        store,
        offline_published,
        latency_us: ingestor.latency_summary(),
        reporter,
    };
    summary.log();

    run_result?;
    drain_result?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestionError;
    use crate::sources::MockLineSource;
    use contracts::{DeviceConfig, GatewayConfig, SessionState};
    use dispatcher::{Dispatcher, MemoryWriter, SampleStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_store_is_flushed_after_transport_failure() {
        let config = GatewayConfig::for_device(DeviceConfig::default());
        let session = Arc::new(SessionState::new());
        let writer = MemoryWriter::new("mem");
        let rows = writer.log();
        let dispatcher = Dispatcher::new(&config, Arc::clone(&session))
            .with_store(SampleStore::new(Box::new(writer), config.store.flush_every));
        let source = MockLineSource::from_lines(["1,2,3,4,5", "6,7,8,9,10"]).fail("unplugged");
        let ingestor = StreamIngestor::new(&config, source, dispatcher, session);

        let (_tx, stop) = watch::channel(false);
        let result = run_session(ingestor, None, stop).await;

        assert!(matches!(result, Err(IngestionError::Transport(_))));
        assert_eq!(rows.rows().len(), 3);
        assert_eq!(rows.flushes(), 1);
        assert!(rows.is_closed());
    }
}
