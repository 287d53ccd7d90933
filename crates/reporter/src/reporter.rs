//! PeriodicReporter - timer-driven report task
//!
//! Runs on its own task and wall-clock interval. It only reads session state
//! (an atomic counter snapshot and the schema latch); a slow or failing
//! transmit is bounded by a timeout, logged and counted, never propagated.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use contracts::{GatewayConfig, Report, ReportTransmitter, SessionState};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::error::ReporterError;

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Sent,
    Failed,
    TimedOut,
    /// Session no longer active
    Skipped,
}

/// Totals for one reporter run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReporterSummary {
    pub ticks: u64,
    pub sent: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl ReporterSummary {
    fn record(&mut self, outcome: TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::Sent => self.sent += 1,
            TickOutcome::Failed | TickOutcome::TimedOut => self.failed += 1,
            TickOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Periodic report/heartbeat trigger
pub struct PeriodicReporter<T> {
    transmitter: T,
    interval: Duration,
    transmit_timeout: Duration,
    device: String,
    attachment: Option<PathBuf>,
    session: Arc<SessionState>,
}

impl<T: ReportTransmitter + Send + 'static> PeriodicReporter<T> {
    pub fn new(config: &GatewayConfig, transmitter: T, session: Arc<SessionState>) -> Self {
        Self {
            transmitter,
            interval: config.report.interval(),
            transmit_timeout: config.report.transmit_timeout(),
            device: config.device.name.clone(),
            attachment: None,
            session,
        }
    }

    /// Override the tick interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_transmit_timeout(mut self, timeout: Duration) -> Self {
        self.transmit_timeout = timeout;
        self
    }

    /// Store file referenced by every report
    pub fn with_attachment(mut self, path: Option<PathBuf>) -> Self {
        self.attachment = path;
        self
    }

    /// Snapshot session state into a report
    pub fn build_report(&self) -> Report {
        Report {
            generated_at: Local::now(),
            device: self.device.clone(),
            schema: self.session.schema(),
            counters: self.session.counters().snapshot(),
            attachment: self.attachment.clone(),
        }
    }

    /// Run one report attempt
    #[instrument(
        name = "periodic_reporter_tick",
        skip(self),
        fields(transmitter = %self.transmitter.name())
    )]
    pub async fn tick(&mut self) -> TickOutcome {
        if !self.session.is_active() {
            debug!("Session inactive, report skipped");
            return TickOutcome::Skipped;
        }

        let report = self.build_report();
        let name = self.transmitter.name().to_string();
        let attempt = self.transmitter.transmit(&report);
        let outcome = match time::timeout(self.transmit_timeout, attempt).await {
            Ok(Ok(())) => {
                info!(
                    transmitter = %name,
                    subject = %report.subject(),
                    samples = report.counters.samples_stored,
                    "Report sent"
                );
                TickOutcome::Sent
            }
            Ok(Err(e)) => {
                warn!(transmitter = %name, error = %e, "Report failed");
                TickOutcome::Failed
            }
            Err(_) => {
                let e = ReporterError::Timeout {
                    transmitter: name,
                    secs: self.transmit_timeout.as_secs(),
                };
                warn!(error = %e, "Report failed");
                TickOutcome::TimedOut
            }
        };

        let sent = outcome == TickOutcome::Sent;
        if sent {
            self.session.counters().record_report_sent();
        } else {
            self.session.counters().record_report_error();
        }
        observability::metrics::record_report(sent);
        outcome
    }

    /// Tick until `stop` turns true
    ///
    /// The first report goes out one full interval after start.
    pub async fn run(self, stop: watch::Receiver<bool>) -> ReporterSummary {
        let (_halt_tx, halt_rx) = watch::channel(false);
        self.run_until(stop, halt_rx).await
    }

    /// Spawn the reporter on its own task
    ///
    /// The reporter stops when `stop` turns true or when the returned handle
    /// is stopped, whichever comes first.
    pub fn spawn(self, stop: watch::Receiver<bool>) -> ReporterHandle {
        let (halt_tx, halt_rx) = watch::channel(false);
        let worker = tokio::spawn(self.run_until(stop, halt_rx));
        ReporterHandle { halt_tx, worker }
    }

    async fn run_until(
        mut self,
        mut stop: watch::Receiver<bool>,
        mut halt: watch::Receiver<bool>,
    ) -> ReporterSummary {
        let mut summary = ReporterSummary::default();
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            transmitter = %self.transmitter.name(),
            interval_secs = self.interval.as_secs_f64(),
            "Reporter started"
        );

        loop {
            tokio::select! {
                _ = wait_for_stop(&mut stop) => break,
                _ = wait_for_stop(&mut halt) => break,
                _ = ticker.tick() => {
                    let outcome = self.tick().await;
                    summary.record(outcome);
                }
            }
        }

        info!(
            ticks = summary.ticks,
            sent = summary.sent,
            failed = summary.failed,
            "Reporter stopped"
        );
        summary
    }
}

/// Resolve once the flag is true; a dropped sender never stops the waiter
async fn wait_for_stop(rx: &mut watch::Receiver<bool>) {
    let signalled = rx.wait_for(|stopped| *stopped).await.is_ok();
    if !signalled {
        std::future::pending::<()>().await;
    }
}

/// Handle to a spawned reporter
pub struct ReporterHandle {
    halt_tx: watch::Sender<bool>,
    worker: JoinHandle<ReporterSummary>,
}

impl ReporterHandle {
    /// Stop the timer and wait for an in-flight transmit to finish
    #[instrument(name = "reporter_handle_stop", skip(self))]
    pub async fn stop(self) -> ReporterSummary {
        let _ = self.halt_tx.send(true);
        match self.worker.await {
            Ok(summary) => summary,
            Err(e) => {
                error!(error = ?e, "Reporter task panicked");
                ReporterSummary::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transmitters::LogTransmitter;
    use contracts::{ContractError, DeviceConfig, StreamSchema};
    use std::sync::atomic::{AtomicU64, Ordering};

    struct ScriptedTransmitter {
        calls: Arc<AtomicU64>,
        fail: bool,
        delay: Duration,
    }

    impl ReportTransmitter for ScriptedTransmitter {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn transmit(&mut self, _report: &Report) -> Result<(), ContractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            time::sleep(self.delay).await;
            if self.fail {
                return Err(ContractError::report("scripted", "smtp down"));
            }
            Ok(())
        }
    }

    fn config() -> GatewayConfig {
        GatewayConfig::for_device(DeviceConfig::default())
    }

    fn scripted(fail: bool, delay: Duration) -> (ScriptedTransmitter, Arc<AtomicU64>) {
        let calls = Arc::new(AtomicU64::new(0));
        let transmitter = ScriptedTransmitter {
            calls: Arc::clone(&calls),
            fail,
            delay,
        };
        (transmitter, calls)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_on_interval_until_stopped() {
        let session = Arc::new(SessionState::new());
        let (transmitter, calls) = scripted(false, Duration::ZERO);
        let reporter = PeriodicReporter::new(&config(), transmitter, Arc::clone(&session))
            .with_interval(Duration::from_secs(60));

        let (_stop_tx, stop_rx) = watch::channel(false);
        let handle = reporter.spawn(stop_rx);

        time::sleep(Duration::from_secs(185)).await;
        let summary = handle.stop().await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(summary.sent, 3);
        assert_eq!(session.counters().snapshot().reports_sent, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_counted_not_propagated() {
        let session = Arc::new(SessionState::new());
        let (transmitter, _) = scripted(true, Duration::ZERO);
        let mut reporter = PeriodicReporter::new(&config(), transmitter, Arc::clone(&session));

        assert_eq!(reporter.tick().await, TickOutcome::Failed);
        assert_eq!(reporter.tick().await, TickOutcome::Failed);
        assert_eq!(session.counters().snapshot().report_errors, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_transmit_times_out() {
        let session = Arc::new(SessionState::new());
        let (transmitter, _) = scripted(false, Duration::from_secs(120));
        let mut reporter = PeriodicReporter::new(&config(), transmitter, Arc::clone(&session))
            .with_transmit_timeout(Duration::from_secs(30));

        assert_eq!(reporter.tick().await, TickOutcome::TimedOut);
        assert_eq!(session.counters().snapshot().report_errors, 1);
    }

    #[tokio::test]
    async fn test_inactive_session_skips() {
        let session = Arc::new(SessionState::new());
        session.deactivate();
        let (transmitter, calls) = scripted(false, Duration::ZERO);
        let mut reporter = PeriodicReporter::new(&config(), transmitter, session);

        assert_eq!(reporter.tick().await, TickOutcome::Skipped);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_external_stop_ends_timer_wait() {
        let session = Arc::new(SessionState::new());
        let reporter = PeriodicReporter::new(&config(), LogTransmitter::new("log"), session)
            .with_interval(Duration::from_secs(3600));

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = reporter.spawn(stop_rx);
        stop_tx.send(true).unwrap();

        let summary = time::timeout(Duration::from_secs(5), handle.stop())
            .await
            .unwrap();
        assert_eq!(summary.ticks, 0);
    }

    #[test]
    fn test_report_reflects_schema() {
        let session = Arc::new(SessionState::new());
        session.commit_schema(StreamSchema::Narrow(16));
        session.counters().record_stored();
        let reporter = PeriodicReporter::new(&config(), LogTransmitter::new("log"), session);

        let report = reporter.build_report();
        assert_eq!(report.schema, StreamSchema::Narrow(16));
        assert_eq!(report.counters.samples_stored, 1);
        assert!(report.body().contains("Mode: RAW"));
    }
}
