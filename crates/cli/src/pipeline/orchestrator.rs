//! Gateway orchestrator - wires one session together.
//!
//! Startup order: source → store → publisher (last will registered) →
//! online status → reporter → ingestion. Teardown is owned by
//! `ingestion::run_session`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Local;
use contracts::{GatewayConfig, ReportMode, SessionState, TransportKind};
use dispatcher::{
    CsvFileWriter, DeviceStatus, Dispatcher, LogTransport, PublisherHandle, SampleStore,
    UdpTransport, status_message,
};
use ingestion::{DeviceSource, StreamIngestor, run_session};
use reporter::{
    HeartbeatTransmitter, LogTransmitter, PeriodicReporter, ReporterHandle, SpoolTransmitter,
};
use tokio::sync::watch;
use tracing::{info, warn};

use super::GatewayStats;

/// Everything needed to run one session
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    pub config: GatewayConfig,

    /// Stop after this many lines (None = unlimited)
    pub max_lines: Option<u64>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main session orchestrator
pub struct Gateway {
    options: GatewayOptions,
}

impl Gateway {
    pub fn new(options: GatewayOptions) -> Self {
        Self { options }
    }

    /// Run one session until end of input, the line limit or `stop`
    pub async fn run(self, stop: watch::Receiver<bool>) -> Result<GatewayStats> {
        let start_time = Instant::now();
        let config = &self.options.config;

        if let Some(port) = self.options.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let session = Arc::new(SessionState::new());

        info!(device = %config.device.name, source = ?config.device.source, "Opening device...");
        let source = DeviceSource::open(&config.device)
            .await
            .context("Failed to open device source")?;

        let mut dispatcher = Dispatcher::new(config, Arc::clone(&session));

        let store_path = if config.store.enabled {
            let path = store_path(config);
            let writer = CsvFileWriter::new("csv", &path);
            dispatcher = dispatcher.with_store(SampleStore::new(
                Box::new(writer),
                config.store.flush_every,
            ));
            info!(path = %path.display(), flush_every = config.store.flush_every, "Store configured");
            Some(path)
        } else {
            None
        };

        if config.publish.enabled {
            let publisher = spawn_publisher(config, Arc::clone(&session))
                .await
                .context("Failed to start publisher")?;
            dispatcher = dispatcher.with_publisher(publisher);
            if !dispatcher.publish_status(DeviceStatus::Online).await {
                warn!("Online status was not delivered");
            }
        }

        let transport = config
            .publish
            .enabled
            .then(|| format!("{:?}", config.publish.transport));

        let reporter = spawn_reporter(
            config,
            &dispatcher,
            Arc::clone(&session),
            store_path.clone(),
            stop.clone(),
        );

        let ingestor = StreamIngestor::new(config, source, dispatcher, session)
            .with_line_limit(self.options.max_lines);

        info!(max_lines = ?self.options.max_lines, "Session running");
        let summary = run_session(ingestor, reporter, stop)
            .await
            .context("Session ended with error")?;

        let stats = GatewayStats {
            summary,
            duration: start_time.elapsed(),
            store_path,
            transport,
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            rate = format!("{:.1}", stats.summary.accept_rate()),
            "Session shutdown complete"
        );

        Ok(stats)
    }
}

fn store_path(config: &GatewayConfig) -> PathBuf {
    if config.store.timestamped {
        CsvFileWriter::timestamped_path(&config.store.path, &Local::now())
    } else {
        config.store.path.clone()
    }
}

async fn spawn_publisher(
    config: &GatewayConfig,
    session: Arc<SessionState>,
) -> Result<PublisherHandle> {
    let publish = &config.publish;
    let will = status_message(
        &publish.topics,
        &config.device.name,
        DeviceStatus::Offline,
        &Local::now(),
    );

    let handle = match publish.transport {
        TransportKind::Udp => {
            let addr = publish
                .addr
                .as_deref()
                .context("publish.addr is required for the UDP transport")?;
            let transport = UdpTransport::connect("udp", addr)
                .await
                .with_context(|| format!("Failed to connect UDP publisher to {addr}"))?;
            PublisherHandle::spawn(transport, Some(will), publish.queue_capacity, session)
        }
        TransportKind::Log => PublisherHandle::spawn(
            LogTransport::new("log"),
            Some(will),
            publish.queue_capacity,
            session,
        ),
    };

    info!(
        publisher = %handle.name(),
        queue_capacity = publish.queue_capacity,
        "Publisher started"
    );
    Ok(handle)
}

fn spawn_reporter(
    config: &GatewayConfig,
    dispatcher: &Dispatcher,
    session: Arc<SessionState>,
    attachment: Option<PathBuf>,
    stop: watch::Receiver<bool>,
) -> Option<ReporterHandle> {
    let report = &config.report;
    if !report.enabled {
        return None;
    }

    let handle = match report.mode {
        ReportMode::Spool => {
            let transmitter =
                SpoolTransmitter::new("spool", &report.spool_dir, report.recipients.clone());
            PeriodicReporter::new(config, transmitter, session)
                .with_attachment(attachment)
                .spawn(stop)
        }
        ReportMode::Log => PeriodicReporter::new(config, LogTransmitter::new("log"), session)
            .with_attachment(attachment)
            .spawn(stop),
        ReportMode::Heartbeat => {
            let Some(sender) = dispatcher.publisher_sender() else {
                warn!("Heartbeat reports need a publisher, reporter disabled");
                return None;
            };
            let transmitter =
                HeartbeatTransmitter::new(sender, config.publish.topics.status.clone());
            PeriodicReporter::new(config, transmitter, session).spawn(stop)
        }
    };

    info!(mode = ?report.mode, interval_secs = report.interval_secs, "Reporter started");
    Some(handle)
}
