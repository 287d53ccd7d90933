//! # Integration Tests
//!
//! End-to-end sessions across crates.
//!
//! Covers:
//! - Line → store scenarios (schema commit, diagnostics, periodic flush)
//! - Shutdown choreography (final status, handle release)
//! - Tagged telemetry publishing
//! - File replay into a CSV store
//! - Framing enforcement and teardown order with a live reporter

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    use contracts::{
        DeviceConfig, Framing, GateConfig, GatewayConfig, OutboundMessage, SessionState,
        StreamSchema,
    };
    use dispatcher::{
        DeviceStatus, Dispatcher, MemoryWriter, PublisherHandle, RecordingTransport, SampleStore,
        TransportLog, WriterLog, status_message,
    };
    use ingestion::{MockLineSource, StopReason, StreamIngestor, run_session};
    use serde_json::Value;
    use tokio::sync::watch;

    struct Harness {
        ingestor: StreamIngestor<MockLineSource>,
        rows: Arc<WriterLog>,
        published: Arc<TransportLog>,
        source_closes: Arc<AtomicU64>,
    }

    fn config() -> GatewayConfig {
        let mut config = GatewayConfig::for_device(DeviceConfig::default());
        config.device.name = "bench".to_string();
        config.publish.enabled = true;
        config
    }

    async fn harness(config: &GatewayConfig, source: MockLineSource) -> Harness {
        let session = Arc::new(SessionState::new());

        let writer = MemoryWriter::new("mem");
        let rows = writer.log();
        let transport = RecordingTransport::new("recording");
        let published = transport.log();

        let will = status_message(
            &config.publish.topics,
            &config.device.name,
            DeviceStatus::Offline,
            &chrono::Local::now(),
        );
        let publisher = PublisherHandle::spawn(
            transport,
            Some(will),
            config.publish.queue_capacity,
            Arc::clone(&session),
        );

        let dispatcher = Dispatcher::new(config, Arc::clone(&session))
            .with_store(SampleStore::new(Box::new(writer), config.store.flush_every))
            .with_publisher(publisher);
        assert!(dispatcher.publish_status(DeviceStatus::Online).await);

        let source_closes = source.close_counter();
        Harness {
            ingestor: StreamIngestor::new(config, source, dispatcher, session),
            rows,
            published,
            source_closes,
        }
    }

    fn json(message: &OutboundMessage) -> Value {
        serde_json::from_slice(&message.payload).unwrap()
    }

    fn statuses(log: &TransportLog) -> Vec<String> {
        log.on_topic("switchgear/status")
            .iter()
            .map(|m| json(m)["status"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    /// "100,200,300,5,9" commits the summary schema: 6-column header, one row
    #[tokio::test]
    async fn test_summary_line_commits_schema_and_writes_row() {
        let config = config();
        let h = harness(&config, MockLineSource::from_lines(["100,200,300,5,9"])).await;
        let (rows, session) = (h.rows, Arc::clone(h.ingestor.session()));

        let (_tx, stop) = watch::channel(false);
        let summary = run_session(h.ingestor, None, stop).await.unwrap();

        assert_eq!(summary.reason, Some(StopReason::EndOfInput));
        assert_eq!(session.schema(), StreamSchema::Summary);

        let rows = rows.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            vec!["x", "y", "z", "mic_peak", "mic_avg", "timestamp"]
        );
        assert_eq!(&rows[1][..5], &["100", "200", "300", "5", "9"]);
        assert_eq!(rows[1].len(), 6);
    }

    /// A comment line is a diagnostic: nothing stored, nothing counted as error
    #[tokio::test]
    async fn test_diagnostic_line_changes_nothing() {
        let config = config();
        let h = harness(&config, MockLineSource::from_lines(["#debug start"])).await;
        let (rows, session) = (h.rows, Arc::clone(h.ingestor.session()));

        let (_tx, stop) = watch::channel(false);
        let summary = run_session(h.ingestor, None, stop).await.unwrap();

        assert!(rows.rows().is_empty());
        assert_eq!(summary.counters.samples_accepted, 0);
        assert_eq!(summary.counters.errors(), 0);
        assert_eq!(summary.counters.diagnostics, 1);
        assert_eq!(session.schema(), StreamSchema::Unknown);
    }

    /// 501 rows: one forced flush at row 500, one at teardown
    #[tokio::test]
    async fn test_periodic_flush_then_final_flush() {
        let config = config();
        let lines: Vec<String> = (0..501).map(|i| format!("{i},2,3,4,5")).collect();
        let mut h = harness(&config, MockLineSource::from_lines(lines)).await;

        let (_tx, mut stop) = watch::channel(false);
        let reason = h.ingestor.run(&mut stop).await.unwrap();
        assert_eq!(reason, StopReason::EndOfInput);

        let state = h.ingestor.dispatcher().store_state().unwrap();
        assert_eq!(state.sample_count, 501);
        assert_eq!(state.flush_count, 1);
        assert_eq!(h.rows.flushes(), 1);

        let report = h.ingestor.drain().await.unwrap();
        assert_eq!(report.store.unwrap().flush_count, 2);
        assert_eq!(h.rows.flushes(), 2);
        assert_eq!(h.rows.rows().len(), 502);
    }

    /// Stop mid-stream: drain once, offline status once, every handle closed
    #[tokio::test]
    async fn test_stop_signal_drains_session() {
        let config = config();
        let source = MockLineSource::from_lines(["1,2,3,4,5", "6,7,8,9,10"]).hang_at_end();
        let h = harness(&config, source).await;
        let session = Arc::clone(h.ingestor.session());

        let (tx, stop) = watch::channel(false);
        let waiter = Arc::clone(&session);
        tokio::spawn(async move {
            while waiter.counters().snapshot().samples_stored < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            let _ = tx.send(true);
        });

        let summary = tokio::time::timeout(Duration::from_secs(10), run_session(h.ingestor, None, stop))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(summary.reason, Some(StopReason::StopSignal));
        assert!(summary.offline_published);
        assert_eq!(statuses(&h.published), vec!["online", "offline"]);

        let will = h.published.last_will().unwrap();
        assert!(will.retain);
        assert_eq!(json(&will)["status"], "offline");

        assert_eq!(h.source_closes.load(Ordering::SeqCst), 1);
        assert!(h.published.is_closed());
        assert!(h.rows.is_closed());
        assert!(!session.is_active());
    }

    /// Tagged axis/batch frames are published with their time bases, never stored
    #[tokio::test]
    async fn test_tagged_frames_publish_telemetry() {
        let mut config = config();
        config.ingest.framing = Framing::Tagged;
        config.publish.gates.axis = GateConfig::Always;
        config.publish.gates.batch = GateConfig::Always;

        let source =
            MockLineSource::from_lines(["A,1,2,3", "A,4,5,6", "M,10,20,30,40", "#note", "A,7,8"]);
        let h = harness(&config, source).await;
        let rows = h.rows;

        let (_tx, stop) = watch::channel(false);
        let summary = run_session(h.ingestor, None, stop).await.unwrap();

        assert!(rows.rows().is_empty());
        assert_eq!(summary.counters.axis_published, 2);
        assert_eq!(summary.counters.batch_published, 1);
        assert_eq!(summary.counters.decode_errors, 1);

        let axis = h.published.on_topic("switchgear/accel");
        assert_eq!(axis.len(), 2);
        let second = json(&axis[1]);
        assert_eq!(second["x"], 4);
        assert!((second["t"].as_f64().unwrap() - 0.001).abs() < 1e-9);

        let batch = h.published.on_topic("switchgear/mic");
        assert_eq!(batch.len(), 1);
        let batch = json(&batch[0]);
        assert_eq!(batch["samples"], serde_json::json!([10, 20, 30, 40]));
        assert_eq!(batch["batch"], 0);
    }

    /// A stream carries one framing; lines of the other framing are errors
    #[tokio::test]
    async fn test_mixed_framing_lines_rejected() {
        let mut tagged = config();
        tagged.ingest.framing = Framing::Tagged;
        tagged.publish.gates.axis = GateConfig::Always;
        let h = harness(
            &tagged,
            MockLineSource::from_lines(["A,1,2,3", "1,2,3,4,5", "A,4,5,6"]),
        )
        .await;
        let rows = h.rows;
        let (_tx, stop) = watch::channel(false);
        let summary = run_session(h.ingestor, None, stop).await.unwrap();

        assert_eq!(summary.schema, StreamSchema::Unknown);
        assert_eq!(rows.header_writes(), 0);
        assert_eq!(summary.counters.axis_published, 2);
        assert_eq!(summary.counters.decode_errors, 1);

        let h = harness(
            &config(),
            MockLineSource::from_lines(["A,1,2,3", "100,200,300,5,9", "M,1,2"]),
        )
        .await;
        let rows = h.rows;
        let (_tx, stop) = watch::channel(false);
        let summary = run_session(h.ingestor, None, stop).await.unwrap();

        assert_eq!(summary.schema, StreamSchema::Summary);
        assert_eq!(summary.counters.samples_accepted, 1);
        assert_eq!(summary.counters.decode_errors, 2);
        assert_eq!(rows.rows().len(), 2);
        assert!(h.published.on_topic("switchgear/accel").is_empty());
    }

    /// Publisher failures are counted but never end the session
    #[tokio::test]
    async fn test_publish_failures_do_not_stop_storage() {
        let mut config = config();
        config.routes.summary.publish = true;
        config.publish.gates.summary = GateConfig::Always;

        let source = MockLineSource::from_lines(["1,2,3,4,5", "6,7,8,9,10", "11,12,13,14,15"]);
        let h = harness(&config, source).await;
        h.published.fail_sends();

        let (_tx, stop) = watch::channel(false);
        let summary = run_session(h.ingestor, None, stop).await.unwrap();

        assert_eq!(summary.counters.samples_stored, 3);
        assert!(summary.counters.publish_errors >= 3);
        assert_eq!(h.rows.rows().len(), 4);
    }
}

#[cfg(test)]
mod replay_tests {
    use std::sync::Arc;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{SessionState, StreamSchema};
    use dispatcher::{CsvFileWriter, Dispatcher, SampleStore};
    use ingestion::{DeviceSource, StreamIngestor, run_session};
    use tokio::sync::watch;

    /// Config file → replay source → CSV file on disk
    #[tokio::test]
    async fn test_replay_file_into_csv_store() {
        let dir = tempfile::tempdir().unwrap();
        let capture = dir.path().join("capture.txt");
        let wide: Vec<String> = (0..19).map(|i| i.to_string()).collect();
        std::fs::write(
            &capture,
            format!(
                "#boot\r\n{}\r\n1,2,3,4,5\r\n\r\n{}\r\n",
                wide.join(","),
                wide.join(",")
            ),
        )
        .unwrap();

        let toml = format!(
            r#"
[device]
name = "replay"
source = "file"
path = "{}"

[store]
path = "{}"
timestamped = false
"#,
            capture.display(),
            dir.path().join("data.csv").display()
        );
        let config = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();

        let session = Arc::new(SessionState::new());
        let source = DeviceSource::open(&config.device).await.unwrap();
        let dispatcher = Dispatcher::new(&config, Arc::clone(&session)).with_store(
            SampleStore::new(
                Box::new(CsvFileWriter::new("csv", &config.store.path)),
                config.store.flush_every,
            ),
        );
        let ingestor = StreamIngestor::new(&config, source, dispatcher, Arc::clone(&session));

        let (_tx, stop) = watch::channel(false);
        let summary = run_session(ingestor, None, stop).await.unwrap();

        assert_eq!(summary.schema, StreamSchema::Narrow(16));
        assert_eq!(summary.counters.samples_stored, 2);
        assert_eq!(summary.counters.schema_mismatches, 1);
        assert_eq!(summary.counters.diagnostics, 1);

        let csv = std::fs::read_to_string(&config.store.path).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("x,y,z,m1,"));
        assert!(lines[0].ends_with("m16,timestamp"));
        assert!(lines[1].starts_with("0,1,2,3,"));
    }
}

#[cfg(test)]
mod heartbeat_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{DeviceConfig, GatewayConfig, SessionState};
    use dispatcher::{Dispatcher, PublisherHandle, RecordingTransport};
    use ingestion::{MockLineSource, StreamIngestor, run_session};
    use reporter::{HeartbeatTransmitter, PeriodicReporter};
    use serde_json::Value;
    use tokio::sync::watch;

    /// Heartbeats ride the session publisher and stop before the offline status
    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_shares_publisher_until_teardown() {
        let mut config = GatewayConfig::for_device(DeviceConfig::default());
        config.publish.enabled = true;
        config.report.enabled = true;
        config.report.interval_secs = 60;

        let session = Arc::new(SessionState::new());
        let transport = RecordingTransport::new("recording");
        let published = transport.log();
        let publisher = PublisherHandle::spawn(
            transport,
            None,
            config.publish.queue_capacity,
            Arc::clone(&session),
        );
        let dispatcher =
            Dispatcher::new(&config, Arc::clone(&session)).with_publisher(publisher);

        let (_tx, stop) = watch::channel(false);
        let sender = dispatcher.publisher_sender().unwrap();
        let reporter = PeriodicReporter::new(
            &config,
            HeartbeatTransmitter::new(sender, config.publish.topics.status.clone()),
            Arc::clone(&session),
        )
        .spawn(stop.clone());

        // Idle device for 150 s, then end of input
        let source = MockLineSource::new("idle").pause(Duration::from_secs(150));
        let ingestor = StreamIngestor::new(&config, source, dispatcher, session);
        let summary = run_session(ingestor, Some(reporter), stop).await.unwrap();

        assert_eq!(summary.reporter.unwrap().sent, 2);
        assert_eq!(summary.counters.reports_sent, 2);

        let statuses: Vec<String> = published
            .on_topic("switchgear/status")
            .iter()
            .map(|m| {
                let value: Value = serde_json::from_slice(&m.payload).unwrap();
                value["status"].as_str().unwrap_or_default().to_string()
            })
            .collect();
        assert_eq!(statuses, vec!["alive", "alive", "offline"]);
        assert!(published.is_closed());
    }
}

#[cfg(test)]
mod teardown_tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use contracts::{
        ContractError, DeviceConfig, GatewayConfig, OutboundMessage, PubSubTransport, Report,
        ReportTransmitter, RowWriter, SessionState,
    };
    use dispatcher::{DeviceStatus, Dispatcher, PublisherHandle, SampleStore};
    use ingestion::{MockLineSource, StreamIngestor, run_session};
    use reporter::PeriodicReporter;
    use serde_json::Value;
    use tokio::sync::watch;

    /// Ordered record of teardown-relevant events across components
    #[derive(Clone, Default)]
    struct Timeline(Arc<Mutex<Vec<String>>>);

    impl Timeline {
        fn push(&self, event: impl Into<String>) {
            self.0.lock().unwrap().push(event.into());
        }

        fn events(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }

        fn position(&self, event: &str) -> usize {
            self.events()
                .iter()
                .position(|e| e == event)
                .unwrap_or_else(|| panic!("missing event {event}"))
        }
    }

    struct TimelineWriter(Timeline);

    impl RowWriter for TimelineWriter {
        fn name(&self) -> &str {
            "timeline"
        }

        fn write_row(&mut self, _fields: &[String]) -> Result<(), ContractError> {
            Ok(())
        }

        fn flush(&mut self) -> Result<(), ContractError> {
            self.0.push("store_flush");
            Ok(())
        }

        fn close(&mut self) -> Result<(), ContractError> {
            self.0.push("store_close");
            Ok(())
        }
    }

    struct TimelineTransport(Timeline);

    impl PubSubTransport for TimelineTransport {
        fn name(&self) -> &str {
            "timeline"
        }

        fn set_last_will(&mut self, _message: OutboundMessage) {}

        async fn publish(&mut self, message: &OutboundMessage) -> Result<(), ContractError> {
            let body: Value = serde_json::from_slice(&message.payload).unwrap_or_default();
            if let Some(status) = body["status"].as_str() {
                self.0.push(format!("status:{status}"));
            }
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            self.0.push("publisher_close");
            Ok(())
        }
    }

    /// Records each report; its drop marks the end of the reporter task
    struct TimelineTransmitter(Timeline);

    impl ReportTransmitter for TimelineTransmitter {
        fn name(&self) -> &str {
            "timeline"
        }

        async fn transmit(&mut self, _report: &Report) -> Result<(), ContractError> {
            self.0.push("report");
            Ok(())
        }
    }

    impl Drop for TimelineTransmitter {
        fn drop(&mut self) {
            self.0.push("reporter_stopped");
        }
    }

    /// Reporter stops first, then store flush, offline status, publisher and store close
    #[tokio::test(start_paused = true)]
    async fn test_reporter_stops_before_final_flush() {
        let mut config = GatewayConfig::for_device(DeviceConfig::default());
        config.publish.enabled = true;
        config.report.enabled = true;

        let timeline = Timeline::default();
        let session = Arc::new(SessionState::new());
        let publisher = PublisherHandle::spawn(
            TimelineTransport(timeline.clone()),
            None,
            config.publish.queue_capacity,
            Arc::clone(&session),
        );
        let dispatcher = Dispatcher::new(&config, Arc::clone(&session))
            .with_store(SampleStore::new(
                Box::new(TimelineWriter(timeline.clone())),
                config.store.flush_every,
            ))
            .with_publisher(publisher);
        assert!(dispatcher.publish_status(DeviceStatus::Online).await);

        let (_tx, stop) = watch::channel(false);
        let reporter = PeriodicReporter::new(
            &config,
            TimelineTransmitter(timeline.clone()),
            Arc::clone(&session),
        )
        .with_interval(Duration::from_secs(60))
        .spawn(stop.clone());

        let source = MockLineSource::new("bench")
            .line("1,2,3,4,5")
            .pause(Duration::from_secs(90));
        let ingestor = StreamIngestor::new(&config, source, dispatcher, session);
        let summary = run_session(ingestor, Some(reporter), stop).await.unwrap();

        assert_eq!(summary.reporter.unwrap().sent, 1);
        assert!(summary.offline_published);
        assert_eq!(
            timeline.events(),
            vec![
                "status:online",
                "report",
                "reporter_stopped",
                "store_flush",
                "status:offline",
                "publisher_close",
                "store_close",
            ]
        );
        assert!(timeline.position("reporter_stopped") < timeline.position("store_flush"));
    }
}
