//! HeartbeatTransmitter - retained liveness status on the status topic

use std::time::Instant;

use contracts::{ContractError, OutboundMessage, Report, ReportTransmitter, Topic};
use dispatcher::PublisherSender;
use dispatcher::payload::heartbeat_payload;

pub struct HeartbeatTransmitter {
    publisher: PublisherSender,
    topic: Topic,
    started_at: Instant,
}

impl HeartbeatTransmitter {
    pub fn new(publisher: PublisherSender, topic: Topic) -> Self {
        Self {
            publisher,
            topic,
            started_at: Instant::now(),
        }
    }
}

impl ReportTransmitter for HeartbeatTransmitter {
    fn name(&self) -> &str {
        "heartbeat"
    }

    async fn transmit(&mut self, report: &Report) -> Result<(), ContractError> {
        let payload = heartbeat_payload(
            &report.device,
            &report.counters,
            self.started_at.elapsed().as_secs(),
            &report.generated_at,
        );
        let message = OutboundMessage::new(self.topic.clone(), payload).retained();
        self.publisher
            .publish(message)
            .await
            .map_err(|e| ContractError::report("heartbeat", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use contracts::{CountersSnapshot, SessionState, StreamSchema};
    use dispatcher::{PublisherHandle, RecordingTransport};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_heartbeat_is_retained_alive_status() {
        let transport = RecordingTransport::new("rec");
        let log = transport.log();
        let publisher = PublisherHandle::spawn(transport, None, 8, Arc::new(SessionState::new()));

        let mut heartbeat =
            HeartbeatTransmitter::new(publisher.sender(), Topic::new("switchgear/status"));
        let report = Report {
            generated_at: Local::now(),
            device: "SensorTile".to_string(),
            schema: StreamSchema::Unknown,
            counters: CountersSnapshot {
                samples_accepted: 7,
                ..Default::default()
            },
            attachment: None,
        };
        heartbeat.transmit(&report).await.unwrap();
        drop(heartbeat);
        publisher.shutdown().await;

        let sent = log.on_topic("switchgear/status");
        assert_eq!(sent.len(), 1);
        assert!(sent[0].retain);
        let value: serde_json::Value = serde_json::from_slice(&sent[0].payload).unwrap();
        assert_eq!(value["status"], "alive");
        assert_eq!(value["samples"], 7);
    }
}
