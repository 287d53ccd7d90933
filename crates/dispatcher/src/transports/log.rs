//! LogTransport - publishes into the log (dry run)

use contracts::{ContractError, OutboundMessage, PubSubTransport};
use tracing::{debug, info, instrument};

/// Transport that logs every message instead of sending it
pub struct LogTransport {
    name: String,
    published: u64,
    last_will: Option<OutboundMessage>,
}

impl LogTransport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            published: 0,
            last_will: None,
        }
    }

    pub fn published(&self) -> u64 {
        self.published
    }
}

impl PubSubTransport for LogTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_last_will(&mut self, message: OutboundMessage) {
        self.last_will = Some(message);
    }

    #[instrument(
        name = "log_transport_publish",
        skip(self, message),
        fields(transport = %self.name, topic = %message.topic)
    )]
    async fn publish(&mut self, message: &OutboundMessage) -> Result<(), ContractError> {
        self.published += 1;
        info!(
            transport = %self.name,
            topic = %message.topic,
            retain = message.retain,
            payload = %String::from_utf8_lossy(&message.payload),
            "Publish"
        );
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(
            transport = %self.name,
            published = self.published,
            will_registered = self.last_will.is_some(),
            "LogTransport closed"
        );
        self.last_will = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Topic;

    #[tokio::test]
    async fn test_log_transport_counts() {
        let mut transport = LogTransport::new("log");
        let message = OutboundMessage::new(Topic::new("switchgear/status"), "{}");
        transport.publish(&message).await.unwrap();
        transport.publish(&message).await.unwrap();
        assert_eq!(transport.published(), 2);
        transport.close().await.unwrap();
    }
}
