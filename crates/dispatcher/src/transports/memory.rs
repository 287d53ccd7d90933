//! RecordingTransport - in-memory transport for tests

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use contracts::{ContractError, OutboundMessage, PubSubTransport};

/// Shared record of everything a RecordingTransport saw
#[derive(Debug, Default)]
pub struct TransportLog {
    messages: Mutex<Vec<OutboundMessage>>,
    last_will: Mutex<Option<OutboundMessage>>,
    closes: AtomicU64,
    fail_sends: AtomicBool,
}

impl TransportLog {
    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Messages sent on `topic`, in order
    pub fn on_topic(&self, topic: &str) -> Vec<OutboundMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.topic == topic)
            .collect()
    }

    pub fn last_will(&self) -> Option<OutboundMessage> {
        self.last_will.lock().ok().and_then(|w| w.clone())
    }

    pub fn is_closed(&self) -> bool {
        self.close_count() > 0
    }

    pub fn close_count(&self) -> u64 {
        self.closes.load(Ordering::SeqCst)
    }

    /// Make every later send fail
    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }
}

/// Transport that records messages into a shared `TransportLog`
pub struct RecordingTransport {
    name: String,
    log: Arc<TransportLog>,
    delay: Option<Duration>,
}

impl RecordingTransport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            log: Arc::new(TransportLog::default()),
            delay: None,
        }
    }

    /// Sleep before each send (simulates a slow broker)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn log(&self) -> Arc<TransportLog> {
        Arc::clone(&self.log)
    }
}

impl PubSubTransport for RecordingTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_last_will(&mut self, message: OutboundMessage) {
        if let Ok(mut will) = self.log.last_will.lock() {
            *will = Some(message);
        }
    }

    async fn publish(&mut self, message: &OutboundMessage) -> Result<(), ContractError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.log.fail_sends.load(Ordering::SeqCst) {
            return Err(ContractError::publish(&self.name, "send rejected"));
        }
        let mut messages = self
            .log
            .messages
            .lock()
            .map_err(|_| ContractError::publish(&self.name, "message log poisoned"))?;
        messages.push(message.clone());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
