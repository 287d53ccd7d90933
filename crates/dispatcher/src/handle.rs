//! PublisherHandle - owns a pub/sub transport behind a bounded queue
//!
//! The ingestion loop hands messages over with `try_publish`, which never
//! waits: a full queue drops the message. Status messages that must not be
//! lost go through the awaited `publish`.

use std::sync::Arc;

use contracts::{ContractError, OutboundMessage, PubSubTransport, SessionState};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use crate::error::DispatcherError;
use crate::metrics::PublisherMetrics;

type Ack = oneshot::Sender<Result<(), ContractError>>;

struct Envelope {
    message: OutboundMessage,
    ack: Option<Ack>,
}

/// Cloneable sending side of a publisher
///
/// The worker stops once every sender is dropped, so clones must not
/// outlive the session.
#[derive(Clone)]
pub struct PublisherSender {
    name: Arc<str>,
    tx: mpsc::Sender<Envelope>,
    metrics: Arc<PublisherMetrics>,
}

impl PublisherSender {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<PublisherMetrics> {
        &self.metrics
    }

    /// Queue a message without waiting
    ///
    /// Returns false if the message was dropped (queue full or worker gone).
    pub fn try_publish(&self, message: OutboundMessage) -> bool {
        let envelope = Envelope { message, ack: None };
        match self.tx.try_send(envelope) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                true
            }
            Err(mpsc::error::TrySendError::Full(envelope)) => {
                self.metrics.inc_dropped();
                warn!(
                    publisher = %self.name,
                    topic = %envelope.message.topic,
                    "Publish queue full, message dropped"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(publisher = %self.name, "Publisher worker closed unexpectedly");
                false
            }
        }
    }

    /// Queue a message and wait until the transport has handled it
    #[instrument(
        name = "publisher_publish",
        skip(self, message),
        fields(publisher = %self.name, topic = %message.topic)
    )]
    pub async fn publish(&self, message: OutboundMessage) -> Result<(), DispatcherError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        let envelope = Envelope {
            message,
            ack: Some(ack_tx),
        };
        self.tx.send(envelope).await.map_err(|_| self.stopped())?;
        ack_rx.await.map_err(|_| self.stopped())??;
        Ok(())
    }

    fn stopped(&self) -> DispatcherError {
        DispatcherError::PublisherStopped {
            name: self.name.to_string(),
        }
    }
}

/// Handle to a running publisher worker
pub struct PublisherHandle {
    sender: PublisherSender,
    worker_handle: JoinHandle<()>,
}

impl PublisherHandle {
    /// Register the last will with the transport and spawn the worker
    pub fn spawn<T: PubSubTransport + Send + 'static>(
        mut transport: T,
        last_will: Option<OutboundMessage>,
        queue_capacity: usize,
        session: Arc<SessionState>,
    ) -> Self {
        let name: Arc<str> = Arc::from(transport.name());
        if let Some(will) = last_will {
            debug!(publisher = %name, topic = %will.topic, "Last will registered");
            transport.set_last_will(will);
        }

        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(PublisherMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.to_string();
        let worker_handle = tokio::spawn(async move {
            publisher_worker(transport, rx, worker_metrics, session, worker_name).await;
        });

        Self {
            sender: PublisherSender { name, tx, metrics },
            worker_handle,
        }
    }

    pub fn name(&self) -> &str {
        self.sender.name()
    }

    pub fn metrics(&self) -> &Arc<PublisherMetrics> {
        self.sender.metrics()
    }

    /// A sender for other tasks (e.g. the heartbeat reporter)
    pub fn sender(&self) -> PublisherSender {
        self.sender.clone()
    }

    pub fn try_publish(&self, message: OutboundMessage) -> bool {
        self.sender.try_publish(message)
    }

    pub async fn publish(&self, message: OutboundMessage) -> Result<(), DispatcherError> {
        self.sender.publish(message).await
    }

    /// Drain the queue, close the transport and wait for the worker
    #[instrument(name = "publisher_handle_shutdown", skip(self), fields(publisher = %self.name()))]
    pub async fn shutdown(self) {
        let name = self.sender.name.clone();
        drop(self.sender);
        if let Err(e) = self.worker_handle.await {
            error!(publisher = %name, error = ?e, "Worker task panicked");
        }
        debug!(publisher = %name, "PublisherHandle shutdown complete");
    }
}

#[instrument(
    name = "publisher_worker_loop",
    skip(transport, rx, metrics, session),
    fields(publisher = %name)
)]
async fn publisher_worker<T: PubSubTransport>(
    mut transport: T,
    mut rx: mpsc::Receiver<Envelope>,
    metrics: Arc<PublisherMetrics>,
    session: Arc<SessionState>,
    name: String,
) {
    debug!(publisher = %name, "Publisher worker started");

    while let Some(Envelope { message, ack }) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        let result = transport.publish(&message).await;
        match &result {
            Ok(()) => metrics.inc_sent(),
            Err(e) => {
                // Best-effort channel: count and keep going
                metrics.inc_failed();
                session.counters().record_publish_error();
                warn!(publisher = %name, topic = %message.topic, error = %e, "Publish failed");
            }
        }
        if let Some(ack) = ack {
            let _ = ack.send(result);
        }
    }

    if let Err(e) = transport.close().await {
        error!(publisher = %name, error = %e, "Close failed on shutdown");
    }

    debug!(publisher = %name, "Publisher worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transports::RecordingTransport;
    use contracts::Topic;
    use tokio::time::{Duration, sleep};

    fn message(i: u32) -> OutboundMessage {
        OutboundMessage::new(Topic::new("switchgear/accel"), format!("{{\"i\":{i}}}"))
    }

    #[tokio::test]
    async fn test_publisher_delivers_in_order() {
        let transport = RecordingTransport::new("rec");
        let log = transport.log();
        let handle = PublisherHandle::spawn(transport, None, 16, Arc::new(SessionState::new()));

        for i in 0..5 {
            assert!(handle.try_publish(message(i)));
        }
        handle.shutdown().await;

        let payloads: Vec<_> = log.messages().iter().map(|m| m.payload.clone()).collect();
        assert_eq!(payloads.len(), 5);
        assert_eq!(&payloads[4][..], b"{\"i\":4}");
        assert!(log.is_closed());
        assert_eq!(log.close_count(), 1);
    }

    #[tokio::test]
    async fn test_full_queue_drops() {
        let transport = RecordingTransport::new("slow").with_delay(Duration::from_millis(50));
        let handle = PublisherHandle::spawn(transport, None, 2, Arc::new(SessionState::new()));

        let accepted = (0..10).filter(|&i| handle.try_publish(message(i))).count();

        assert!(accepted < 10);
        assert!(handle.metrics().dropped() > 0);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_send_failure_is_counted_not_fatal() {
        let transport = RecordingTransport::new("failing");
        transport.log().fail_sends();
        let session = Arc::new(SessionState::new());
        let handle = PublisherHandle::spawn(transport, None, 8, Arc::clone(&session));

        for i in 0..3 {
            handle.try_publish(message(i));
        }
        sleep(Duration::from_millis(50)).await;

        assert_eq!(handle.metrics().failed(), 3);
        assert_eq!(session.counters().snapshot().publish_errors, 3);
        assert!(handle.publish(message(9)).await.is_err());
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_awaited_publish_and_last_will() {
        let transport = RecordingTransport::new("rec");
        let log = transport.log();
        let will = message(0).retained();
        let handle = PublisherHandle::spawn(transport, Some(will), 8, Arc::new(SessionState::new()));

        handle.publish(message(1).retained()).await.unwrap();
        assert_eq!(log.messages().len(), 1);
        assert!(log.messages()[0].retain);
        assert!(log.last_will().is_some());

        handle.shutdown().await;
    }
}
