//! Dispatcher - fans a decoded frame out to the store and the publisher
//!
//! Destinations are chosen per frame kind by the routing table. The store is
//! the durable record: its failures propagate. Publishing is best-effort and
//! only ever counted.

use std::sync::Arc;

use chrono::{DateTime, Local};
use contracts::{
    Frame, FrameKind, GatewayConfig, OutboundMessage, RouteConfig, SessionState, StreamSchema,
    TopicConfig,
};
use tracing::{debug, info, instrument, warn};

use crate::error::DispatcherError;
use crate::gate::PublishGate;
use crate::handle::{PublisherHandle, PublisherSender};
use crate::payload::{self, DeviceStatus};
use crate::store::{SampleStore, SinkState};

/// What happened to one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Appended to the store
    pub stored: bool,

    /// Handed to the publisher queue
    pub published: bool,

    /// Held back by the publish gate
    pub gated: bool,

    /// Dropped on a full publish queue
    pub dropped: bool,

    /// The append triggered a forced flush
    pub flushed: bool,
}

/// Status message for the status topic
pub fn status_message(
    topics: &TopicConfig,
    device: &str,
    status: DeviceStatus,
    at: &DateTime<Local>,
) -> OutboundMessage {
    OutboundMessage::new(
        topics.status.clone(),
        payload::status_payload(status, device, at),
    )
    .retained()
}

/// Per-session fan-out over the optional store and publisher
pub struct Dispatcher {
    device: String,
    routes: RouteConfig,
    topics: TopicConfig,
    axis_rate_hz: f64,
    batch_rate_hz: f64,
    gate: PublishGate,
    store: Option<SampleStore>,
    publisher: Option<PublisherHandle>,
    axis_index: u64,
    batch_index: u64,
    session: Arc<SessionState>,
}

impl Dispatcher {
    pub fn new(config: &GatewayConfig, session: Arc<SessionState>) -> Self {
        Self {
            device: config.device.name.clone(),
            routes: config.routes.clone(),
            topics: config.publish.topics.clone(),
            axis_rate_hz: config.ingest.axis_rate_hz,
            batch_rate_hz: config.ingest.batch_rate_hz,
            gate: PublishGate::new(&config.publish.gates),
            store: None,
            publisher: None,
            axis_index: 0,
            batch_index: 0,
            session,
        }
    }

    pub fn with_store(mut self, store: SampleStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_publisher(mut self, publisher: PublisherHandle) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    pub fn has_publisher(&self) -> bool {
        self.publisher.is_some()
    }

    pub fn store(&self) -> Option<&SampleStore> {
        self.store.as_ref()
    }

    pub fn store_state(&self) -> Option<SinkState> {
        self.store.as_ref().map(SampleStore::state)
    }

    /// Sending side of the publisher, if one is attached
    pub fn publisher_sender(&self) -> Option<PublisherSender> {
        self.publisher.as_ref().map(PublisherHandle::sender)
    }

    pub fn topics(&self) -> &TopicConfig {
        &self.topics
    }

    /// Write the store header for a freshly committed schema
    pub fn ensure_header(&mut self, schema: StreamSchema) -> Result<bool, DispatcherError> {
        match self.store.as_mut() {
            Some(store) => store.ensure_header(schema),
            None => Ok(false),
        }
    }

    /// Route one frame to its destinations
    ///
    /// # Errors
    /// Only store failures; publish problems are counted and logged.
    pub fn dispatch(
        &mut self,
        frame: &Frame,
        captured_at: &DateTime<Local>,
    ) -> Result<DispatchOutcome, DispatcherError> {
        let kind = frame.kind();
        let destinations = self.routes.for_kind(kind);
        let mut outcome = DispatchOutcome::default();

        // Time bases advance for every decoded frame, published or not
        let sequence = match kind {
            FrameKind::Axis => post_increment(&mut self.axis_index),
            FrameKind::Batch => post_increment(&mut self.batch_index),
            FrameKind::Wide | FrameKind::Summary => 0,
        };

        if let Some(store) = self.store.as_mut().filter(|_| destinations.store) {
            let appended = store.append(frame, captured_at)?;
            self.session.counters().record_stored();
            outcome.stored = true;
            outcome.flushed = appended.flushed;
        }

        if destinations.publish && self.publisher.is_some() {
            if self.gate.should_emit(kind) {
                let message = self.frame_message(frame, sequence, captured_at);
                if self.try_publish(message) {
                    self.session.counters().record_published(kind);
                    outcome.published = true;
                } else {
                    self.session.counters().record_publish_error();
                    outcome.dropped = true;
                }
            } else {
                self.session.counters().record_publish_skipped();
                outcome.gated = true;
            }
        }

        Ok(outcome)
    }

    /// Publish a retained status and wait for the transport
    ///
    /// Returns false if there is no publisher or the send failed.
    #[instrument(name = "dispatcher_publish_status", skip(self), fields(device = %self.device))]
    pub async fn publish_status(&self, status: DeviceStatus) -> bool {
        let Some(publisher) = self.publisher.as_ref() else {
            return false;
        };
        let message = status_message(&self.topics, &self.device, status, &Local::now());
        match publisher.publish(message).await {
            Ok(()) => {
                info!(status = status.as_str(), "Status published");
                true
            }
            Err(e) => {
                warn!(status = status.as_str(), error = %e, "Status publish failed");
                false
            }
        }
    }

    /// Force buffered store rows out
    pub fn flush_store(&mut self) -> Result<(), DispatcherError> {
        match self.store.as_mut() {
            Some(store) if !store.is_closed() => store.flush(),
            _ => Ok(()),
        }
    }

    /// Publish the final offline status, then drain and close the publisher
    ///
    /// Runs at most once; returns whether the offline status went out.
    #[instrument(name = "dispatcher_close_publisher", skip(self))]
    pub async fn close_publisher(&mut self) -> bool {
        if self.publisher.is_none() {
            return false;
        }
        let sent = self.publish_status(DeviceStatus::Offline).await;
        if let Some(publisher) = self.publisher.take() {
            let snapshot = publisher.metrics().snapshot();
            publisher.shutdown().await;
            debug!(
                sent = snapshot.sent,
                failed = snapshot.failed,
                dropped = snapshot.dropped,
                "Publisher closed"
            );
        }
        sent
    }

    pub fn close_store(&mut self) -> Result<(), DispatcherError> {
        match self.store.as_mut() {
            Some(store) => store.close(),
            None => Ok(()),
        }
    }

    fn try_publish(&self, message: OutboundMessage) -> bool {
        self.publisher
            .as_ref()
            .is_some_and(|publisher| publisher.try_publish(message))
    }

    fn frame_message(
        &self,
        frame: &Frame,
        sequence: u64,
        captured_at: &DateTime<Local>,
    ) -> OutboundMessage {
        let body = match frame {
            Frame::Axis(sample) => {
                let t = payload::axis_time(sequence, self.axis_rate_hz);
                payload::axis_payload(sample, t, captured_at)
            }
            Frame::Batch(batch) => {
                let t = payload::batch_time(sequence, batch.samples.len(), self.batch_rate_hz);
                payload::batch_payload(batch, sequence, t, captured_at)
            }
            Frame::Summary(sample) => payload::summary_payload(sample, captured_at),
            Frame::Wide(sample) => payload::wide_payload(sample, captured_at),
        };
        OutboundMessage::new(self.topics.for_kind(frame.kind()).clone(), body)
    }
}

fn post_increment(counter: &mut u64) -> u64 {
    let current = *counter;
    *counter += 1;
    current
}
