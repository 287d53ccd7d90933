//! Output seams - row storage and pub/sub transport
//!
//! Both are external collaborators: the store only needs a row-append
//! primitive, the publisher only needs topic-addressed sends.

use std::path::Path;

use bytes::Bytes;

use crate::{ContractError, Topic};

/// Row-append primitive behind `SampleStore`
///
/// Implementations may buffer; `flush` forces buffered rows to durable
/// storage.
pub trait RowWriter: Send {
    /// Writer name (used for logging)
    fn name(&self) -> &str;

    /// Append one row
    ///
    /// # Errors
    /// Any failure is fatal to the session.
    fn write_row(&mut self, fields: &[String]) -> Result<(), ContractError>;

    /// Force buffered rows to storage
    fn flush(&mut self) -> Result<(), ContractError>;

    /// Release the underlying handle
    fn close(&mut self) -> Result<(), ContractError>;

    /// Backing file, if any (attached to periodic reports)
    fn location(&self) -> Option<&Path> {
        None
    }
}

/// One message for the remote channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: Topic,

    /// Compact JSON body
    pub payload: Bytes,

    /// Retained messages are replayed to late subscribers
    pub retain: bool,
}

impl OutboundMessage {
    pub fn new(topic: Topic, payload: impl Into<Bytes>) -> Self {
        Self {
            topic,
            payload: payload.into(),
            retain: false,
        }
    }

    pub fn retained(mut self) -> Self {
        self.retain = true;
        self
    }
}

/// Pub/sub transport trait
///
/// Connection setup (TLS, broker handshake) happens before construction.
#[trait_variant::make(PubSubTransport: Send)]
pub trait LocalPubSubTransport {
    /// Transport name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Register the message delivered if the process disconnects uncleanly
    fn set_last_will(&mut self, message: OutboundMessage);

    /// Send one message
    async fn publish(&mut self, message: &OutboundMessage) -> Result<(), ContractError>;

    /// Clean disconnect; the last will is not delivered afterwards
    async fn close(&mut self) -> Result<(), ContractError>;
}
