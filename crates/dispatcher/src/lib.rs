//! # Dispatcher
//!
//! Output side of the gateway.
//!
//! Responsibilities:
//! - Append decoded frames to the sample store (header on first write,
//!   periodic forced flush)
//! - Decimate per channel and publish compact JSON payloads
//! - Keep a slow or failing publisher off the ingestion path

pub mod dispatcher;
pub mod error;
pub mod gate;
pub mod handle;
pub mod metrics;
pub mod payload;
pub mod sinks;
pub mod store;
pub mod transports;

pub use dispatcher::{DispatchOutcome, Dispatcher, status_message};
pub use error::DispatcherError;
pub use gate::{ChannelGate, PublishGate};
pub use handle::{PublisherHandle, PublisherSender};
pub use metrics::{PublisherMetrics, PublisherSnapshot};
pub use payload::DeviceStatus;
pub use sinks::{CsvFileWriter, MemoryWriter, WriterLog};
pub use store::{AppendOutcome, SampleStore, SinkState};
pub use transports::{LogTransport, RecordingTransport, TransportLog, UdpTransport};
