//! # Ingestion
//!
//! Input side of the gateway.
//!
//! Responsibilities:
//! - Pull newline-delimited lines from the device transport
//! - Decode each line into at most one frame
//! - Commit the session to a single untagged schema
//! - Hand frames to the dispatcher and drain cleanly on shutdown
//!
//! ## Usage
//!
//! ```ignore
//! use ingestion::{DeviceSource, StreamIngestor, run_session};
//!
//! let source = DeviceSource::open(&config.device).await?;
//! let ingestor = StreamIngestor::new(&config, source, dispatcher, session);
//! let summary = run_session(ingestor, Some(reporter), stop_rx).await?;
//! ```

pub mod classifier;
pub mod decoder;
mod error;
pub mod ingestor;
mod session;
pub mod sources;

pub use classifier::{Classification, FormatClassifier};
pub use decoder::FrameDecoder;
pub use error::{IngestionError, Result};
pub use ingestor::{DrainReport, IngestState, StopReason, StreamIngestor};
pub use session::{SessionSummary, run_session};
pub use sources::{
    DeviceSource, FileLineSource, MockLineSource, ReaderLineSource, SerialLineSource,
    StdinLineSource,
};
