//! # Reporter
//!
//! Background report task, independent of the ingestion cadence.
//!
//! On every tick the reporter snapshots the session counters and hands a
//! `Report` to a transmitter: spool into an outbox, log it, or publish a
//! liveness heartbeat.

pub mod error;
pub mod reporter;
pub mod transmitters;

pub use error::ReporterError;
pub use reporter::{PeriodicReporter, ReporterHandle, ReporterSummary, TickOutcome};
pub use transmitters::{HeartbeatTransmitter, LogTransmitter, SpoolTransmitter};
