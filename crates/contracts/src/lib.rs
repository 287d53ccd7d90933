//! # Contracts
//!
//! Frozen interface contracts shared by every gateway crate: the decoded
//! frame model, the session schema, configuration, shared counters, and the
//! traits at each external seam (device transport, row storage, pub/sub,
//! report transmit). Business crates depend only on this crate, never on
//! each other's internals.
//!
//! ## Time Model
//! - Samples are stamped with local wall-clock time at capture
//! - Rate limiting uses the monotonic clock (`std::time::Instant`)

mod config;
mod error;
mod frame;
mod report;
mod session;
mod sink;
mod source;
mod topic;

pub use config::*;
pub use error::*;
pub use frame::*;
pub use report::{LocalReportTransmitter, Report, ReportTransmitter};
pub use session::*;
pub use sink::{LocalPubSubTransport, OutboundMessage, PubSubTransport, RowWriter};
pub use source::{LineSource, LocalLineSource};
pub use topic::Topic;
