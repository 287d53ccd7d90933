//! Pub/sub transport implementations
//!
//! Contains UdpTransport, LogTransport and RecordingTransport.

mod log;
mod memory;
mod network;

pub use self::log::LogTransport;
pub use self::memory::{RecordingTransport, TransportLog};
pub use self::network::{UdpTransport, envelope};
