//! Report transmitters
//!
//! Contains SpoolTransmitter, LogTransmitter and HeartbeatTransmitter.

mod heartbeat;
mod log;
mod spool;

pub use self::heartbeat::HeartbeatTransmitter;
pub use self::log::LogTransmitter;
pub use self::spool::SpoolTransmitter;
