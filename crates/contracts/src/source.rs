//! LineSource trait - device transport abstraction
//!
//! The device connection (serial port, replay file, stdin) is an external
//! collaborator. The ingestor only pulls newline-delimited lines from it.

use crate::{ContractError, RawLine};

/// Newline-delimited line source
///
/// Implementations should make `next_line` cancel-safe: a partially read
/// line must survive the future being dropped, because the ingestor races it
/// against the stop signal and a read timeout.
#[trait_variant::make(LineSource: Send)]
pub trait LocalLineSource {
    /// Source name (used for logging)
    fn name(&self) -> &str;

    /// Next line without its terminator
    ///
    /// Returns `Ok(None)` once the transport is closed (end of input).
    ///
    /// # Errors
    /// Read failures; these end the session.
    async fn next_line(&mut self) -> Result<Option<RawLine>, ContractError>;

    /// Release the transport handle
    async fn close(&mut self) -> Result<(), ContractError>;
}
