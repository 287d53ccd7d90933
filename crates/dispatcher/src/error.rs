//! Dispatcher error types

use contracts::{FrameKind, StreamSchema};
use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Transport/writer creation error
    #[error("failed to create '{name}': {message}")]
    Creation { name: String, message: String },

    /// Row appended before the header was written
    #[error("store '{sink_name}' has no header yet")]
    HeaderMissing { sink_name: String },

    /// Frame does not fit the store's schema
    #[error("store '{sink_name}' cannot hold {kind} frame under schema {schema}")]
    Unstorable {
        sink_name: String,
        kind: FrameKind,
        schema: StreamSchema,
    },

    /// Operation after close
    #[error("'{name}' is closed")]
    Closed { name: String },

    /// Publisher worker is gone
    #[error("publisher '{name}' worker stopped")]
    PublisherStopped { name: String },

    /// Sink/transport error (from contract)
    #[error("sink error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    pub fn creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Creation {
            name: name.into(),
            message: message.into(),
        }
    }
}
