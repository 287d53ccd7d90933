//! Layered error definitions
//!
//! Categorized by source: config / transport / sink / publish / report

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Device Transport Errors =====
    /// Reading from the device transport failed
    #[error("transport '{source_name}' error: {message}")]
    Transport {
        source_name: String,
        message: String,
    },

    // ===== Sink Errors =====
    /// Storage append failure
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== Publish Errors =====
    /// Remote channel send failure
    #[error("publish via '{transport}' failed: {message}")]
    Publish { transport: String, message: String },

    // ===== Report Errors =====
    /// Periodic report transmit failure
    #[error("report via '{transmitter}' failed: {message}")]
    Report {
        transmitter: String,
        message: String,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create transport error
    pub fn transport(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create publish error
    pub fn publish(transport: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            transport: transport.into(),
            message: message.into(),
        }
    }

    /// Create report error
    pub fn report(transmitter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Report {
            transmitter: transmitter.into(),
            message: message.into(),
        }
    }
}
