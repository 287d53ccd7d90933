//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// `--replay` capture file missing
    #[error("Replay capture not found: {path}")]
    ReplayNotFound { path: String },

    /// Configuration loaded but rejected
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn replay_not_found(path: impl Into<String>) -> Self {
        Self::ReplayNotFound { path: path.into() }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_path() {
        assert_eq!(
            CliError::config_not_found("gateway.toml").to_string(),
            "Configuration file not found: gateway.toml"
        );
        assert_eq!(
            CliError::replay_not_found("capture.txt").to_string(),
            "Replay capture not found: capture.txt"
        );
    }
}
