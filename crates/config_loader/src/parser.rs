//! Configuration parsing
//!
//! TOML (primary) and JSON.

use contracts::{ContractError, GatewayConfig};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML configuration
pub fn parse_toml(content: &str) -> Result<GatewayConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON configuration
pub fn parse_json(content: &str) -> Result<GatewayConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse by format
pub fn parse(content: &str, format: ConfigFormat) -> Result<GatewayConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Framing, GateConfig, SourceKind};

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[device]
port = "/dev/ttyACM0"
"#;
        let config = parse_toml(content).unwrap();
        assert_eq!(config.device.source, SourceKind::Serial);
        assert_eq!(config.device.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(config.device.baud_rate, 115_200);
        assert_eq!(config.decoder.wide_channels, 16);
        assert_eq!(config.store.flush_every, 500);
        assert!(!config.publish.enabled);
    }

    #[test]
    fn test_parse_toml_gates() {
        let content = r#"
[device]
port = "/dev/ttyACM0"

[ingest]
framing = "tagged"

[publish]
enabled = true
addr = "127.0.0.1:1883"

[publish.gates]
axis = { kind = "interval", min_interval_ms = 10 }
batch = { kind = "every_nth", n = 4 }
summary = { kind = "always" }
wide = { kind = "always" }
"#;
        let config = parse_toml(content).unwrap();
        assert_eq!(config.ingest.framing, Framing::Tagged);
        assert_eq!(config.publish.gates.batch, GateConfig::EveryNth { n: 4 });
        assert_eq!(config.publish.gates.summary, GateConfig::Always);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r##"{
            "device": { "source": "file", "path": "capture.txt" },
            "decoder": { "comment_marker": "#", "wide_channels": 16 }
        }"##;
        let config = parse_json(content).unwrap();
        assert_eq!(config.device.source, SourceKind::File);
        assert_eq!(config.decoder.comment_marker, '#');
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result = parse_toml("invalid toml [[[");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
