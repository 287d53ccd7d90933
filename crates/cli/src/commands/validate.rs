//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{FrameKind, GatewayConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::error::CliError;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    device: String,
    source: String,
    framing: String,
    store: bool,
    publish: bool,
    report: bool,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path: config_path.clone(),
            error: Some(CliError::config_not_found(config_path.clone()).to_string()),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    device: config.device.name.clone(),
                    source: format!("{:?}", config.device.source),
                    framing: format!("{:?}", config.ingest.framing),
                    store: config.store.enabled,
                    publish: config.publish.enabled,
                    report: config.report.enabled,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Non-fatal issues
fn collect_warnings(config: &GatewayConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if !config.store.enabled && !config.publish.enabled {
        warnings.push("Neither store nor publisher enabled - frames will be dropped".to_string());
    }

    for kind in [
        FrameKind::Axis,
        FrameKind::Batch,
        FrameKind::Summary,
        FrameKind::Wide,
    ] {
        let routes = config.routes.for_kind(kind);
        if !routes.store && !routes.publish {
            warnings.push(format!("{} frames have no destination", kind.as_str()));
        }
        if routes.store && !config.store.enabled {
            warnings.push(format!(
                "{} frames are routed to the store but the store is disabled",
                kind.as_str()
            ));
        }
        if routes.publish && !config.publish.enabled {
            warnings.push(format!(
                "{} frames are routed to the publisher but publishing is disabled",
                kind.as_str()
            ));
        }
    }

    if config.store.enabled && !config.store.timestamped {
        warnings.push(format!(
            "store.timestamped is off - {} is reused across sessions",
            config.store.path.display()
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Device: {} ({})", summary.device, summary.source);
            println!("  Framing: {}", summary.framing);
            println!("  Store: {}", summary.store);
            println!("  Publish: {}", summary.publish);
            println!("  Report: {}", summary.report);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::DeviceConfig;
    use std::path::PathBuf;

    #[test]
    fn test_default_routes_warn_when_publisher_disabled() {
        let config = GatewayConfig::for_device(DeviceConfig::default());
        let warnings = collect_warnings(&config);
        assert!(warnings.iter().any(|w| w.starts_with("axis frames are routed to the publisher")));
        assert!(!warnings.iter().any(|w| w.starts_with("summary")));
    }

    #[test]
    fn test_missing_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let args = ValidateArgs {
            config: dir.path().join("absent.toml"),
            json: true,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("Configuration file not found"));
    }

    #[test]
    fn test_valid_file_has_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("gateway.toml");
        std::fs::write(
            &path,
            "[device]\nname = \"bench\"\nsource = \"stdin\"\n",
        )
        .unwrap();

        let result = validate_config(&ValidateArgs {
            config: path,
            json: false,
        });
        assert!(result.valid, "{:?}", result.error);
        assert_eq!(result.summary.unwrap().device, "bench");
    }
}
