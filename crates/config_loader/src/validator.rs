//! Configuration validation
//!
//! Rules:
//! - field ranges declared on the config types (`validator` derive)
//! - the selected source has what it needs (port / path)
//! - decoder widths are consistent and separator != comment marker
//! - gates never use a zero interval or divisor
//! - an enabled UDP publisher has an address
//! - tagged frames are never routed to the store
//! - heartbeat reports require the publisher

use contracts::{
    ContractError, FrameKind, GateConfig, GatewayConfig, ReportMode, SourceKind, TransportKind,
};
use validator::Validate;

/// Validate a GatewayConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &GatewayConfig) -> Result<(), ContractError> {
    validate_ranges(config)?;
    validate_source(config)?;
    validate_decoder(config)?;
    validate_gates(config)?;
    validate_publish(config)?;
    validate_routes(config)?;
    validate_report(config)?;
    Ok(())
}

/// Declarative range checks
fn validate_ranges(config: &GatewayConfig) -> Result<(), ContractError> {
    config
        .validate()
        .map_err(|e| ContractError::config_validation("config", e.to_string()))
}

/// Source-specific required fields
fn validate_source(config: &GatewayConfig) -> Result<(), ContractError> {
    let device = &config.device;
    match device.source {
        SourceKind::Serial if device.port.as_deref().is_none_or(str::is_empty) => Err(
            ContractError::config_validation("device.port", "serial source requires a port"),
        ),
        SourceKind::File if device.path.is_none() => Err(ContractError::config_validation(
            "device.path",
            "file source requires a path",
        )),
        _ => Ok(()),
    }
}

/// Decoder consistency
fn validate_decoder(config: &GatewayConfig) -> Result<(), ContractError> {
    let decoder = &config.decoder;
    if decoder.min_wide_channels > decoder.wide_channels {
        return Err(ContractError::config_validation(
            "decoder.min_wide_channels / decoder.wide_channels",
            format!(
                "min_wide_channels ({}) must be <= wide_channels ({})",
                decoder.min_wide_channels, decoder.wide_channels
            ),
        ));
    }
    if decoder.separator == decoder.comment_marker {
        return Err(ContractError::config_validation(
            "decoder.separator",
            "separator and comment_marker must differ",
        ));
    }
    if decoder.separator.is_ascii_digit() || decoder.separator == '-' {
        return Err(ContractError::config_validation(
            "decoder.separator",
            format!("separator '{}' collides with numeric fields", decoder.separator),
        ));
    }
    Ok(())
}

/// Gate parameters
fn validate_gates(config: &GatewayConfig) -> Result<(), ContractError> {
    for kind in FrameKind::ALL {
        match config.publish.gates.for_kind(kind) {
            GateConfig::Interval { min_interval_ms: 0 } => {
                return Err(ContractError::config_validation(
                    format!("publish.gates.{kind}.min_interval_ms"),
                    "interval must be > 0 (use kind = \"always\" to disable)",
                ));
            }
            GateConfig::EveryNth { n: 0 } => {
                return Err(ContractError::config_validation(
                    format!("publish.gates.{kind}.n"),
                    "n must be > 0",
                ));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Publisher transport requirements
fn validate_publish(config: &GatewayConfig) -> Result<(), ContractError> {
    let publish = &config.publish;
    if publish.enabled
        && publish.transport == TransportKind::Udp
        && publish.addr.as_deref().is_none_or(str::is_empty)
    {
        return Err(ContractError::config_validation(
            "publish.addr",
            "udp transport requires an address",
        ));
    }
    Ok(())
}

/// Routing table
fn validate_routes(config: &GatewayConfig) -> Result<(), ContractError> {
    for kind in FrameKind::ALL {
        if kind.is_tagged() && config.routes.for_kind(kind).store {
            return Err(ContractError::config_validation(
                format!("routes.{kind}.store"),
                "tagged frames have no session schema and cannot be stored",
            ));
        }
    }
    Ok(())
}

/// Report mode requirements
fn validate_report(config: &GatewayConfig) -> Result<(), ContractError> {
    let report = &config.report;
    if report.enabled && report.mode == ReportMode::Heartbeat && !config.publish.enabled {
        return Err(ContractError::config_validation(
            "report.mode",
            "heartbeat reports require publish.enabled = true",
        ));
    }
    Ok(())
}
