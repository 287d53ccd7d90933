//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{FrameKind, GateConfig, GatewayConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    device: DeviceInfo,
    store: Option<StoreInfo>,
    publish: Option<PublishInfo>,
    report: Option<ReportInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    routes: Vec<RouteInfo>,
}

#[derive(Serialize)]
struct DeviceInfo {
    name: String,
    source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    baud_rate: u32,
    framing: String,
}

#[derive(Serialize)]
struct StoreInfo {
    path: String,
    timestamped: bool,
    flush_every: u64,
}

#[derive(Serialize)]
struct PublishInfo {
    transport: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    addr: Option<String>,
    queue_capacity: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    channels: Vec<ChannelInfo>,
}

#[derive(Serialize)]
struct ChannelInfo {
    kind: &'static str,
    topic: String,
    gate: String,
}

#[derive(Serialize)]
struct ReportInfo {
    mode: String,
    interval_secs: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    recipients: Vec<String>,
}

#[derive(Serialize)]
struct RouteInfo {
    kind: &'static str,
    store: bool,
    publish: bool,
}

const KINDS: [FrameKind; 4] = [
    FrameKind::Axis,
    FrameKind::Batch,
    FrameKind::Summary,
    FrameKind::Wide,
];

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&config, args);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn describe_gate(gate: GateConfig) -> String {
    match gate {
        GateConfig::Always => "every frame".to_string(),
        GateConfig::Interval { min_interval_ms } => format!("at most every {min_interval_ms} ms"),
        GateConfig::EveryNth { n } => format!("every {n}th frame"),
    }
}

fn build_config_info(config: &GatewayConfig, args: &InfoArgs) -> ConfigInfo {
    let device = &config.device;

    let publish = config.publish.enabled.then(|| PublishInfo {
        transport: format!("{:?}", config.publish.transport),
        addr: config.publish.addr.clone(),
        queue_capacity: config.publish.queue_capacity,
        channels: if args.gates {
            KINDS
                .iter()
                .map(|&kind| ChannelInfo {
                    kind: kind.as_str(),
                    topic: config.publish.topics.for_kind(kind).to_string(),
                    gate: describe_gate(config.publish.gates.for_kind(kind)),
                })
                .collect()
        } else {
            Vec::new()
        },
    });

    let routes = if args.routes {
        KINDS
            .iter()
            .map(|&kind| {
                let destinations = config.routes.for_kind(kind);
                RouteInfo {
                    kind: kind.as_str(),
                    store: destinations.store,
                    publish: destinations.publish,
                }
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", config.version),
        device: DeviceInfo {
            name: device.name.clone(),
            source: format!("{:?}", device.source),
            port: device.port.clone(),
            path: device.path.as_ref().map(|p| p.display().to_string()),
            baud_rate: device.baud_rate,
            framing: format!("{:?}", config.ingest.framing),
        },
        store: config.store.enabled.then(|| StoreInfo {
            path: config.store.path.display().to_string(),
            timestamped: config.store.timestamped,
            flush_every: config.store.flush_every,
        }),
        publish,
        report: config.report.enabled.then(|| ReportInfo {
            mode: format!("{:?}", config.report.mode),
            interval_secs: config.report.interval_secs,
            recipients: config.report.recipients.clone(),
        }),
        routes,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Sensor Gateway Configuration                   ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📋 Version: {}", info.version);

    let device = &info.device;
    println!("\n🔌 Device: {}", device.name);
    println!("   ├─ Source: {}", device.source);
    if let Some(ref port) = device.port {
        println!("   ├─ Port: {} @ {} baud", port, device.baud_rate);
    }
    if let Some(ref path) = device.path {
        println!("   ├─ Replay file: {}", path);
    }
    println!("   └─ Framing: {}", device.framing);

    match info.store {
        Some(ref store) => {
            println!("\n💾 Store");
            println!("   ├─ Path: {}", store.path);
            println!("   ├─ Timestamped: {}", store.timestamped);
            println!("   └─ Flush every: {} rows", store.flush_every);
        }
        None => println!("\n💾 Store: disabled"),
    }

    match info.publish {
        Some(ref publish) => {
            println!("\n📡 Publish");
            println!("   ├─ Transport: {}", publish.transport);
            if let Some(ref addr) = publish.addr {
                println!("   ├─ Address: {}", addr);
            }
            println!("   └─ Queue capacity: {}", publish.queue_capacity);
            for channel in &publish.channels {
                println!(
                    "      • {:<8} {} ({})",
                    channel.kind, channel.topic, channel.gate
                );
            }
        }
        None => println!("\n📡 Publish: disabled"),
    }

    match info.report {
        Some(ref report) => {
            println!("\n📨 Report");
            println!("   ├─ Mode: {}", report.mode);
            println!("   ├─ Interval: {}s", report.interval_secs);
            println!("   └─ Recipients: {}", report.recipients.join(", "));
        }
        None => println!("\n📨 Report: disabled"),
    }

    if !info.routes.is_empty() {
        println!("\n🔀 Routes");
        for route in &info.routes {
            println!(
                "   • {:<8} store={} publish={}",
                route.kind, route.store, route.publish
            );
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::DeviceConfig;
    use std::path::PathBuf;

    #[test]
    fn test_info_sections_follow_flags() {
        let mut config = GatewayConfig::for_device(DeviceConfig::default());
        config.publish.enabled = true;
        let args = InfoArgs {
            config: PathBuf::from("gateway.toml"),
            json: true,
            routes: true,
            gates: false,
        };

        let info = build_config_info(&config, &args);
        assert_eq!(info.routes.len(), 4);
        assert!(info.store.is_some());
        assert!(info.publish.unwrap().channels.is_empty());
        assert!(info.report.is_none());
    }
}
