//! `run` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{GatewayConfig, SourceKind};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Gateway, GatewayOptions};

/// Execute the `run` command
pub async fn run_gateway(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut config = ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    apply_overrides(&mut config, args)?;

    info!(
        device = %config.device.name,
        source = ?config.device.source,
        framing = ?config.ingest.framing,
        store = config.store.enabled,
        publish = config.publish.enabled,
        report = config.report.enabled,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    let options = GatewayOptions {
        config,
        max_lines: (args.max_lines > 0).then_some(args.max_lines),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };
    let timeout = (args.timeout > 0).then(|| Duration::from_secs(args.timeout));

    let (stop_tx, stop_rx) = watch::channel(false);
    spawn_stop_trigger(stop_tx, timeout);

    info!("Starting session...");
    let stats = Gateway::new(options)
        .run(stop_rx)
        .await
        .context("Gateway session failed")?;

    info!(
        samples = stats.summary.counters.samples_stored,
        duration_secs = stats.duration.as_secs_f64(),
        rate = format!("{:.1}", stats.summary.accept_rate()),
        "Session completed"
    );
    stats.print_summary();

    info!("Sensor gateway finished");
    Ok(())
}

/// CLI flags win over the file; the result is validated again
fn apply_overrides(config: &mut GatewayConfig, args: &RunArgs) -> Result<()> {
    if let Some(ref port) = args.port {
        info!(port = %port, "Overriding serial port from CLI");
        config.device.source = SourceKind::Serial;
        config.device.port = Some(port.clone());
    }
    if let Some(ref path) = args.replay {
        if !path.exists() {
            return Err(CliError::replay_not_found(path.display().to_string()).into());
        }
        info!(path = %path.display(), "Replaying from file");
        config.device.source = SourceKind::File;
        config.device.path = Some(path.clone());
    }

    ConfigLoader::validate(config).map_err(|e| CliError::config_validation(e.to_string()))?;
    Ok(())
}

/// Turn Ctrl+C, SIGTERM or the session timeout into the stop signal
fn spawn_stop_trigger(stop_tx: watch::Sender<bool>, timeout: Option<Duration>) {
    tokio::spawn(async move {
        let timed_out = async {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = shutdown_signal() => warn!("Received shutdown signal, draining session..."),
            _ = timed_out => warn!(timeout = ?timeout, "Session timeout reached, draining..."),
            // Session already over
            _ = stop_tx.closed() => return,
        }
        let _ = stop_tx.send(true);
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn print_config_summary(config: &GatewayConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Device: {}", config.device.name);
    match config.device.source {
        SourceKind::Serial => println!(
            "  Serial: {} @ {} baud",
            config.device.port.as_deref().unwrap_or("-"),
            config.device.baud_rate
        ),
        SourceKind::File => println!(
            "  Replay: {}",
            config
                .device
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string())
        ),
        SourceKind::Stdin => println!("  Input: stdin"),
    }
    println!("  Framing: {:?}", config.ingest.framing);

    if config.store.enabled {
        println!("\nStore:");
        println!("  Path: {}", config.store.path.display());
        println!("  Flush every: {} rows", config.store.flush_every);
    }

    if config.publish.enabled {
        println!("\nPublish:");
        println!(
            "  Transport: {:?} {}",
            config.publish.transport,
            config.publish.addr.as_deref().unwrap_or("")
        );
        println!("  Status topic: {}", config.publish.topics.status);
    }

    if config.report.enabled {
        println!("\nReport:");
        println!("  Mode: {:?}", config.report.mode);
        println!("  Interval: {}s", config.report.interval_secs);
    }

    println!();
}
