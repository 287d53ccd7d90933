//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Sensor Gateway - line-oriented sensor stream ingestion
#[derive(Parser, Debug)]
#[command(
    name = "sensor-gateway",
    author,
    version,
    about = "Sensor-stream ingestion gateway",
    long_about = "Reads newline-delimited sensor frames from a serial device (or a replay \n\
                  file), stores them in an append-only CSV file, publishes decimated \n\
                  telemetry and sends periodic reports."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SENSOR_GATEWAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "SENSOR_GATEWAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an ingestion session
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "gateway.toml",
        env = "SENSOR_GATEWAY_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the serial port from configuration
    #[arg(long, env = "SENSOR_GATEWAY_PORT")]
    pub port: Option<String>,

    /// Replay lines from a file instead of the configured device
    #[arg(long, conflicts_with = "port")]
    pub replay: Option<PathBuf>,

    /// Stop after this many input lines (0 = unlimited)
    #[arg(long, default_value = "0", env = "SENSOR_GATEWAY_MAX_LINES")]
    pub max_lines: u64,

    /// Session timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "SENSOR_GATEWAY_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without opening the device
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "SENSOR_GATEWAY_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "gateway.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "gateway.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the per-kind routing table
    #[arg(long)]
    pub routes: bool,

    /// Show publish gates and topics
    #[arg(long)]
    pub gates: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_args_parse() {
        let cli = Cli::try_parse_from([
            "sensor-gateway",
            "-v",
            "run",
            "--config",
            "site.toml",
            "--port",
            "/dev/ttyACM1",
            "--max-lines",
            "1000",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.config, PathBuf::from("site.toml"));
        assert_eq!(args.port.as_deref(), Some("/dev/ttyACM1"));
        assert_eq!(args.max_lines, 1000);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_port_and_replay_conflict() {
        let result = Cli::try_parse_from([
            "sensor-gateway",
            "run",
            "--port",
            "/dev/ttyACM0",
            "--replay",
            "capture.txt",
        ]);
        assert!(result.is_err());
    }
}
