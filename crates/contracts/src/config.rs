//! GatewayConfig - Config Loader output
//!
//! Immutable configuration constructed once at startup and handed by
//! reference to every component constructor.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{FrameKind, Topic};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GatewayConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Device transport
    #[validate(nested)]
    pub device: DeviceConfig,

    /// Line ingestion settings
    #[serde(default)]
    #[validate(nested)]
    pub ingest: IngestConfig,

    /// Frame decoder settings
    #[serde(default)]
    #[validate(nested)]
    pub decoder: DecoderConfig,

    /// Local sample store
    #[serde(default)]
    #[validate(nested)]
    pub store: StoreConfig,

    /// Remote pub/sub channel
    #[serde(default)]
    #[validate(nested)]
    pub publish: PublishConfig,

    /// Periodic report/heartbeat
    #[serde(default)]
    #[validate(nested)]
    pub report: ReportConfig,

    /// Destination set per frame kind
    #[serde(default)]
    pub routes: RouteConfig,
}

/// Device transport configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DeviceConfig {
    /// Device name, used in status payloads and reports
    #[serde(default = "default_device_name")]
    #[validate(length(min = 1))]
    pub name: String,

    /// Where lines come from
    #[serde(default)]
    pub source: SourceKind,

    /// Serial port path (serial source)
    #[serde(default)]
    pub port: Option<String>,

    /// Baud rate (ignored by USB CDC devices, required by the driver)
    #[serde(default = "default_baud_rate")]
    #[validate(range(min = 1))]
    pub baud_rate: u32,

    /// Replay file (file source)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Bound on a single read wait, so stop signals are observed promptly
    #[serde(default = "default_read_timeout_ms")]
    #[validate(range(min = 1))]
    pub read_timeout_ms: u64,
}

fn default_device_name() -> String {
    "SensorTile".to_string()
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_read_timeout_ms() -> u64 {
    1000
}

impl DeviceConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Line source kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Serial,
    File,
    Stdin,
}

/// Stream framing declared for the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// Leading `A`/`M` tag on every line; schema is per frame
    Tagged,
    /// Bare numeric fields; schema is inferred once per session
    #[default]
    Untagged,
}

impl Framing {
    pub fn as_str(self) -> &'static str {
        match self {
            Framing::Tagged => "tagged",
            Framing::Untagged => "untagged",
        }
    }

    /// Whether a frame of `kind` belongs on a stream with this framing
    pub fn admits(self, kind: FrameKind) -> bool {
        kind.is_tagged() == (self == Framing::Tagged)
    }
}

/// Ingestion loop configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngestConfig {
    #[serde(default)]
    pub framing: Framing,

    /// Progress notification cadence, in accepted samples
    #[serde(default = "default_every_500")]
    #[validate(range(min = 1))]
    pub progress_every: u64,

    /// Axis sample rate, used for the `t` field of axis payloads
    #[serde(default = "default_axis_rate_hz")]
    #[validate(range(exclusive_min = 0.0))]
    pub axis_rate_hz: f64,

    /// Per-channel sample rate of batch frames, used for their `t` field
    #[serde(default = "default_batch_rate_hz")]
    #[validate(range(exclusive_min = 0.0))]
    pub batch_rate_hz: f64,
}

fn default_every_500() -> u64 {
    500
}

fn default_axis_rate_hz() -> f64 {
    1000.0
}

fn default_batch_rate_hz() -> f64 {
    16000.0
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            framing: Framing::default(),
            progress_every: default_every_500(),
            axis_rate_hz: default_axis_rate_hz(),
            batch_rate_hz: default_batch_rate_hz(),
        }
    }
}

/// Frame decoder configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DecoderConfig {
    /// Lines starting with this marker are diagnostics
    #[serde(default = "default_comment_marker")]
    pub comment_marker: char,

    /// Field separator
    #[serde(default = "default_separator")]
    pub separator: char,

    /// Declared channel width of wide frames (rows are zero-padded to it)
    #[serde(default = "default_wide_channels")]
    #[validate(range(min = 1))]
    pub wide_channels: usize,

    /// Fewest channels that still decode as a wide frame
    #[serde(default = "default_min_wide_channels")]
    #[validate(range(min = 3))]
    pub min_wide_channels: usize,
}

fn default_comment_marker() -> char {
    '#'
}

fn default_separator() -> char {
    ','
}

fn default_wide_channels() -> usize {
    16
}

fn default_min_wide_channels() -> usize {
    8
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            comment_marker: default_comment_marker(),
            separator: default_separator(),
            wide_channels: default_wide_channels(),
            min_wide_channels: default_min_wide_channels(),
        }
    }
}

/// Sample store configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StoreConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Output file
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Insert the session start time into the file name
    #[serde(default = "default_true")]
    pub timestamped: bool,

    /// Forced flush cadence, in rows
    #[serde(default = "default_every_500")]
    #[validate(range(min = 1))]
    pub flush_every: u64,
}

fn default_true() -> bool {
    true
}

fn default_store_path() -> PathBuf {
    PathBuf::from("sensor_data.csv")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_store_path(),
            timestamped: true,
            flush_every: default_every_500(),
        }
    }
}

/// Pub/sub transport kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// JSON datagrams to a relay
    #[default]
    Udp,
    /// Log messages via tracing (dry run)
    Log,
}

/// Remote publish configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PublishConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub transport: TransportKind,

    /// Relay address (`host:port`) for the UDP transport
    #[serde(default)]
    pub addr: Option<String>,

    /// Publisher queue capacity; overflow drops messages
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1))]
    pub queue_capacity: usize,

    #[serde(default)]
    pub topics: TopicConfig,

    #[serde(default)]
    pub gates: GateTable,
}

fn default_queue_capacity() -> usize {
    1024
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            transport: TransportKind::default(),
            addr: None,
            queue_capacity: default_queue_capacity(),
            topics: TopicConfig::default(),
            gates: GateTable::default(),
        }
    }
}

/// One topic per category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicConfig {
    pub axis: Topic,
    pub batch: Topic,
    pub summary: Topic,
    pub wide: Topic,
    pub status: Topic,
}

impl TopicConfig {
    pub fn for_kind(&self, kind: FrameKind) -> &Topic {
        match kind {
            FrameKind::Axis => &self.axis,
            FrameKind::Wide => &self.wide,
            FrameKind::Summary => &self.summary,
            FrameKind::Batch => &self.batch,
        }
    }
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            axis: "switchgear/accel".into(),
            batch: "switchgear/mic".into(),
            summary: "switchgear/summary".into(),
            wide: "switchgear/raw".into(),
            status: "switchgear/status".into(),
        }
    }
}

/// Decimation rule for one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GateConfig {
    /// Emit every candidate
    Always,
    /// Emit when at least `min_interval_ms` passed since the last emit
    Interval { min_interval_ms: u64 },
    /// Emit candidates whose sequence number is a multiple of `n`
    EveryNth { n: u64 },
}

/// Gate per channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateTable {
    pub axis: GateConfig,
    pub batch: GateConfig,
    pub summary: GateConfig,
    pub wide: GateConfig,
}

impl GateTable {
    pub fn for_kind(&self, kind: FrameKind) -> GateConfig {
        match kind {
            FrameKind::Axis => self.axis,
            FrameKind::Wide => self.wide,
            FrameKind::Summary => self.summary,
            FrameKind::Batch => self.batch,
        }
    }
}

impl Default for GateTable {
    fn default() -> Self {
        Self {
            axis: GateConfig::Interval {
                min_interval_ms: 10,
            },
            batch: GateConfig::EveryNth { n: 1 },
            summary: GateConfig::Interval {
                min_interval_ms: 10,
            },
            wide: GateConfig::EveryNth { n: 1 },
        }
    }
}

/// Report mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    /// Write report + store copy into an outbox directory
    #[default]
    Spool,
    /// Log the report
    Log,
    /// Publish a retained liveness status
    Heartbeat,
}

/// Periodic reporter configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReportConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub mode: ReportMode,

    #[serde(default = "default_report_interval_secs")]
    #[validate(range(min = 1))]
    pub interval_secs: u64,

    /// Upper bound on one transmit attempt
    #[serde(default = "default_transmit_timeout_secs")]
    #[validate(range(min = 1))]
    pub transmit_timeout_secs: u64,

    /// Outbox directory (spool mode)
    #[serde(default = "default_spool_dir")]
    pub spool_dir: PathBuf,

    /// Recipients recorded in spooled reports
    #[serde(default)]
    pub recipients: Vec<String>,
}

fn default_report_interval_secs() -> u64 {
    60
}

fn default_transmit_timeout_secs() -> u64 {
    30
}

fn default_spool_dir() -> PathBuf {
    PathBuf::from("outbox")
}

impl ReportConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn transmit_timeout(&self) -> Duration {
        Duration::from_secs(self.transmit_timeout_secs)
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: ReportMode::default(),
            interval_secs: default_report_interval_secs(),
            transmit_timeout_secs: default_transmit_timeout_secs(),
            spool_dir: default_spool_dir(),
            recipients: Vec::new(),
        }
    }
}

/// Destination set for one frame kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destinations {
    #[serde(default)]
    pub store: bool,
    #[serde(default)]
    pub publish: bool,
}

impl Destinations {
    pub const fn new(store: bool, publish: bool) -> Self {
        Self { store, publish }
    }
}

/// Routing table
///
/// Default deployment: tagged axis/batch frames publish remotely, untagged
/// summary/wide frames go to the local store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub axis: Destinations,
    pub batch: Destinations,
    pub summary: Destinations,
    pub wide: Destinations,
}

impl RouteConfig {
    pub fn for_kind(&self, kind: FrameKind) -> Destinations {
        match kind {
            FrameKind::Axis => self.axis,
            FrameKind::Wide => self.wide,
            FrameKind::Summary => self.summary,
            FrameKind::Batch => self.batch,
        }
    }
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            axis: Destinations::new(false, true),
            batch: Destinations::new(false, true),
            summary: Destinations::new(true, false),
            wide: Destinations::new(true, false),
        }
    }
}

impl GatewayConfig {
    /// Minimal configuration for a device, all other sections defaulted
    pub fn for_device(device: DeviceConfig) -> Self {
        Self {
            version: ConfigVersion::V1,
            device,
            ingest: IngestConfig::default(),
            decoder: DecoderConfig::default(),
            store: StoreConfig::default(),
            publish: PublishConfig::default(),
            report: ReportConfig::default(),
            routes: RouteConfig::default(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: default_device_name(),
            source: SourceKind::default(),
            port: None,
            baud_rate: default_baud_rate(),
            path: None,
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}
