//! Frame model - FrameDecoder output
//!
//! One decoded logical record per input line, plus the session schema that
//! fixes how untagged frames are laid out.

use std::fmt;
use std::time::Instant;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::config::Framing;

/// Raw line as read from the device transport
///
/// Owned by the ingestor for the duration of one decode call.
#[derive(Debug, Clone)]
pub struct RawLine {
    /// Line bytes without the trailing newline
    pub payload: Bytes,

    /// Arrival instant (monotonic clock)
    pub arrived_at: Instant,
}

impl RawLine {
    /// Create a line stamped with the current instant
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            arrived_at: Instant::now(),
        }
    }

    /// Decode the payload as single-byte (ASCII) text
    ///
    /// Returns `None` for bytes outside the ASCII range.
    pub fn as_text(&self) -> Option<&str> {
        if !self.payload.is_ascii() {
            return None;
        }
        std::str::from_utf8(&self.payload).ok()
    }
}

/// Single 3-axis reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisSample {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// 3-axis reading plus a fixed-width run of auxiliary channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WideSample {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub channels: Vec<i32>,
}

/// 3-axis reading plus two derived scalars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarySample {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub peak: i32,
    pub avg: i32,
}

/// Channel-only batch from a tagged `M` line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelBatch {
    pub samples: Vec<i32>,
}

/// Decoded frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frame {
    /// Tagged `A,x,y,z`
    Axis(AxisSample),

    /// Untagged `x,y,z,c1..cN` with N >= the wide threshold
    Wide(WideSample),

    /// Untagged `x,y,z,peak,avg`
    Summary(SummarySample),

    /// Tagged `M,v1..vN`
    Batch(ChannelBatch),
}

impl Frame {
    /// Frame kind (used for routing and gate lookup)
    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Axis(_) => FrameKind::Axis,
            Frame::Wide(_) => FrameKind::Wide,
            Frame::Summary(_) => FrameKind::Summary,
            Frame::Batch(_) => FrameKind::Batch,
        }
    }

    /// Whether the frame came from tagged framing
    pub fn is_tagged(&self) -> bool {
        self.kind().is_tagged()
    }
}

/// Frame kind discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    Axis,
    Wide,
    Summary,
    Batch,
}

impl FrameKind {
    /// All kinds, in a stable order
    pub const ALL: [FrameKind; 4] = [
        FrameKind::Axis,
        FrameKind::Wide,
        FrameKind::Summary,
        FrameKind::Batch,
    ];

    pub fn is_tagged(self) -> bool {
        matches!(self, FrameKind::Axis | FrameKind::Batch)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FrameKind::Axis => "axis",
            FrameKind::Wide => "wide",
            FrameKind::Summary => "summary",
            FrameKind::Batch => "batch",
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a line did not produce a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRejection {
    /// Line starts with the comment marker; carries the line text
    Diagnostic(String),

    /// Fewer fields than the smallest frame shape
    TooShort { fields: usize },

    /// Untagged line whose field count matches no frame shape
    UnsupportedArity { fields: usize },

    /// Tagged line with the wrong number of trailing fields
    WrongArity { tag: char, fields: usize },

    /// A field failed integer parsing
    Malformed { field: usize },

    /// Bytes are not single-byte text
    NotText,

    /// Untagged frame disagrees with the committed schema
    SchemaMismatch {
        committed: StreamSchema,
        got: FrameKind,
    },

    /// Tagged frame on an untagged stream, or the reverse
    FramingMismatch { framing: Framing, got: FrameKind },
}

impl LineRejection {
    /// Diagnostics are informational, every other rejection is an error
    pub fn is_error(&self) -> bool {
        !matches!(self, LineRejection::Diagnostic(_))
    }
}

impl fmt::Display for LineRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineRejection::Diagnostic(text) => write!(f, "diagnostic: {text}"),
            LineRejection::TooShort { fields } => write!(f, "too short ({fields} fields)"),
            LineRejection::UnsupportedArity { fields } => {
                write!(f, "unsupported arity ({fields} fields)")
            }
            LineRejection::WrongArity { tag, fields } => {
                write!(f, "wrong arity for tag '{tag}' ({fields} fields)")
            }
            LineRejection::Malformed { field } => write!(f, "malformed field {field}"),
            LineRejection::NotText => f.write_str("not single-byte text"),
            LineRejection::SchemaMismatch { committed, got } => {
                write!(f, "{got} frame does not match committed schema {committed}")
            }
            LineRejection::FramingMismatch { framing, got } => {
                write!(f, "{got} frame on a {} stream", framing.as_str())
            }
        }
    }
}

/// Committed interpretation of untagged frames for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamSchema {
    /// No untagged frame seen yet
    #[default]
    Unknown,

    /// Per-channel layout with a fixed channel count
    Narrow(usize),

    /// Peak/average layout
    Summary,
}

impl StreamSchema {
    /// Schema implied by an untagged frame, `None` for tagged frames
    pub fn for_frame(frame: &Frame) -> Option<Self> {
        match frame {
            Frame::Wide(wide) => Some(StreamSchema::Narrow(wide.channels.len())),
            Frame::Summary(_) => Some(StreamSchema::Summary),
            Frame::Axis(_) | Frame::Batch(_) => None,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, StreamSchema::Unknown)
    }

    /// Column header for this schema: axes, schema columns, timestamp
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = ["x", "y", "z"].iter().map(|c| c.to_string()).collect();
        match self {
            StreamSchema::Unknown => {}
            StreamSchema::Narrow(channels) => {
                columns.extend((1..=*channels).map(|i| format!("m{i}")));
            }
            StreamSchema::Summary => {
                columns.push("mic_peak".to_string());
                columns.push("mic_avg".to_string());
            }
        }
        columns.push("timestamp".to_string());
        columns
    }

    /// Human-facing mode name
    pub fn mode_name(&self) -> &'static str {
        match self {
            StreamSchema::Unknown => "UNKNOWN",
            StreamSchema::Narrow(_) => "RAW",
            StreamSchema::Summary => "REDUCED",
        }
    }
}

impl fmt::Display for StreamSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamSchema::Unknown => f.write_str("unknown"),
            StreamSchema::Narrow(channels) => write!(f, "narrow({channels})"),
            StreamSchema::Summary => f.write_str("summary"),
        }
    }
}
