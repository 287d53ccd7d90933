//! FrameDecoder - one text line to one frame
//!
//! Pure and deterministic: no I/O, no shared state. The frame shape is
//! picked from the leading tag (tagged framing) or the field count
//! (untagged framing); a line that fails anywhere yields no frame at all.

use contracts::{
    AxisSample, ChannelBatch, DecoderConfig, Frame, LineRejection, SummarySample, WideSample,
};

/// Smallest field count of any frame shape
const MIN_FIELDS: usize = 4;

/// Axis fields leading every untagged frame
const AXES: usize = 3;

/// Summary frames carry exactly two values after the axes
const SUMMARY_EXTRA: usize = 2;

/// Line decoder configured with the session's decoder settings
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    comment_marker: char,
    separator: char,
    wide_channels: usize,
    min_wide_channels: usize,
}

impl FrameDecoder {
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            comment_marker: config.comment_marker,
            separator: config.separator,
            wide_channels: config.wide_channels,
            min_wide_channels: config.min_wide_channels.min(config.wide_channels),
        }
    }

    /// Declared channel width of wide frames
    pub fn wide_channels(&self) -> usize {
        self.wide_channels
    }

    /// Decode one line (terminator already stripped)
    pub fn decode(&self, line: &str) -> Result<Frame, LineRejection> {
        let line = line.trim();
        if line.starts_with(self.comment_marker) {
            return Err(LineRejection::Diagnostic(line.to_string()));
        }

        let fields: Vec<&str> = line.split(self.separator).map(str::trim).collect();
        if fields.len() < MIN_FIELDS {
            return Err(LineRejection::TooShort {
                fields: fields.len(),
            });
        }

        match fields[0] {
            "A" => self.decode_axis(&fields),
            "M" => self.decode_batch(&fields),
            _ => self.decode_untagged(&fields),
        }
    }

    /// `A,x,y,z`
    fn decode_axis(&self, fields: &[&str]) -> Result<Frame, LineRejection> {
        if fields.len() != 1 + AXES {
            return Err(LineRejection::WrongArity {
                tag: 'A',
                fields: fields.len(),
            });
        }
        let values = parse_all(&fields[1..], 1)?;
        Ok(Frame::Axis(AxisSample {
            x: values[0],
            y: values[1],
            z: values[2],
        }))
    }

    /// `M,v1..vN`, any N >= 1
    fn decode_batch(&self, fields: &[&str]) -> Result<Frame, LineRejection> {
        let samples = parse_all(&fields[1..], 1)?;
        Ok(Frame::Batch(ChannelBatch { samples }))
    }

    fn decode_untagged(&self, fields: &[&str]) -> Result<Frame, LineRejection> {
        let values = parse_all(fields, 0)?;
        let extra = values.len() - AXES;
        if extra != SUMMARY_EXTRA && extra < self.min_wide_channels {
            return Err(LineRejection::UnsupportedArity {
                fields: values.len(),
            });
        }

        let (x, y, z) = (values[0], values[1], values[2]);

        if extra == SUMMARY_EXTRA {
            return Ok(Frame::Summary(SummarySample {
                x,
                y,
                z,
                peak: values[3],
                avg: values[4],
            }));
        }

        // Fixed-width record: truncate extras, zero-pad short rows
        let mut channels: Vec<i32> = values[AXES..]
            .iter()
            .copied()
            .take(self.wide_channels)
            .collect();
        channels.resize(self.wide_channels, 0);
        Ok(Frame::Wide(WideSample { x, y, z, channels }))
    }
}

/// Parse every field; `offset` is the index of `fields[0]` in the line
fn parse_all(fields: &[&str], offset: usize) -> Result<Vec<i32>, LineRejection> {
    fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            field.parse::<i32>().map_err(|_| LineRejection::Malformed {
                field: offset + i,
            })
        })
        .collect()
}
