//! FormatClassifier - commits a session to one untagged schema
//!
//! The first summary or wide frame latches the schema. Later untagged frames
//! of another shape are rejected rather than re-classified: the store header
//! is already written for the committed layout. Tagged frames carry their
//! own shape and pass through untouched.

use contracts::{Frame, LineRejection, StreamSchema};
use tracing::debug;

/// What the classifier made of one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// This frame committed the schema (reported exactly once)
    Committed(StreamSchema),
    /// Frame matches the committed schema
    Matched,
    /// Tagged frame, schema not involved
    Bypassed,
}

#[derive(Debug, Default)]
pub struct FormatClassifier {
    schema: StreamSchema,
}

impl FormatClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema(&self) -> StreamSchema {
        self.schema
    }

    pub fn observe(&mut self, frame: &Frame) -> Result<Classification, LineRejection> {
        let Some(shape) = StreamSchema::for_frame(frame) else {
            return Ok(Classification::Bypassed);
        };

        match self.schema {
            StreamSchema::Unknown => {
                self.schema = shape;
                debug!(schema = %shape, "Schema committed");
                Ok(Classification::Committed(shape))
            }
            committed if committed == shape => Ok(Classification::Matched),
            committed => Err(LineRejection::SchemaMismatch {
                committed,
                got: frame.kind(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{AxisSample, ChannelBatch, FrameKind, SummarySample, WideSample};

    fn summary() -> Frame {
        Frame::Summary(SummarySample {
            x: 1,
            y: 2,
            z: 3,
            peak: 4,
            avg: 5,
        })
    }

    fn wide() -> Frame {
        Frame::Wide(WideSample {
            x: 1,
            y: 2,
            z: 3,
            channels: vec![0; 16],
        })
    }

    #[test]
    fn test_first_untagged_frame_commits_once() {
        let mut classifier = FormatClassifier::new();
        assert_eq!(
            classifier.observe(&wide()),
            Ok(Classification::Committed(StreamSchema::Narrow(16)))
        );
        assert_eq!(classifier.observe(&wide()), Ok(Classification::Matched));
        assert_eq!(classifier.schema(), StreamSchema::Narrow(16));
    }

    #[test]
    fn test_other_shape_rejected_after_commit() {
        let mut classifier = FormatClassifier::new();
        classifier.observe(&summary()).unwrap();

        assert_eq!(
            classifier.observe(&wide()),
            Err(LineRejection::SchemaMismatch {
                committed: StreamSchema::Summary,
                got: FrameKind::Wide,
            })
        );
        // The latch holds
        assert_eq!(classifier.schema(), StreamSchema::Summary);
        assert_eq!(classifier.observe(&summary()), Ok(Classification::Matched));
    }

    #[test]
    fn test_tagged_frames_bypass() {
        let mut classifier = FormatClassifier::new();
        let axis = Frame::Axis(AxisSample { x: 1, y: 2, z: 3 });
        let batch = Frame::Batch(ChannelBatch { samples: vec![1] });
        assert_eq!(classifier.observe(&axis), Ok(Classification::Bypassed));
        assert_eq!(classifier.observe(&batch), Ok(Classification::Bypassed));
        assert_eq!(classifier.schema(), StreamSchema::Unknown);
    }
}
