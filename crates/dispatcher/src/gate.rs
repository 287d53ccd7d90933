//! PublishGate - per-channel decimation in front of the publisher
//!
//! Gates only decide skip-vs-emit; they never block or delay.

use std::time::{Duration, Instant};

use contracts::{FrameKind, GateConfig, GateTable};

/// Decision state for one output channel
#[derive(Debug, Clone)]
pub enum ChannelGate {
    /// Emit every candidate
    Always,

    /// Emit when `min_interval` has passed since the last emit.
    /// Skipped intervals are not banked.
    Interval {
        min_interval: Duration,
        last_emit: Option<Instant>,
    },

    /// Emit candidates whose sequence number is a multiple of `n`.
    /// The sequence advances on every candidate.
    EveryNth { n: u64, sequence: u64 },
}

impl ChannelGate {
    pub fn from_config(config: GateConfig) -> Self {
        match config {
            GateConfig::Always => ChannelGate::Always,
            GateConfig::Interval { min_interval_ms } => ChannelGate::Interval {
                min_interval: Duration::from_millis(min_interval_ms),
                last_emit: None,
            },
            GateConfig::EveryNth { n } => ChannelGate::EveryNth {
                n: n.max(1),
                sequence: 0,
            },
        }
    }

    /// Decide for one candidate observed at `now`
    pub fn should_emit_at(&mut self, now: Instant) -> bool {
        match self {
            ChannelGate::Always => true,
            ChannelGate::Interval {
                min_interval,
                last_emit,
            } => {
                let open = last_emit.is_none_or(|last| now.saturating_duration_since(last) >= *min_interval);
                if open {
                    *last_emit = Some(now);
                }
                open
            }
            ChannelGate::EveryNth { n, sequence } => {
                let open = sequence.is_multiple_of(*n);
                *sequence += 1;
                open
            }
        }
    }
}

/// One gate per frame kind, each independent of the others
#[derive(Debug, Clone)]
pub struct PublishGate {
    axis: ChannelGate,
    wide: ChannelGate,
    summary: ChannelGate,
    batch: ChannelGate,
}

impl PublishGate {
    pub fn new(table: &GateTable) -> Self {
        Self {
            axis: ChannelGate::from_config(table.axis),
            wide: ChannelGate::from_config(table.wide),
            summary: ChannelGate::from_config(table.summary),
            batch: ChannelGate::from_config(table.batch),
        }
    }

    pub fn should_emit(&mut self, kind: FrameKind) -> bool {
        self.should_emit_at(kind, Instant::now())
    }

    pub fn should_emit_at(&mut self, kind: FrameKind, now: Instant) -> bool {
        self.gate_mut(kind).should_emit_at(now)
    }

    fn gate_mut(&mut self, kind: FrameKind) -> &mut ChannelGate {
        match kind {
            FrameKind::Axis => &mut self.axis,
            FrameKind::Wide => &mut self.wide,
            FrameKind::Summary => &mut self.summary,
            FrameKind::Batch => &mut self.batch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_every_nth_accepts_multiples() {
        let mut gate = ChannelGate::from_config(GateConfig::EveryNth { n: 4 });
        let now = Instant::now();
        let accepted: Vec<u64> = (0..10).filter(|_| gate.should_emit_at(now)).collect();
        assert_eq!(accepted, vec![0, 4, 8]);
    }

    #[test]
    fn test_interval_never_accepts_closer_than_minimum() {
        let min = Duration::from_millis(10);
        let mut gate = ChannelGate::from_config(GateConfig::Interval { min_interval_ms: 10 });
        let mut rng = rand::rng();

        let start = Instant::now();
        let mut now = start;
        let mut accepted = Vec::new();
        for _ in 0..2000 {
            now += Duration::from_micros(rng.random_range(0..4000));
            if gate.should_emit_at(now) {
                accepted.push(now);
            }
        }

        assert!(accepted.len() > 1);
        for pair in accepted.windows(2) {
            assert!(pair[1] - pair[0] >= min);
        }
    }

    #[test]
    fn test_interval_does_not_bank_skipped_time() {
        let mut gate = ChannelGate::from_config(GateConfig::Interval { min_interval_ms: 10 });
        let t0 = Instant::now();
        assert!(gate.should_emit_at(t0));
        // A long quiet period earns one emit, not several
        let later = t0 + Duration::from_millis(100);
        assert!(gate.should_emit_at(later));
        assert!(!gate.should_emit_at(later + Duration::from_millis(1)));
    }

    #[test]
    fn test_channels_are_independent() {
        let mut gate = PublishGate::new(&GateTable {
            axis: GateConfig::Interval { min_interval_ms: 1000 },
            batch: GateConfig::EveryNth { n: 2 },
            summary: GateConfig::Always,
            wide: GateConfig::Always,
        });
        let now = Instant::now();

        assert!(gate.should_emit_at(FrameKind::Axis, now));
        assert!(!gate.should_emit_at(FrameKind::Axis, now));
        assert!(gate.should_emit_at(FrameKind::Batch, now));
        assert!(!gate.should_emit_at(FrameKind::Batch, now));
        assert!(gate.should_emit_at(FrameKind::Summary, now));
        assert!(gate.should_emit_at(FrameKind::Summary, now));
    }
}
