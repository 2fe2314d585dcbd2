//! How long the counter takes to show a commanded move.
//!
//! After a phase shifter move (setpoint change or bucket correction) the
//! counter keeps reporting the old time for a while. The latency is the time
//! from the command until a reading lands within `LATENCY_WINDOW_NS` of the
//! model's prediction for the new position.
use std::time::Instant;

use crate::sawtooth::ModelParameters;

pub const LATENCY_WINDOW_NS: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pending {
    since: Instant,
    position_ns: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencyReport {
    /// Seconds from a setpoint move until the counter followed.
    pub move_delay_s: Option<f64>,
    /// Seconds from a bucket correction until the counter followed.
    pub bucket_delay_s: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct LatencyTracker {
    moved: Option<Pending>,
    corrected: Option<Pending>,
}

impl LatencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn moved(&mut self, at: Instant, position_ns: f64) {
        self.moved = Some(Pending {
            since: at,
            position_ns,
        });
    }

    pub fn corrected(&mut self, at: Instant, position_ns: f64) {
        self.corrected = Some(Pending {
            since: at,
            position_ns,
        });
    }

    pub fn is_pending(&self) -> bool {
        self.moved.is_some() || self.corrected.is_some()
    }

    /// Check a fresh reading against every pending move.
    pub fn observe(
        &mut self,
        now: Instant,
        time_ns: f64,
        trigger_ns: f64,
        params: &ModelParameters,
    ) -> LatencyReport {
        let settle = |slot: &mut Option<Pending>| -> Option<f64> {
            let p = (*slot)?;
            let expected = params.predict(p.position_ns, trigger_ns).time_ns;
            if (time_ns - expected).abs() < LATENCY_WINDOW_NS {
                *slot = None;
                Some(now.saturating_duration_since(p.since).as_secs_f64())
            } else {
                None
            }
        };
        LatencyReport {
            move_delay_s: settle(&mut self.moved),
            bucket_delay_s: settle(&mut self.corrected),
        }
    }
}
