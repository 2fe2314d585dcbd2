//! Time-interval counter reader with range, jitter and stability gates.
use femto_traits::ChannelService;

use crate::config::CounterCfg;
use crate::error::LockError;
use crate::link::Link;
use crate::ring::RingBuffer;

/// One accepted counter reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedSample {
    pub time_ns: f64,
    /// Ring full and its spread within the stability tolerance.
    pub is_good: bool,
    /// max − min over the ring (ns).
    pub spread_ns: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadOutcome {
    Accepted(ValidatedSample),
    /// Same raw value as the last accepted reading.
    NoNewData,
    OutOfRange { raw: f64 },
    /// Counter-reported jitter above its ceiling.
    Noisy { jitter: f64 },
}

impl ReadOutcome {
    pub fn sample(&self) -> Option<ValidatedSample> {
        match self {
            ReadOutcome::Accepted(s) => Some(*s),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ReadOutcome::Accepted(_) => "accepted",
            ReadOutcome::NoNewData => "no new data",
            ReadOutcome::OutOfRange { .. } => "out of range",
            ReadOutcome::Noisy { .. } => "noisy",
        }
    }
}

#[derive(Debug)]
pub struct TimeIntervalReader {
    cfg: CounterCfg,
    ring: RingBuffer<f64>,
    last_raw: Option<f64>,
    last_rejection: Option<&'static str>,
    rejection_warnings: u32,
    stale_reads: u32,
}

impl TimeIntervalReader {
    pub fn new(cfg: CounterCfg) -> Self {
        Self {
            ring: RingBuffer::new(cfg.ring_size),
            cfg,
            last_raw: None,
            last_rejection: None,
            rejection_warnings: 0,
            stale_reads: 0,
        }
    }

    /// Read the counter and its limits. The ring changes only on acceptance.
    pub fn read<S: ChannelService>(&mut self, link: &mut Link<S>) -> Result<ReadOutcome, LockError> {
        let ch = link.ch();
        let jitter_high = link.get(&ch.counter_jitter_high)?;
        let low = link.get(&ch.counter_low)?;
        let high = link.get(&ch.counter_high)?;
        let raw = link.get(&ch.counter)?;

        let outcome = if self.last_raw == Some(raw) {
            ReadOutcome::NoNewData
        } else if !raw.is_finite() || raw > high || raw < low {
            ReadOutcome::OutOfRange { raw }
        } else {
            let jitter = link.get(&ch.counter_jitter)?;
            if jitter > jitter_high {
                ReadOutcome::Noisy { jitter }
            } else {
                self.last_raw = Some(raw);
                let time_ns = raw * self.cfg.scale;
                self.ring.push(time_ns);
                let spread_ns = self.ring.spread();
                ReadOutcome::Accepted(ValidatedSample {
                    time_ns,
                    is_good: self.ring.is_full() && spread_ns <= self.cfg.max_spread_ns,
                    spread_ns,
                })
            }
        };

        match outcome {
            ReadOutcome::Accepted(_) => {
                self.last_rejection = None;
                self.stale_reads = 0;
            }
            ReadOutcome::NoNewData => {
                self.stale_reads = self.stale_reads.saturating_add(1);
            }
            ReadOutcome::OutOfRange { raw } => self.warn_once(&outcome, || {
                tracing::warn!(raw, low, high, "counter reading out of range");
            }),
            ReadOutcome::Noisy { jitter } => self.warn_once(&outcome, || {
                tracing::warn!(jitter, jitter_high, "counter jitter above ceiling");
            }),
        }
        Ok(outcome)
    }

    fn warn_once(&mut self, outcome: &ReadOutcome, log: impl FnOnce()) {
        let kind = outcome.kind();
        if self.last_rejection != Some(kind) {
            log();
            self.rejection_warnings = self.rejection_warnings.saturating_add(1);
            self.last_rejection = Some(kind);
        }
    }

    /// Drop the stability history, e.g. after the phase shifter moved.
    pub fn flush(&mut self) {
        self.ring.clear();
    }

    /// Consecutive reads that returned no new data.
    pub fn stale_reads(&self) -> u32 {
        self.stale_reads
    }

    pub fn spread_ns(&self) -> f64 {
        self.ring.spread()
    }

    /// Rejection warnings logged so far; a run of one rejection kind logs once.
    pub fn rejection_warnings(&self) -> u32 {
        self.rejection_warnings
    }
}
