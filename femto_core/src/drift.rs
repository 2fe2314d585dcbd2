//! Slow drift correction from an external measurement (e.g. a timing tool).
//!
//! The external producer publishes one scalar in ps. It is scaled to ns, the
//! operator offset is removed, direction and gain are applied, and the result
//! is smoothed into a correction that is subtracted from the commanded phase.
//! The correction never exceeds `clamp_ns` in magnitude.
use femto_traits::ChannelService;

use crate::config::DriftCfg;
use crate::error::LockError;
use crate::link::Link;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriftState {
    pub last_value_ns: f64,
    pub initialized: bool,
}

/// Operator knobs and the producer's value for one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftInputs {
    /// Raw drift signal (ps).
    pub signal: f64,
    /// Operator offset (ns), subtracted before gain.
    pub offset_ns: f64,
    pub gain: f64,
    /// Averaging depth; values below 1 act as 1.
    pub smoothing: f64,
    pub accumulate: bool,
}

#[derive(Debug, Clone)]
pub struct DriftIntegrator {
    cfg: DriftCfg,
    state: DriftState,
    last_signal: Option<f64>,
}

impl DriftIntegrator {
    pub fn new(cfg: DriftCfg) -> Self {
        Self {
            cfg,
            state: DriftState::default(),
            last_signal: None,
        }
    }

    pub fn enabled(&self) -> bool {
        self.cfg.enabled
    }

    pub fn state(&self) -> DriftState {
        self.state
    }

    /// Fold one input into the state. Returns `true` when the correction changed.
    pub fn update(&mut self, inp: &DriftInputs) -> bool {
        let signal_ns = inp.signal * self.cfg.input_scale;
        let wanted = self.cfg.direction * inp.gain * (signal_ns - inp.offset_ns);
        let clamp = self.cfg.clamp_ns;

        if !self.state.initialized {
            self.state = DriftState {
                last_value_ns: wanted.clamp(-clamp, clamp),
                initialized: true,
            };
            self.last_signal = Some(inp.signal);
            return true;
        }
        if self.last_signal == Some(inp.signal) || !inp.accumulate {
            return false;
        }
        let depth = if inp.smoothing.is_finite() && inp.smoothing >= 1.0 {
            inp.smoothing
        } else {
            1.0
        };
        let last = self.state.last_value_ns;
        self.state.last_value_ns = (last + (wanted - last) / depth).clamp(-clamp, clamp);
        self.last_signal = Some(inp.signal);
        true
    }

    /// Correction to subtract from the commanded phase (ns).
    pub fn correction_ns(&self) -> f64 {
        if self.state.initialized {
            self.state.last_value_ns
        } else {
            0.0
        }
    }

    pub fn apply(&self, phase_ns: f64) -> f64 {
        phase_ns - self.correction_ns()
    }

    /// Read the drift channels, update and publish the correction.
    pub fn run<S: ChannelService>(&mut self, link: &mut Link<S>) -> Result<f64, LockError> {
        let ch = link.ch();
        let inputs = DriftInputs {
            signal: link.get(&ch.drift_signal)?,
            offset_ns: link.get(&ch.drift_offset)?,
            gain: link.get(&ch.drift_gain)?,
            smoothing: link.get(&ch.drift_smoothing)?,
            accumulate: link.get(&ch.drift_accum)?,
        };
        if self.update(&inputs) {
            link.put(&ch.drift_value, self.state.last_value_ns)?;
            tracing::debug!(correction_ns = self.state.last_value_ns, "drift correction");
        }
        Ok(self.correction_ns())
    }
}
