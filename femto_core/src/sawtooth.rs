//! Sawtooth model of the laser arrival time.
//!
//! The counter starts on the trigger (delayed by the cable `delay`) and stops
//! on the next laser pulse. Laser pulses arrive at `position + offset + n·period`
//! for integer `n`, so the measured time is the first such pulse at or after the
//! delayed trigger. Near the ends of the sawtooth the counter can catch either
//! of two pulses; those positions get weight 0.

/// Fitted model of one locker. `period_ns` is fixed by the laser frequency;
/// `delay_ns` and `offset_ns` change only through calibration and bucket correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelParameters {
    pub delay_ns: f64,
    pub offset_ns: f64,
    pub period_ns: f64,
}

impl ModelParameters {
    pub fn new(delay_ns: f64, offset_ns: f64, period_ns: f64) -> Self {
        Self {
            delay_ns,
            offset_ns,
            period_ns,
        }
    }

    pub fn predict(&self, position_ns: f64, trigger_ns: f64) -> Prediction {
        predict(position_ns, trigger_ns, self.delay_ns, self.offset_ns, self.period_ns)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub time_ns: f64,
    /// 1 inside the trusted middle of the sawtooth, 0 near its edges.
    pub weight: f64,
}

/// Predicted counter time for a phase shifter `position` and coarse `trigger`.
pub fn predict(position: f64, trigger: f64, delay: f64, offset: f64, period: f64) -> Prediction {
    let trig_out = trigger + delay;
    let laser_t0 = position + offset;
    let n = ((trig_out - laser_t0) / period).ceil();
    let time_ns = laser_t0 + n * period;
    let tr = time_ns - trig_out;
    let weight =
        (0.5 + 0.5_f64.copysign(tr - 0.2 * period)) * (0.5 + 0.5_f64.copysign(0.8 * period - tr));
    Prediction { time_ns, weight }
}
