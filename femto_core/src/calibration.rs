//! Sawtooth calibration: sweep the phase shifter, then fit delay and offset.
//!
//! The sweep covers more than one laser period, so the smallest good reading
//! sits right after the delayed trigger and fixes the delay. The offset is then
//! found by brute-force search over evenly spaced candidates in one period,
//! scoring each by the weighted squared residual against the sweep.
use femto_traits::ChannelService;

use crate::actuator::{PhaseActuator, TriggerChannel};
use crate::config::CalibrationCfg;
use crate::counter::TimeIntervalReader;
use crate::error::LockError;
use crate::link::Link;
use crate::sawtooth::predict;

/// Decides before every swept point whether the sweep may continue.
pub trait SweepGuard<S> {
    fn proceed(&mut self, link: &mut Link<S>) -> Result<bool, LockError>;
}

impl<S, F> SweepGuard<S> for F
where
    F: FnMut(&mut Link<S>) -> Result<bool, LockError>,
{
    fn proceed(&mut self, link: &mut Link<S>) -> Result<bool, LockError> {
        self(link)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepPoint {
    pub position_ns: f64,
    pub time_ns: f64,
    pub good: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationFit {
    pub delay_ns: f64,
    pub offset_ns: f64,
    /// sqrt(min weighted squared error / points).
    pub rms_ns: f64,
    pub good_points: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationOutcome {
    Fitted(CalibrationFit),
    Cancelled,
}

/// Evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Fit delay and offset to a finished sweep.
pub fn fit_sweep(
    points: &[SweepPoint],
    trigger_ns: f64,
    period_ns: f64,
    offset_candidates: usize,
) -> Result<CalibrationFit, LockError> {
    let good: Vec<&SweepPoint> = points.iter().filter(|p| p.good).collect();
    if good.len() < 2 {
        return Err(LockError::InsufficientData { good: good.len() });
    }
    let min_time = good
        .iter()
        .map(|p| p.time_ns)
        .fold(f64::INFINITY, f64::min);
    let delay_ns = min_time - trigger_ns;

    let score = |offset: f64| -> f64 {
        good.iter()
            .map(|p| {
                let s = predict(p.position_ns, trigger_ns, delay_ns, offset, period_ns);
                s.weight * (s.time_ns - p.time_ns).powi(2)
            })
            .sum()
    };

    let mut best = (0.0, f64::INFINITY);
    for offset in linspace(0.0, period_ns, offset_candidates) {
        let err = score(offset);
        if err < best.1 {
            best = (offset, err);
        }
    }
    let (offset_ns, err) = best;
    Ok(CalibrationFit {
        delay_ns,
        offset_ns,
        rms_ns: (err / points.len() as f64).sqrt(),
        good_points: good.len(),
    })
}

#[derive(Debug, Clone)]
pub struct Calibrator {
    cfg: CalibrationCfg,
    period_ns: f64,
}

impl Calibrator {
    pub fn new(cfg: CalibrationCfg, period_ns: f64) -> Self {
        Self { cfg, period_ns }
    }

    pub fn positions(&self) -> Vec<f64> {
        linspace(0.0, self.cfg.range_ns, self.cfg.points)
    }

    /// Sweep the phase shifter and fit the model.
    ///
    /// On cancellation the actuator goes back to the first swept position and
    /// nothing is fitted. The caller owns persisting a fit.
    pub fn run<S, G>(
        &self,
        link: &mut Link<S>,
        actuator: &mut PhaseActuator,
        reader: &mut TimeIntervalReader,
        trigger: &TriggerChannel,
        guard: &mut G,
    ) -> Result<CalibrationOutcome, LockError>
    where
        S: ChannelService,
        G: SweepGuard<S>,
    {
        let positions = self.positions();
        let home = positions.first().copied().unwrap_or(0.0);
        let trigger_ns = trigger.get_ns(link)?;
        actuator.move_to(link, home)?;

        let mut sweep = Vec::with_capacity(positions.len());
        for (i, &position_ns) in positions.iter().enumerate() {
            let proceed = match guard.proceed(link) {
                Ok(p) => p,
                Err(e) => {
                    if let Err(home_err) = actuator.move_to(link, home) {
                        tracing::warn!(error = %home_err, "could not return phase shifter after aborted sweep");
                    }
                    return Err(e);
                }
            };
            if !proceed {
                tracing::info!(point = i, "calibration cancelled");
                actuator.move_to(link, home)?;
                return Ok(CalibrationOutcome::Cancelled);
            }
            actuator.move_to(link, position_ns)?;
            link.sleep(self.cfg.settle);
            reader.flush();

            let mut sample = None;
            for _ in 0..self.cfg.sample_attempts {
                if let Some(s) = reader.read(link)?.sample() {
                    sample = Some(s);
                    break;
                }
            }
            let point = match sample {
                Some(s) => SweepPoint {
                    position_ns,
                    time_ns: s.time_ns,
                    good: true,
                },
                None => {
                    tracing::warn!(point = i, position_ns, "no counter reading at calibration point");
                    link.put_status("Timer error, bad data")?;
                    SweepPoint {
                        position_ns,
                        time_ns: 0.0,
                        good: false,
                    }
                }
            };
            sweep.push(point);
        }
        actuator.move_to(link, home)?;

        let fit = fit_sweep(&sweep, trigger_ns, self.period_ns, self.cfg.offset_candidates)?;
        tracing::info!(
            delay_ns = fit.delay_ns,
            offset_ns = fit.offset_ns,
            rms_ns = fit.rms_ns,
            good = fit.good_points,
            "calibration fitted"
        );
        Ok(CalibrationOutcome::Fitted(fit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_is_inclusive() {
        assert_eq!(linspace(0.0, 30.0, 4), vec![0.0, 10.0, 20.0, 30.0]);
        assert_eq!(linspace(5.0, 9.0, 1), vec![5.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn too_few_good_points_is_insufficient_data() {
        let pts = [
            SweepPoint {
                position_ns: 0.0,
                time_ns: 10.0,
                good: true,
            },
            SweepPoint {
                position_ns: 1.0,
                time_ns: 0.0,
                good: false,
            },
        ];
        assert_eq!(
            fit_sweep(&pts, 0.0, 14.7, 100),
            Err(LockError::InsufficientData { good: 1 })
        );
    }
}
