//! Target time → phase shifter position and trigger delay.
//!
//! The phase shifter covers one laser period; the trigger moves in whole
//! trigger periods. A target is split into the laser pulse that must land on
//! it (phase shifter, modulo one period) and the trigger setting that places
//! the delayed trigger just ahead of that pulse.
use femto_traits::ChannelService;

use crate::actuator::{PhaseActuator, TriggerChannel};
use crate::config::{LimitsCfg, RfCfg};
use crate::error::LockError;
use crate::link::Link;
use crate::sawtooth::ModelParameters;

/// Phase shifter moves smaller than this are skipped (ns).
pub const MOVE_DEADBAND_NS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetpointPlan {
    /// Target after clamping to the alarm band.
    pub target_ns: f64,
    pub phase_ns: f64,
    pub trigger_ns: f64,
    /// Set when the target was clamped.
    pub notice: Option<&'static str>,
}

/// Operator band around the target time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlarmBand {
    pub lolo: f64,
    pub hihi: f64,
}

/// Validate and clamp `target_ns`, then compute where the hardware should go.
pub fn plan(
    target_ns: f64,
    band: AlarmBand,
    params: &ModelParameters,
    rf: &RfCfg,
    limits: &LimitsCfg,
) -> Result<SetpointPlan, LockError> {
    if target_ns.is_nan() {
        return Err(LockError::TargetRejected("desired time is NaN".into()));
    }
    if target_ns < limits.min_time_ns || target_ns > limits.max_time_ns {
        return Err(LockError::TargetRejected("need to move TIC trigger".into()));
    }
    let mut t = target_ns;
    let mut notice = None;
    if t > band.hihi {
        t = band.hihi;
        notice = Some("TGT bigger than time_hihi");
    }
    if t < band.lolo {
        t = band.lolo;
        notice = Some("TGT smaller than time_lolo");
    }

    let laser_t = t - params.offset_ns;
    let nlaser = (laser_t * rf.laser_ghz).floor();
    let phase_ns = (t - (params.offset_ns + nlaser / rf.laser_ghz)).rem_euclid(params.period_ns);
    let ntrig = ((t - params.delay_ns - rf.trigger_period_ns()) * rf.trigger_ghz).round();
    Ok(SetpointPlan {
        target_ns: t,
        phase_ns,
        trigger_ns: ntrig / rf.trigger_ghz,
        notice,
    })
}

/// What applying a plan changed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SetpointApplied {
    pub trigger_moved: bool,
    /// Commanded phase when the phase shifter moved.
    pub moved_to: Option<f64>,
}

/// Drive the trigger (when allowed) and phase shifter to a plan, with the
/// drift correction taken off the phase.
pub fn apply<S: ChannelService>(
    link: &mut Link<S>,
    actuator: &mut PhaseActuator,
    trigger: &TriggerChannel,
    plan: &SetpointPlan,
    drift_correction_ns: f64,
    enable_trigger: bool,
) -> Result<SetpointApplied, LockError> {
    let mut out = SetpointApplied::default();
    let pc = plan.phase_ns - drift_correction_ns;
    if enable_trigger && trigger.get_ns(link)? != plan.trigger_ns {
        trigger.set_ns(link, plan.trigger_ns)?;
        tracing::info!(trigger_ns = plan.trigger_ns, "trigger moved");
        out.trigger_moved = true;
    }
    let position = actuator.get_position(link)?;
    if (position - pc).abs() > MOVE_DEADBAND_NS {
        actuator.move_to(link, pc)?;
        out.moved_to = Some(pc);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sawtooth::predict;

    fn params() -> ModelParameters {
        ModelParameters::new(21.7, 4.2, 1.0 / 0.068)
    }

    fn wide() -> AlarmBand {
        AlarmBand {
            lolo: -1e6,
            hihi: 1e6,
        }
    }

    #[test]
    fn nan_and_out_of_limits_are_rejected() {
        let (rf, lim) = (RfCfg::default(), LimitsCfg::default());
        assert_eq!(
            plan(f64::NAN, wide(), &params(), &rf, &lim),
            Err(LockError::TargetRejected("desired time is NaN".into()))
        );
        assert_eq!(
            plan(30_000.0, wide(), &params(), &rf, &lim),
            Err(LockError::TargetRejected("need to move TIC trigger".into()))
        );
    }

    #[test]
    fn target_is_clamped_to_the_alarm_band() {
        let (rf, lim) = (RfCfg::default(), LimitsCfg::default());
        let band = AlarmBand {
            lolo: 0.0,
            hihi: 100.0,
        };
        let p = plan(150.0, band, &params(), &rf, &lim).unwrap();
        assert_eq!(p.target_ns, 100.0);
        assert_eq!(p.notice, Some("TGT bigger than time_hihi"));
        let p = plan(-5.0, band, &params(), &rf, &lim).unwrap();
        assert_eq!(p.target_ns, 0.0);
        assert_eq!(p.notice, Some("TGT smaller than time_lolo"));
    }

    #[test]
    fn planned_hardware_reproduces_the_target() {
        let (rf, lim) = (RfCfg::default(), LimitsCfg::default());
        let m = params();
        for t in [25.0, 30.0, 100.0, 1234.5] {
            let p = plan(t, wide(), &m, &rf, &lim).unwrap();
            assert!(p.phase_ns >= 0.0 && p.phase_ns < m.period_ns);
            let got = predict(p.phase_ns, p.trigger_ns, m.delay_ns, m.offset_ns, m.period_ns);
            assert!((got.time_ns - t).abs() < 1e-9, "target {t} predicted {}", got.time_ns);
        }
    }
}
