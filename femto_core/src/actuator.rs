//! Motorized phase shifter and the coarse EVR trigger.
use femto_traits::ChannelService;

use crate::config::{ActuatorCfg, RfCfg};
use crate::error::LockError;
use crate::link::Link;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorState {
    pub position_ns: f64,
    pub moving: bool,
}

/// Phase shifter driven in motor units, reported in ns.
#[derive(Debug)]
pub struct PhaseActuator {
    cfg: ActuatorCfg,
    commanded_ns: f64,
}

impl PhaseActuator {
    /// Adopt whatever position the motor was last commanded to and wait for it to settle.
    pub fn connect<S: ChannelService>(
        link: &mut Link<S>,
        cfg: ActuatorCfg,
    ) -> Result<Self, LockError> {
        let ch = link.ch();
        let commanded_ns = link.get(&ch.phase_motor)? * cfg.scale;
        let mut this = Self { cfg, commanded_ns };
        this.wait_for_stop(link)?;
        Ok(this)
    }

    /// Poll done-moving and the readback until the motor sits within tolerance
    /// of the last command, at most `max_tries` times.
    pub fn wait_for_stop<S: ChannelService>(
        &mut self,
        link: &mut Link<S>,
    ) -> Result<ActuatorState, LockError> {
        let ch = link.ch();
        for _ in 0..self.cfg.max_tries {
            let stopped = match link.get(&ch.phase_motor_dmov) {
                Ok(v) => v,
                Err(e) => {
                    tracing::debug!(error = %e, "done-moving read failed; assuming still moving");
                    false
                }
            };
            if stopped {
                let rbv = link.get(&ch.phase_motor_rbv)? * self.cfg.scale;
                if (rbv - self.commanded_ns).abs() < self.cfg.tolerance_ns {
                    return Ok(ActuatorState {
                        position_ns: rbv,
                        moving: false,
                    });
                }
            }
            link.sleep(self.cfg.poll);
        }
        Err(LockError::ActuatorStuck {
            target_ns: self.commanded_ns,
            tries: self.cfg.max_tries,
        })
    }

    pub fn move_to<S: ChannelService>(
        &mut self,
        link: &mut Link<S>,
        position_ns: f64,
    ) -> Result<ActuatorState, LockError> {
        let ch = link.ch();
        link.put(&ch.phase_motor, position_ns / self.cfg.scale)?;
        self.commanded_ns = position_ns;
        tracing::debug!(position_ns, "phase shifter move");
        self.wait_for_stop(link)
    }

    /// Settled commanded position (ns).
    pub fn get_position<S: ChannelService>(&mut self, link: &mut Link<S>) -> Result<f64, LockError> {
        self.wait_for_stop(link)?;
        let ch = link.ch();
        self.commanded_ns = link.get(&ch.phase_motor)? * self.cfg.scale;
        Ok(self.commanded_ns)
    }

    pub fn commanded_ns(&self) -> f64 {
        self.commanded_ns
    }
}

/// EVR trigger delay in ns; moves are whole trigger periods.
#[derive(Debug, Clone, Copy)]
pub struct TriggerChannel {
    period_ns: f64,
}

impl TriggerChannel {
    pub fn new(rf: &RfCfg) -> Self {
        Self {
            period_ns: rf.trigger_period_ns(),
        }
    }

    pub fn get_ns<S: ChannelService>(&self, link: &mut Link<S>) -> Result<f64, LockError> {
        let ch = link.ch();
        link.get(&ch.laser_trigger)
    }

    pub fn set_ns<S: ChannelService>(&self, link: &mut Link<S>, t: f64) -> Result<(), LockError> {
        let ch = link.ch();
        link.put(&ch.laser_trigger, t)
    }

    /// Nearest whole number of trigger periods.
    pub fn quantize(&self, t: f64) -> f64 {
        (t / self.period_ns).round() * self.period_ns
    }

    pub fn period_ns(&self) -> f64 {
        self.period_ns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timeouts;
    use femto_hardware::{SimParams, SimulatedLocker};
    use femto_traits::{LockerChannels, ManualClock, Value};
    use std::sync::Arc;

    fn rig(move_polls: u32) -> (SimulatedLocker, Link<femto_hardware::SimConnection>, ManualClock) {
        let ch = Arc::new(LockerChannels::new("T:", "T:TRIG", "T:BKT"));
        let sim = SimulatedLocker::new(
            (*ch).clone(),
            SimParams {
                move_polls,
                ..SimParams::default()
            },
        );
        let clock = ManualClock::new();
        let link = Link::new(sim.connect(), ch, Timeouts::default(), Arc::new(clock.clone()));
        (sim, link, clock)
    }

    #[test]
    fn move_waits_for_the_readback() {
        let (sim, mut link, clock) = rig(3);
        let mut act = PhaseActuator::connect(&mut link, ActuatorCfg::default()).unwrap();
        let st = act.move_to(&mut link, 7.25).unwrap();
        assert!(!st.moving);
        assert!((st.position_ns - 7.25).abs() < 3e-5);
        assert!((sim.position_ns() - 7.25).abs() < 1e-12);
        assert!(clock.elapsed() >= ActuatorCfg::default().poll * 2);
        assert!((act.get_position(&mut link).unwrap() - 7.25).abs() < 1e-12);
    }

    #[test]
    fn a_motor_that_never_settles_is_stuck() {
        let (_sim, mut link, _clock) = rig(1_000);
        let cfg = ActuatorCfg {
            max_tries: 5,
            ..ActuatorCfg::default()
        };
        let mut act = PhaseActuator::connect(&mut link, cfg).unwrap();
        let err = act.move_to(&mut link, 1.0).unwrap_err();
        assert_eq!(
            err,
            LockError::ActuatorStuck {
                target_ns: 1.0,
                tries: 5
            }
        );
    }

    #[test]
    fn trigger_quantizes_to_whole_periods() {
        let (sim, mut link, _clock) = rig(0);
        let trig = TriggerChannel::new(&RfCfg::default());
        let p = trig.period_ns();
        assert!((trig.quantize(3.2 * p) - 3.0 * p).abs() < 1e-9);
        trig.set_ns(&mut link, 2.0 * p).unwrap();
        assert_eq!(sim.value("T:TRIG"), Some(Value::Float(2.0 * p)));
        assert_eq!(trig.get_ns(&mut link).unwrap(), 2.0 * p);
    }
}
