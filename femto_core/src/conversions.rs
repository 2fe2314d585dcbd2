//! `From` implementations bridging `femto_config` types to `femto_core` types.

use std::time::Duration;

use crate::config::{
    ActuatorCfg, CalibrationCfg, CounterCfg, DriftCfg, JumpCfg, LimitsCfg, LockerCfg, RfCfg,
    SupervisorCfg, Timeouts,
};

// ── RfCfg ────────────────────────────────────────────────────────────────────

impl From<&femto_config::Rf> for RfCfg {
    fn from(c: &femto_config::Rf) -> Self {
        Self {
            laser_ghz: c.laser_ghz,
            locking_ghz: c.locking_ghz,
            trigger_ghz: c.trigger_ghz,
        }
    }
}

// ── CounterCfg / ActuatorCfg ─────────────────────────────────────────────────

impl From<&femto_config::Counter> for CounterCfg {
    fn from(c: &femto_config::Counter) -> Self {
        Self {
            scale: c.scale,
            ring_size: c.ring_size,
            max_spread_ns: c.max_spread_ns,
        }
    }
}

impl From<&femto_config::Actuator> for ActuatorCfg {
    fn from(c: &femto_config::Actuator) -> Self {
        Self {
            scale: c.scale,
            max_tries: c.max_tries,
            poll: Duration::from_millis(c.poll_ms),
            tolerance_ns: c.tolerance_ns,
        }
    }
}

// ── CalibrationCfg / JumpCfg ─────────────────────────────────────────────────

impl From<&femto_config::Calibration> for CalibrationCfg {
    fn from(c: &femto_config::Calibration) -> Self {
        Self {
            points: c.points,
            range_ns: c.range_ns,
            offset_candidates: c.offset_candidates,
            settle: Duration::from_millis(c.settle_ms),
            sample_attempts: c.sample_attempts,
        }
    }
}

impl From<&femto_config::Jump> for JumpCfg {
    fn from(c: &femto_config::Jump) -> Self {
        Self {
            max_jump_error_ns: c.max_jump_error_ns,
            settle: Duration::from_millis(c.settle_ms),
            stale_report_cycles: c.stale_report_cycles,
        }
    }
}

// ── LimitsCfg / DriftCfg ─────────────────────────────────────────────────────

impl From<&femto_config::Limits> for LimitsCfg {
    fn from(c: &femto_config::Limits) -> Self {
        Self {
            min_time_ns: c.min_time_ns,
            max_time_ns: c.max_time_ns,
            max_frequency_error: c.max_frequency_error,
        }
    }
}

impl From<&femto_config::Drift> for DriftCfg {
    fn from(c: &femto_config::Drift) -> Self {
        Self {
            enabled: c.enabled,
            direction: c.direction,
            input_scale: c.input_scale,
            clamp_ns: c.clamp_ns,
        }
    }
}

// ── Timeouts / SupervisorCfg ─────────────────────────────────────────────────

impl From<&femto_config::Timeouts> for Timeouts {
    fn from(c: &femto_config::Timeouts) -> Self {
        Self {
            read: Duration::from_millis(c.read_ms),
            write: Duration::from_millis(c.write_ms),
            status: Duration::from_millis(c.status_ms),
        }
    }
}

impl From<&femto_config::Supervisor> for SupervisorCfg {
    fn from(c: &femto_config::Supervisor) -> Self {
        Self {
            cycle: Duration::from_millis(c.cycle_ms),
            fault_backoff: Duration::from_millis(c.fault_backoff_ms),
            max_watchdog_failures: c.max_watchdog_failures,
            error_report: Duration::from_secs(c.error_report_s),
        }
    }
}

// ── LockerCfg ────────────────────────────────────────────────────────────────

impl From<&femto_config::Config> for LockerCfg {
    fn from(c: &femto_config::Config) -> Self {
        Self {
            name: c.locker.name.clone(),
            rf: (&c.rf).into(),
            counter: (&c.counter).into(),
            actuator: (&c.actuator).into(),
            calibration: (&c.calibration).into(),
            jump: (&c.jump).into(),
            limits: (&c.limits).into(),
            drift: (&c.drift).into(),
            timeouts: (&c.timeouts).into(),
            supervisor: (&c.supervisor).into(),
        }
    }
}

/// Channel handles for the locker named in the config.
pub fn channels_for(c: &femto_config::Config) -> femto_traits::LockerChannels {
    femto_traits::LockerChannels::new(
        &c.locker.base,
        &c.locker.laser_trigger,
        &c.locker.bucket_correction_delay,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_survive_conversion() {
        let cfg = femto_config::load_toml(
            r#"
[locker]
name = "xcs"
base = "LAS:FS4:"
laser_trigger = "EVR:TRIG"
bucket_correction_delay = "LAS:FS4:VIT:BKT_DLY"

[actuator]
poll_ms = 50
"#,
        )
        .unwrap();
        let rt = LockerCfg::from(&cfg);
        assert_eq!(rt.name, "xcs");
        assert_eq!(rt.actuator.poll, Duration::from_millis(50));
        assert_eq!(rt.calibration.settle, Duration::from_secs(2));
        assert!((rt.rf.period_ns() - 1.0 / 0.068).abs() < 1e-12);
        let ch = channels_for(&cfg);
        assert_eq!(ch.status.name(), "LAS:FS4:VIT:FS_STATUS");
    }
}
