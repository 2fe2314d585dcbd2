//! Runtime configuration for the lock controller.
//!
//! These are the structs the components hold. They are separate from the
//! TOML-deserialized config in `femto_config`; see `conversions`.
use std::time::Duration;

/// RF frequencies (GHz). Times everywhere in the core are ns.
#[derive(Debug, Clone, Copy)]
pub struct RfCfg {
    pub laser_ghz: f64,
    pub locking_ghz: f64,
    pub trigger_ghz: f64,
}

impl RfCfg {
    /// Laser pulse period; the sawtooth period of the model.
    pub fn period_ns(&self) -> f64 {
        1.0 / self.laser_ghz
    }

    /// One RF bucket.
    pub fn bucket_ns(&self) -> f64 {
        1.0 / self.locking_ghz
    }

    pub fn trigger_period_ns(&self) -> f64 {
        1.0 / self.trigger_ghz
    }
}

impl Default for RfCfg {
    fn default() -> Self {
        Self {
            laser_ghz: 0.068,
            locking_ghz: 3.808,
            trigger_ghz: 0.119,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CounterCfg {
    /// Raw counter units per ns.
    pub scale: f64,
    pub ring_size: usize,
    /// Largest ring spread (ns) for a sample to count as good.
    pub max_spread_ns: f64,
}

impl Default for CounterCfg {
    fn default() -> Self {
        Self {
            scale: 1e9,
            ring_size: 12,
            max_spread_ns: 0.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActuatorCfg {
    /// ns per motor unit.
    pub scale: f64,
    pub max_tries: u32,
    pub poll: Duration,
    pub tolerance_ns: f64,
}

impl Default for ActuatorCfg {
    fn default() -> Self {
        Self {
            scale: 0.001,
            max_tries: 100,
            poll: Duration::from_millis(100),
            tolerance_ns: 3e-5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CalibrationCfg {
    pub points: usize,
    pub range_ns: f64,
    pub offset_candidates: usize,
    pub settle: Duration,
    pub sample_attempts: u32,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            points: 50,
            range_ns: 30.0,
            offset_candidates: 10_000,
            settle: Duration::from_secs(2),
            sample_attempts: 25,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JumpCfg {
    pub max_jump_error_ns: f64,
    /// Wait after a corrective move.
    pub settle: Duration,
    pub stale_report_cycles: u32,
}

impl Default for JumpCfg {
    fn default() -> Self {
        Self {
            max_jump_error_ns: 0.05,
            settle: Duration::from_secs(2),
            stale_report_cycles: 500,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LimitsCfg {
    pub min_time_ns: f64,
    pub max_time_ns: f64,
    pub max_frequency_error: f64,
}

impl Default for LimitsCfg {
    fn default() -> Self {
        Self {
            min_time_ns: -880_000.0,
            max_time_ns: 20_000.0,
            max_frequency_error: 100.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DriftCfg {
    pub enabled: bool,
    /// +1 or -1.
    pub direction: f64,
    /// ns per unit of the drift signal.
    pub input_scale: f64,
    pub clamp_ns: f64,
}

impl Default for DriftCfg {
    fn default() -> Self {
        Self {
            enabled: false,
            direction: 1.0,
            input_scale: 0.001,
            clamp_ns: 0.001,
        }
    }
}

/// Per-call timeouts for the channel service.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub read: Duration,
    pub write: Duration,
    pub status: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            read: Duration::from_secs(10),
            write: Duration::from_secs(10),
            status: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SupervisorCfg {
    pub cycle: Duration,
    pub fault_backoff: Duration,
    pub max_watchdog_failures: u32,
    pub error_report: Duration,
}

impl Default for SupervisorCfg {
    fn default() -> Self {
        Self {
            cycle: Duration::from_millis(100),
            fault_backoff: Duration::from_millis(500),
            max_watchdog_failures: 2,
            error_report: Duration::from_secs(600),
        }
    }
}

/// Everything one locker needs, built once from the config file.
#[derive(Debug, Clone, Default)]
pub struct LockerCfg {
    pub name: String,
    pub rf: RfCfg,
    pub counter: CounterCfg,
    pub actuator: ActuatorCfg,
    pub calibration: CalibrationCfg,
    pub jump: JumpCfg,
    pub limits: LimitsCfg,
    pub drift: DriftCfg,
    pub timeouts: Timeouts,
    pub supervisor: SupervisorCfg,
}
