#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the femto laser locker.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - Every section except `[locker]` has defaults matching the deployed lockers,
//!   so a minimal file only names the locker and its channel prefix.
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Locker {
    /// Hutch / system name, used in logs and the version string.
    pub name: String,
    /// Channel prefix, e.g. "LAS:FS14:".
    pub base: String,
    /// Full name of the EVR trigger delay record (ns).
    pub laser_trigger: String,
    /// Full name of the bucket-correction latency record.
    pub bucket_correction_delay: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Rf {
    /// Laser repetition frequency (GHz); the model period is its inverse.
    pub laser_ghz: f64,
    /// RF locking frequency (GHz); one bucket = 1 / locking_ghz ns.
    pub locking_ghz: f64,
    /// EVR trigger frequency (GHz); trigger moves are whole periods of this.
    pub trigger_ghz: f64,
}

impl Default for Rf {
    fn default() -> Self {
        Self {
            laser_ghz: 0.068,
            locking_ghz: 3.808,
            trigger_ghz: 0.119,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Counter {
    /// Counter units per ns (counter reports seconds).
    pub scale: f64,
    /// Number of accepted readings kept for the spread estimate.
    pub ring_size: usize,
    /// Largest spread (ns) over the ring for a sample to count as good.
    pub max_spread_ns: f64,
}

impl Default for Counter {
    fn default() -> Self {
        Self {
            scale: 1e9,
            ring_size: 12,
            max_spread_ns: 0.5,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Actuator {
    /// ns per motor unit (the phase shifter is driven in ps).
    pub scale: f64,
    /// Poll attempts before a move is declared stuck.
    pub max_tries: u32,
    /// Interval between done-moving polls.
    pub poll_ms: u64,
    /// Readback must be within this many ns of the command.
    pub tolerance_ns: f64,
}

impl Default for Actuator {
    fn default() -> Self {
        Self {
            scale: 0.001,
            max_tries: 100,
            poll_ms: 100,
            tolerance_ns: 3e-5,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Swept actuator positions.
    pub points: usize,
    /// Sweep span (ns), starting at 0.
    pub range_ns: f64,
    /// Candidate offsets tried across one period.
    pub offset_candidates: usize,
    /// Wait after each move before reading the counter.
    pub settle_ms: u64,
    /// Counter reads attempted per swept position.
    pub sample_attempts: u32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            points: 50,
            range_ns: 30.0,
            offset_candidates: 10_000,
            settle_ms: 2_000,
            sample_attempts: 25,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Jump {
    /// Largest non-integer residual (ns) still treated as a clean bucket jump.
    pub max_jump_error_ns: f64,
    /// Wait after a corrective move before trusting the counter again.
    pub settle_ms: u64,
    /// Cycles without a new counter reading before "No counter reading" is reported.
    pub stale_report_cycles: u32,
}

impl Default for Jump {
    fn default() -> Self {
        Self {
            max_jump_error_ns: 0.05,
            settle_ms: 2_000,
            stale_report_cycles: 500,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub min_time_ns: f64,
    pub max_time_ns: f64,
    /// Allowed |FREQ_SP − oscillator target| before the laser is flagged.
    pub max_frequency_error: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            min_time_ns: -880_000.0,
            max_time_ns: 20_000.0,
            max_frequency_error: 100.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Drift {
    pub enabled: bool,
    /// +1 or -1 depending on how the timetool stage is mounted.
    pub direction: f64,
    /// ns per unit of the drift signal (signal arrives in ps).
    pub input_scale: f64,
    /// Hard bound on the applied correction (ns).
    pub clamp_ns: f64,
}

impl Default for Drift {
    fn default() -> Self {
        Self {
            enabled: false,
            direction: 1.0,
            input_scale: 0.001,
            clamp_ns: 0.001,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Per-read timeout (ms).
    pub read_ms: u64,
    /// Per-write timeout (ms).
    pub write_ms: u64,
    /// Timeout for status message writes (ms).
    pub status_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            read_ms: 10_000,
            write_ms: 10_000,
            status_ms: 1_000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Supervisor {
    /// Sleep between control cycles.
    pub cycle_ms: u64,
    /// Extra back-off while the laser health check fails.
    pub fault_backoff_ms: u64,
    /// Consecutive watchdog initialization failures before giving up.
    pub max_watchdog_failures: u32,
    /// Interval of the channel error summary (s).
    pub error_report_s: u64,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self {
            cycle_ms: 100,
            fault_backoff_ms: 500,
            max_watchdog_failures: 2,
            error_report_s: 600,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Last known fit; used when the delay/offset channels cannot be read at startup.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct PersistedModel {
    pub delay_ns: f64,
    pub offset_ns: f64,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub locker: Locker,
    #[serde(default)]
    pub rf: Rf,
    #[serde(default)]
    pub counter: Counter,
    #[serde(default)]
    pub actuator: Actuator,
    #[serde(default)]
    pub calibration: Calibration,
    #[serde(default)]
    pub jump: Jump,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub drift: Drift,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub supervisor: Supervisor,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub model: Option<PersistedModel>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))?;
    cfg.validate()?;
    Ok(cfg)
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Locker
        if self.locker.name.trim().is_empty() {
            eyre::bail!("locker.name must not be empty");
        }
        if self.locker.base.trim().is_empty() {
            eyre::bail!("locker.base must not be empty");
        }
        if self.locker.laser_trigger.trim().is_empty() {
            eyre::bail!("locker.laser_trigger must not be empty");
        }

        // RF
        if !positive(self.rf.laser_ghz) {
            eyre::bail!("rf.laser_ghz must be > 0");
        }
        if !positive(self.rf.locking_ghz) {
            eyre::bail!("rf.locking_ghz must be > 0");
        }
        if !positive(self.rf.trigger_ghz) {
            eyre::bail!("rf.trigger_ghz must be > 0");
        }

        // Counter
        if !positive(self.counter.scale) {
            eyre::bail!("counter.scale must be > 0");
        }
        if self.counter.ring_size < 2 {
            eyre::bail!("counter.ring_size must be >= 2");
        }
        if !positive(self.counter.max_spread_ns) {
            eyre::bail!("counter.max_spread_ns must be > 0");
        }

        // Actuator
        if !positive(self.actuator.scale) {
            eyre::bail!("actuator.scale must be > 0");
        }
        if self.actuator.max_tries == 0 {
            eyre::bail!("actuator.max_tries must be >= 1");
        }
        if self.actuator.poll_ms > 60_000 {
            eyre::bail!("actuator.poll_ms is unreasonably large (>60s)");
        }
        if !positive(self.actuator.tolerance_ns) {
            eyre::bail!("actuator.tolerance_ns must be > 0");
        }

        // Calibration
        if self.calibration.points < 2 {
            eyre::bail!("calibration.points must be >= 2");
        }
        if !positive(self.calibration.range_ns) {
            eyre::bail!("calibration.range_ns must be > 0");
        }
        if self.calibration.offset_candidates < 2 {
            eyre::bail!("calibration.offset_candidates must be >= 2");
        }
        if self.calibration.sample_attempts == 0 {
            eyre::bail!("calibration.sample_attempts must be >= 1");
        }

        // Jump
        let period_ns = 1.0 / self.rf.laser_ghz;
        let bucket_ns = 1.0 / self.rf.locking_ghz;
        if !positive(self.jump.max_jump_error_ns) {
            eyre::bail!("jump.max_jump_error_ns must be > 0");
        }
        if self.jump.max_jump_error_ns >= bucket_ns / 2.0 {
            eyre::bail!("jump.max_jump_error_ns must be below half a bucket ({bucket_ns:.4} ns)");
        }

        // Limits
        if !(self.limits.min_time_ns.is_finite() && self.limits.max_time_ns.is_finite()) {
            eyre::bail!("limits.min_time_ns and limits.max_time_ns must be finite");
        }
        if self.limits.min_time_ns >= self.limits.max_time_ns {
            eyre::bail!("limits.min_time_ns must be < limits.max_time_ns");
        }
        if !positive(self.limits.max_frequency_error) {
            eyre::bail!("limits.max_frequency_error must be > 0");
        }

        // Drift
        if self.drift.direction != 1.0 && self.drift.direction != -1.0 {
            eyre::bail!("drift.direction must be 1 or -1");
        }
        if !positive(self.drift.input_scale) {
            eyre::bail!("drift.input_scale must be > 0");
        }
        if !positive(self.drift.clamp_ns) || self.drift.clamp_ns >= period_ns {
            eyre::bail!("drift.clamp_ns must be in (0, laser period)");
        }

        // Timeouts
        if self.timeouts.read_ms == 0 {
            eyre::bail!("timeouts.read_ms must be >= 1");
        }
        if self.timeouts.write_ms == 0 {
            eyre::bail!("timeouts.write_ms must be >= 1");
        }
        if self.timeouts.status_ms == 0 {
            eyre::bail!("timeouts.status_ms must be >= 1");
        }
        for (name, ms) in [
            ("timeouts.read_ms", self.timeouts.read_ms),
            ("timeouts.write_ms", self.timeouts.write_ms),
            ("timeouts.status_ms", self.timeouts.status_ms),
        ] {
            if ms > 60_000 {
                eyre::bail!("{name} is unreasonably large (>60s)");
            }
        }

        // Supervisor
        if self.supervisor.max_watchdog_failures == 0 {
            eyre::bail!("supervisor.max_watchdog_failures must be >= 1");
        }
        if self.supervisor.error_report_s == 0 {
            eyre::bail!("supervisor.error_report_s must be >= 1");
        }

        // Model
        if let Some(m) = self.model
            && !(m.delay_ns.is_finite() && m.offset_ns.is_finite())
        {
            eyre::bail!("model.delay_ns and model.offset_ns must be finite");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
