//! Command bodies: simulator assembly, the supervised run, self-check and the channel listing.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use eyre::WrapErr;
use femto_core::conversions::channels_for;
use femto_core::error::{LockError, Result};
use femto_core::{LockState, LockSupervisor, ModelParameters, SupervisorStats};
use femto_hardware::{SimParams, SimulatedLocker};
use femto_traits::{MonotonicClock, Value};

/// Simulated installation matching the config's frequencies and scales.
///
/// A `[model]` section doubles as the simulator's true delay and offset.
pub fn simulator(cfg: &femto_config::Config) -> SimulatedLocker {
    let defaults = SimParams::default();
    let (delay_ns, offset_ns) = cfg
        .model
        .map_or((defaults.delay_ns, defaults.offset_ns), |m| (m.delay_ns, m.offset_ns));
    SimulatedLocker::new(
        channels_for(cfg),
        SimParams {
            delay_ns,
            offset_ns,
            laser_ghz: cfg.rf.laser_ghz,
            locking_ghz: cfg.rf.locking_ghz,
            counter_scale: cfg.counter.scale,
            motor_scale: cfg.actuator.scale,
            ..defaults
        },
    )
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stats: SupervisorStats,
    pub model: Option<ModelParameters>,
    pub bucket_counter: i64,
}

impl RunSummary {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "cycles": self.stats.cycles,
            "jumps_corrected": self.stats.jumps_corrected,
            "calibrations": self.stats.calibrations,
            "faults": self.stats.faults,
            "reinits": self.stats.reinits,
            "bucket_counter": self.bucket_counter,
            "delay_ns": self.model.map(|m| m.delay_ns),
            "offset_ns": self.model.map(|m| m.offset_ns),
        })
    }

    pub fn render(&self) -> String {
        let model = self.model.map_or_else(
            || "no model".to_string(),
            |m| format!("delay {:.4} ns, offset {:.4} ns", m.delay_ns, m.offset_ns),
        );
        format!(
            "Run complete: {} cycles, {} jumps corrected, {} calibrations, {} faults, {} reinits\nFinal model: {model}",
            self.stats.cycles,
            self.stats.jumps_corrected,
            self.stats.calibrations,
            self.stats.faults,
            self.stats.reinits,
        )
    }
}

pub fn run_locker(
    cfg: &femto_config::Config,
    cycles: Option<u64>,
    calibrate: bool,
    inject_jump: Option<i64>,
    shutdown: &AtomicBool,
) -> Result<RunSummary> {
    let sim = simulator(cfg);
    let ch = channels_for(cfg);
    if calibrate {
        sim.set(ch.calibrate.name(), Value::Bool(true));
    }
    if let Some(k) = inject_jump {
        tracing::info!(buckets = k, "injecting bucket slip");
        sim.slip_buckets(k);
    }

    let mut sup = LockSupervisor::from_config(sim.factory(), cfg, Arc::new(MonotonicClock::new()))
        .wrap_err("build lock supervisor")?;
    tracing::info!(locker = %cfg.locker.name, cycles = ?cycles, "lock supervisor starting");
    let stats = sup.run(shutdown, cycles)?;
    let bucket_counter = match sim.value(ch.bucket_counter.name()) {
        Some(Value::Int(n)) => n,
        _ => 0,
    };
    Ok(RunSummary {
        stats,
        model: sup.params(),
        bucket_counter,
    })
}

#[derive(Debug, Clone)]
pub struct SelfCheck {
    pub model: ModelParameters,
    pub status: String,
}

/// Connect once, run one cycle, and report whether the laser looked healthy.
pub fn self_check(cfg: &femto_config::Config) -> Result<SelfCheck> {
    let sim = simulator(cfg);
    let ch = channels_for(cfg);
    let mut sup = LockSupervisor::from_config(sim.factory(), cfg, Arc::new(MonotonicClock::new()))?;
    let report = sup.step()?;
    if let Some(e) = report.error {
        return Err(eyre::Report::new(e)).wrap_err("self-check cycle failed");
    }
    let status = match sim.value(ch.status.name()) {
        Some(v) => v.to_string(),
        None => String::new(),
    };
    if report.state == LockState::Fault {
        return Err(eyre::Report::new(LockError::State(format!(
            "laser unhealthy: {status}"
        ))));
    }
    let model = sup
        .params()
        .ok_or_else(|| LockError::State("no model after connect".into()))?;
    sup.shutdown();
    Ok(SelfCheck { model, status })
}

pub fn channel_listing(cfg: &femto_config::Config) -> Vec<(&'static str, String)> {
    channels_for(cfg)
        .listing()
        .into_iter()
        .map(|(role, name)| (role, name.to_string()))
        .collect()
}
