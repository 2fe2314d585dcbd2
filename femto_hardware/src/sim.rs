//! Simulated laser locker.
//!
//! Models the parts of a real installation the controller can observe: a
//! phase shifter that takes a few polls to settle, an EVR trigger, and a
//! time-interval counter whose reading follows the laser's sawtooth relation to
//! the phase shifter plus any injected bucket slips and a little noise.
//! Health readbacks and operator records are plain stored values.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use femto_traits::{BoxError, ChannelService, LockerChannels, ServiceFactory, Value};

use crate::error::HwError;
use crate::memory::MemoryService;

/// Physical truth of the simulated installation.
#[derive(Debug, Clone)]
pub struct SimParams {
    /// Cable delay after the trigger (ns).
    pub delay_ns: f64,
    /// Photodiode-to-counter offset (ns).
    pub offset_ns: f64,
    pub laser_ghz: f64,
    pub locking_ghz: f64,
    /// Initial EVR trigger delay (ns).
    pub trigger_ns: f64,
    /// Peak uniform counter noise (ns).
    pub noise_ns: f64,
    /// Done-moving polls a move takes to complete.
    pub move_polls: u32,
    /// Counter units per ns; the counter reports seconds.
    pub counter_scale: f64,
    /// ns per motor unit; the motor is driven in ps.
    pub motor_scale: f64,
    pub seed: u64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            delay_ns: 21.7,
            offset_ns: 4.2,
            laser_ghz: 0.068,
            locking_ghz: 3.808,
            trigger_ns: 0.0,
            noise_ns: 0.002,
            move_polls: 2,
            counter_scale: 1e9,
            motor_scale: 0.001,
            seed: 0x5eed_f00d,
        }
    }
}

#[derive(Debug)]
struct World {
    store: MemoryService,
    ch: LockerChannels,
    params: SimParams,
    slip_buckets: i64,
    target_units: f64,
    rbv_units: f64,
    polls_left: u32,
    rng: StdRng,
    frozen: bool,
    fail_reads: HashMap<String, u32>,
    refuse_connects: u32,
    motor_commands: Vec<f64>,
    reads: u64,
}

impl World {
    fn next_noise(&mut self) -> f64 {
        self.rng.gen_range(-1.0..=1.0) * self.params.noise_ns
    }

    fn position_ns(&self) -> f64 {
        self.rbv_units * self.params.motor_scale
    }

    fn trigger_ns(&self) -> f64 {
        match self.store.read(self.ch.laser_trigger.name()) {
            Ok(Value::Float(v)) => v,
            Ok(Value::Int(v)) => v as f64,
            _ => self.params.trigger_ns,
        }
    }

    /// Arrival time the counter would see without noise.
    fn true_time_ns(&self) -> f64 {
        let p = &self.params;
        let period = 1.0 / p.laser_ghz;
        let trig_out = self.trigger_ns() + p.delay_ns;
        let laser_t0 = self.position_ns() + p.offset_ns;
        let n = ((trig_out - laser_t0) / period).ceil();
        laser_t0 + n * period + self.slip_buckets as f64 / p.locking_ghz
    }

    fn read(&mut self, name: &str) -> Result<Value, HwError> {
        self.reads += 1;
        if let Some(left) = self.fail_reads.get_mut(name) {
            if *left > 0 {
                *left -= 1;
                return Err(HwError::Timeout(name.to_string()));
            }
        }
        if name == self.ch.counter.name() {
            if !self.frozen {
                let t = self.true_time_ns() + self.next_noise();
                self.store
                    .write(name, Value::Float(t / self.params.counter_scale));
            }
            return self.store.read(name);
        }
        if name == self.ch.phase_motor_dmov.name() {
            if self.polls_left > 0 {
                self.polls_left -= 1;
                if self.polls_left == 0 {
                    self.rbv_units = self.target_units;
                }
            }
            return Ok(Value::Bool(self.polls_left == 0));
        }
        if name == self.ch.phase_motor_rbv.name() {
            return Ok(Value::Float(self.rbv_units));
        }
        self.store.read(name)
    }

    fn write(&mut self, name: &str, value: Value) -> Result<(), HwError> {
        if name == self.ch.phase_motor.name() {
            let units = match &value {
                Value::Float(v) => *v,
                Value::Int(v) => *v as f64,
                _ => return Err(HwError::Refused(format!("{name} expects a number"))),
            };
            self.target_units = units;
            self.motor_commands.push(units * self.params.motor_scale);
            if self.params.move_polls == 0 {
                self.rbv_units = units;
            } else {
                self.polls_left = self.params.move_polls;
            }
            tracing::trace!(position_ns = units * self.params.motor_scale, "sim motor move");
        }
        self.store.write(name, value);
        Ok(())
    }
}

/// Handle onto a shared simulated installation.
#[derive(Debug, Clone)]
pub struct SimulatedLocker {
    world: Arc<Mutex<World>>,
}

impl SimulatedLocker {
    pub fn new(ch: LockerChannels, params: SimParams) -> Self {
        let period = 1.0 / params.laser_ghz;
        let mut store = MemoryService::new();
        let f = |v: f64| Value::Float(v);
        let b = Value::Bool;
        let initial: Vec<(String, Value)> = vec![
            (ch.watchdog.name().into(), Value::Int(0)),
            (ch.version.name().into(), Value::Text(String::new())),
            (ch.status.name().into(), Value::Text("OK".into())),
            (ch.busy.name().into(), b(false)),
            (ch.laser_ok.name().into(), b(false)),
            (ch.enable.name().into(), b(true)),
            (ch.calibrate.name().into(), b(false)),
            (ch.fix_bucket.name().into(), b(true)),
            (ch.enable_trigger.name().into(), b(true)),
            (ch.loop_time.name().into(), f(0.0)),
            (ch.target_time.name().into(), f(params.delay_ns + period / 2.0)),
            (ch.target_time_hihi.name().into(), f(1_000.0)),
            (ch.target_time_lolo.name().into(), f(-1_000.0)),
            (ch.timing_error.name().into(), f(0.0)),
            (ch.delay.name().into(), f(params.delay_ns)),
            (ch.offset.name().into(), f(params.offset_ns)),
            (ch.calib_error.name().into(), f(0.0)),
            (ch.bucket_error.name().into(), Value::Int(0)),
            (ch.unfixed_error.name().into(), f(0.0)),
            (ch.bucket_counter.name().into(), Value::Int(0)),
            (ch.bucket_correction_delay.name().into(), f(0.0)),
            (ch.move_time_delay.name().into(), f(0.0)),
            (ch.counter.name().into(), f(0.0)),
            (ch.counter_low.name().into(), f(-1e-6)),
            (ch.counter_high.name().into(), f(1e-6)),
            (ch.counter_jitter.name().into(), f(1e-12)),
            (ch.counter_jitter_high.name().into(), f(1e-10)),
            (ch.phase_motor.name().into(), f(0.0)),
            (ch.laser_trigger.name().into(), f(params.trigger_ns)),
            (ch.oscillator_f.name().into(), f(68e6)),
            (ch.freq_sp.name().into(), f(68e6)),
            (ch.rf_pwr.name().into(), f(0.0)),
            (ch.rf_pwr_lolo.name().into(), f(-10.0)),
            (ch.rf_pwr_hihi.name().into(), f(10.0)),
            (ch.diode_pwr.name().into(), f(0.0)),
            (ch.diode_pwr_lolo.name().into(), f(-10.0)),
            (ch.diode_pwr_hihi.name().into(), f(10.0)),
            (ch.laser_locked.name().into(), b(true)),
            (ch.deg_sband.name().into(), f(0.0)),
            (ch.deg_offset.name().into(), f(0.0)),
            (ch.ns_offset.name().into(), f(0.0)),
            (ch.drift_signal.name().into(), f(0.0)),
            (ch.drift_value.name().into(), f(0.0)),
            (ch.drift_offset.name().into(), f(0.0)),
            (ch.drift_gain.name().into(), f(1.0)),
            (ch.drift_smoothing.name().into(), f(10.0)),
            (ch.drift_accum.name().into(), b(true)),
        ];
        for (name, value) in initial {
            store.write(&name, value);
        }
        let rng = StdRng::seed_from_u64(params.seed);
        Self {
            world: Arc::new(Mutex::new(World {
                store,
                ch,
                params,
                slip_buckets: 0,
                target_units: 0.0,
                rbv_units: 0.0,
                polls_left: 0,
                rng,
                frozen: false,
                fail_reads: HashMap::new(),
                refuse_connects: 0,
                motor_commands: Vec::new(),
                reads: 0,
            })),
        }
    }

    fn world(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn factory(&self) -> SimFactory {
        SimFactory { sim: self.clone() }
    }

    pub fn connect(&self) -> SimConnection {
        SimConnection { sim: self.clone() }
    }

    /// Overwrite a stored channel value (operator action or readback change).
    pub fn set(&self, name: &str, value: Value) {
        self.world().store.write(name, value);
    }

    pub fn value(&self, name: &str) -> Option<Value> {
        self.world().store.read(name).ok()
    }

    /// Make the laser slip by `k` RF buckets relative to the reference.
    pub fn slip_buckets(&self, k: i64) {
        self.world().slip_buckets += k;
    }

    /// Fail the next `n` reads of `name` with a timeout.
    pub fn fail_reads(&self, name: &str, n: u32) {
        self.world().fail_reads.insert(name.to_string(), n);
    }

    /// Refuse the next `n` connection attempts.
    pub fn refuse_connections(&self, n: u32) {
        self.world().refuse_connects = n;
    }

    /// Stop the counter from producing new readings.
    pub fn freeze_counter(&self, frozen: bool) {
        self.world().frozen = frozen;
    }

    pub fn set_noise_ns(&self, noise_ns: f64) {
        self.world().params.noise_ns = noise_ns;
    }

    /// Every phase shifter command so far, in ns.
    pub fn motor_commands(&self) -> Vec<f64> {
        self.world().motor_commands.clone()
    }

    pub fn position_ns(&self) -> f64 {
        self.world().position_ns()
    }

    /// Noise-free counter time for the current state (ns).
    pub fn true_time_ns(&self) -> f64 {
        self.world().true_time_ns()
    }

    pub fn params(&self) -> SimParams {
        self.world().params.clone()
    }

    pub fn reads(&self) -> u64 {
        self.world().reads
    }
}

/// One connection to the simulator; cheap to drop and recreate.
#[derive(Debug, Clone)]
pub struct SimConnection {
    sim: SimulatedLocker,
}

impl ChannelService for SimConnection {
    fn get(&mut self, name: &str, _timeout: Duration) -> Result<Value, BoxError> {
        Ok(self.sim.world().read(name)?)
    }

    fn put(&mut self, name: &str, value: Value, _timeout: Duration) -> Result<(), BoxError> {
        Ok(self.sim.world().write(name, value)?)
    }
}

#[derive(Debug, Clone)]
pub struct SimFactory {
    sim: SimulatedLocker,
}

impl ServiceFactory for SimFactory {
    type Service = SimConnection;

    fn connect(&mut self) -> Result<SimConnection, BoxError> {
        {
            let mut w = self.sim.world();
            if w.refuse_connects > 0 {
                w.refuse_connects -= 1;
                return Err(Box::new(HwError::Refused("simulated outage".into())));
            }
        }
        Ok(self.sim.connect())
    }
}
