//! The lock supervisor: one control cycle at a time, rebuilt from scratch on failure.
//!
//! Each cycle runs heartbeat → health → (calibration, exclusive) → bucket
//! detection and correction → drift → setpoint → telemetry. Any error inside a
//! cycle drops every hardware handle; the next step reconnects through the
//! factory. The fitted model lives here and survives reconnects.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use femto_traits::{Clock, LockerChannels, MonotonicClock, ServiceFactory};

use crate::actuator::{PhaseActuator, TriggerChannel};
use crate::bucket::{BucketDecision, BucketJumpCorrector, Gate};
use crate::calibration::{CalibrationOutcome, Calibrator};
use crate::config::LockerCfg;
use crate::counter::{TimeIntervalReader, ValidatedSample};
use crate::degrees::DegreesSync;
use crate::drift::DriftIntegrator;
use crate::error::{BuildError, LockError, Result};
use crate::health::{self, HealthReadings};
use crate::latency::LatencyTracker;
use crate::link::{Link, SharedClock};
use crate::report::ErrorTally;
use crate::sawtooth::ModelParameters;
use crate::setpoint::{self, AlarmBand};
use crate::status::StatusWriter;
use crate::watchdog::Watchdog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Idle,
    HealthCheck,
    Calibrating,
    Tracking,
    Fault,
    Reinit,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupervisorStats {
    pub cycles: u64,
    pub jumps_corrected: u64,
    pub calibrations: u64,
    pub faults: u64,
    pub reinits: u64,
}

/// What one `step` did.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub state: LockState,
    pub sample: Option<ValidatedSample>,
    pub decision: BucketDecision,
    pub corrected: bool,
    /// The error that sent the supervisor to `Reinit`, if any.
    pub error: Option<LockError>,
}

impl CycleReport {
    fn bare(state: LockState, error: Option<LockError>) -> Self {
        Self {
            state,
            sample: None,
            decision: BucketDecision::NONE,
            corrected: false,
            error,
        }
    }
}

/// Everything bound to one connection.
struct Hardware<S> {
    link: Link<S>,
    actuator: PhaseActuator,
    reader: TimeIntervalReader,
    watchdog: Watchdog,
    status: StatusWriter,
    degrees: DegreesSync,
}

pub struct LockSupervisor<F: ServiceFactory> {
    factory: F,
    cfg: LockerCfg,
    ch: Arc<LockerChannels>,
    clock: SharedClock,
    version: String,
    params: Option<ModelParameters>,
    fallback: Option<ModelParameters>,
    hw: Option<Hardware<F::Service>>,
    errors: ErrorTally,
    trigger: TriggerChannel,
    calibrator: Calibrator,
    corrector: BucketJumpCorrector,
    drift: DriftIntegrator,
    latency: LatencyTracker,
    state: LockState,
    init_failures: u32,
    stats: SupervisorStats,
}

impl<F: ServiceFactory> std::fmt::Debug for LockSupervisor<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockSupervisor")
            .field("locker", &self.cfg.name)
            .field("state", &self.state)
            .field("params", &self.params)
            .field("connected", &self.hw.is_some())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

pub struct LockSupervisorBuilder<F> {
    factory: Option<F>,
    cfg: Option<LockerCfg>,
    channels: Option<LockerChannels>,
    clock: Option<SharedClock>,
    fallback: Option<(f64, f64)>,
    version: Option<String>,
}

impl<F> Default for LockSupervisorBuilder<F> {
    fn default() -> Self {
        Self {
            factory: None,
            cfg: None,
            channels: None,
            clock: None,
            fallback: None,
            version: None,
        }
    }
}

impl<F: ServiceFactory> LockSupervisorBuilder<F> {
    pub fn factory(mut self, factory: F) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn config(mut self, cfg: LockerCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }

    pub fn channels(mut self, ch: LockerChannels) -> Self {
        self.channels = Some(ch);
        self
    }

    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Model used when the delay/offset channels cannot be read at first connect.
    pub fn fallback_model(mut self, delay_ns: f64, offset_ns: f64) -> Self {
        self.fallback = Some((delay_ns, offset_ns));
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn try_build(self) -> std::result::Result<LockSupervisor<F>, BuildError> {
        let factory = self.factory.ok_or(BuildError::MissingFactory)?;
        let cfg = self.cfg.ok_or(BuildError::MissingConfig)?;
        let ch = self.channels.ok_or(BuildError::MissingChannels)?;
        if !(cfg.rf.laser_ghz > 0.0 && cfg.rf.locking_ghz > 0.0 && cfg.rf.trigger_ghz > 0.0) {
            return Err(BuildError::InvalidConfig("rf frequencies must be > 0"));
        }
        if cfg.supervisor.max_watchdog_failures == 0 {
            return Err(BuildError::InvalidConfig("max_watchdog_failures must be >= 1"));
        }
        let period_ns = cfg.rf.period_ns();
        let version = self.version.unwrap_or_else(|| {
            format!("femto {} ({})", env!("CARGO_PKG_VERSION"), cfg.name)
        });
        Ok(LockSupervisor {
            factory,
            ch: Arc::new(ch),
            clock: self.clock.unwrap_or_else(|| Arc::new(MonotonicClock::new())),
            version,
            params: None,
            fallback: self
                .fallback
                .map(|(d, o)| ModelParameters::new(d, o, period_ns)),
            hw: None,
            errors: ErrorTally::new(),
            trigger: TriggerChannel::new(&cfg.rf),
            calibrator: Calibrator::new(cfg.calibration.clone(), period_ns),
            corrector: BucketJumpCorrector::new(cfg.jump.clone(), cfg.rf.locking_ghz),
            drift: DriftIntegrator::new(cfg.drift.clone()),
            latency: LatencyTracker::new(),
            state: LockState::Idle,
            init_failures: 0,
            stats: SupervisorStats::default(),
            cfg,
        })
    }
}

impl<F: ServiceFactory> LockSupervisor<F> {
    pub fn builder() -> LockSupervisorBuilder<F> {
        LockSupervisorBuilder::default()
    }

    /// Build from a validated config file.
    pub fn from_config(factory: F, cfg: &femto_config::Config, clock: SharedClock) -> Result<Self> {
        let mut b = Self::builder()
            .factory(factory)
            .config(LockerCfg::from(cfg))
            .channels(crate::conversions::channels_for(cfg))
            .clock(clock);
        if let Some(m) = cfg.model {
            b = b.fallback_model(m.delay_ns, m.offset_ns);
        }
        Ok(b.try_build()?)
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    /// Current model; `None` until the first successful connect.
    pub fn params(&self) -> Option<ModelParameters> {
        self.params
    }

    pub fn stats(&self) -> &SupervisorStats {
        &self.stats
    }

    pub fn is_connected(&self) -> bool {
        self.hw.is_some()
    }

    pub fn channels(&self) -> &LockerChannels {
        &self.ch
    }

    /// Run one step: connect if needed, then one control cycle.
    ///
    /// Recoverable failures come back as `Ok` with `error` set and the
    /// supervisor in `Reinit`. `Err` means the supervisor cannot continue.
    pub fn step(&mut self) -> Result<CycleReport> {
        if self.hw.is_none() {
            match self.connect() {
                Ok(()) => {
                    self.state = LockState::HealthCheck;
                    tracing::info!(locker = %self.cfg.name, "locker connected");
                }
                Err(e @ LockError::Config(_)) => return Err(eyre::Report::new(e)),
                Err(e) => {
                    if matches!(e, LockError::WatchdogInit(_)) {
                        self.init_failures += 1;
                        if self.init_failures >= self.cfg.supervisor.max_watchdog_failures {
                            tracing::error!(error = %e, failures = self.init_failures, "giving up");
                            return Err(eyre::Report::new(e));
                        }
                    }
                    tracing::warn!(error = %e, failures = self.init_failures, "locker initialization failed");
                    self.state = LockState::Reinit;
                    return Ok(CycleReport::bare(LockState::Reinit, Some(e)));
                }
            }
        }

        self.stats.cycles += 1;
        match self.cycle() {
            Ok(report) => Ok(report),
            Err(e) => {
                tracing::warn!(error = %e, "cycle failed; reinitializing");
                self.teardown();
                self.stats.reinits += 1;
                self.state = LockState::Reinit;
                Ok(CycleReport::bare(LockState::Reinit, Some(e)))
            }
        }
    }

    /// Cycle until `shutdown` is set or `max_cycles` steps have run.
    pub fn run(&mut self, shutdown: &AtomicBool, max_cycles: Option<u64>) -> Result<SupervisorStats> {
        let mut n = 0u64;
        while !shutdown.load(Ordering::Relaxed) && max_cycles.is_none_or(|m| n < m) {
            self.clock.sleep(self.cfg.supervisor.cycle);
            self.step()?;
            n += 1;
        }
        self.shutdown();
        Ok(self.stats.clone())
    }

    /// Leave a final status message and drop the connection.
    pub fn shutdown(&mut self) {
        if let Some(hw) = self.hw.as_mut() {
            if let Err(e) = hw.status.write(&mut hw.link, "done, exiting") {
                tracing::warn!(error = %e, "could not write final status");
            }
        }
        self.teardown();
        self.state = LockState::Idle;
    }

    fn teardown(&mut self) {
        if let Some(hw) = self.hw.take() {
            self.errors = hw.link.into_errors();
        }
    }

    fn connect(&mut self) -> std::result::Result<(), LockError> {
        let svc = self
            .factory
            .connect()
            .map_err(|e| LockError::WatchdogInit(format!("connect: {e}")))?;
        let errors = std::mem::take(&mut self.errors);
        let mut link = Link::new(
            svc,
            Arc::clone(&self.ch),
            self.cfg.timeouts,
            Arc::clone(&self.clock),
        )
        .with_errors(errors);

        match self.bring_up(&mut link) {
            Ok((watchdog, actuator, degrees, status)) => {
                self.hw = Some(Hardware {
                    link,
                    actuator,
                    reader: TimeIntervalReader::new(self.cfg.counter.clone()),
                    watchdog,
                    status,
                    degrees,
                });
                Ok(())
            }
            Err(e) => {
                self.errors = link.into_errors();
                Err(e)
            }
        }
    }

    fn bring_up(
        &mut self,
        link: &mut Link<F::Service>,
    ) -> std::result::Result<(Watchdog, PhaseActuator, DegreesSync, StatusWriter), LockError> {
        let watchdog = Watchdog::init(link, &self.version)?;
        // Only back-to-back watchdog failures count toward the limit.
        self.init_failures = 0;
        if self.params.is_none() {
            self.params = Some(self.load_params(link)?);
        }
        let actuator = PhaseActuator::connect(link, self.cfg.actuator.clone())?;
        let degrees = DegreesSync::new(link)?;
        let mut status = StatusWriter::new();
        let h = health::evaluate(
            &HealthReadings::read(link)?,
            self.cfg.limits.max_frequency_error,
        );
        status.write(link, &h.message)?;
        Ok((watchdog, actuator, degrees, status))
    }

    fn load_params(&self, link: &mut Link<F::Service>) -> std::result::Result<ModelParameters, LockError> {
        let period_ns = self.cfg.rf.period_ns();
        let read = link
            .get(&self.ch.delay)
            .and_then(|d| link.get(&self.ch.offset).map(|o| (d, o)));
        match read {
            Ok((d, o)) if d.is_finite() && o.is_finite() => {
                tracing::info!(delay_ns = d, offset_ns = o, "model loaded from channels");
                Ok(ModelParameters::new(d, o, period_ns))
            }
            other => {
                let why = match other {
                    Err(e) => e.to_string(),
                    Ok((d, o)) => format!("non-finite model (delay {d}, offset {o})"),
                };
                match self.fallback {
                    Some(m) => {
                        tracing::warn!(error = %why, "using model from config");
                        Ok(m)
                    }
                    None => Err(LockError::Config(format!(
                        "no usable delay/offset ({why}) and no [model] in config"
                    ))),
                }
            }
        }
    }

    fn cycle(&mut self) -> std::result::Result<CycleReport, LockError> {
        let ch = Arc::clone(&self.ch);
        let Some(hw) = self.hw.as_mut() else {
            return Err(LockError::State("not connected".into()));
        };
        let Hardware {
            link,
            actuator,
            reader,
            watchdog,
            status,
            degrees,
        } = hw;
        let started = link.now();

        watchdog.beat(link)?;
        link.put(&ch.busy, false)?;

        self.state = LockState::HealthCheck;
        let max_freq = self.cfg.limits.max_frequency_error;
        let health = health::evaluate(&HealthReadings::read(link)?, max_freq);
        if !health.laser_ok {
            status.write(link, &health.message)?;
            link.put(&ch.laser_ok, false)?;
            link.sleep(self.cfg.supervisor.fault_backoff);
            self.state = LockState::Fault;
            self.stats.faults += 1;
            return Ok(CycleReport::bare(LockState::Fault, None));
        }

        let Some(params) = self.params.as_mut() else {
            return Err(LockError::State("no model loaded".into()));
        };

        if link.get(&ch.calibrate)? {
            self.state = LockState::Calibrating;
            link.put(&ch.laser_ok, false)?;
            link.put(&ch.busy, true)?;
            status.write(link, "calibration requested - starting")?;

            let mut guard = |l: &mut Link<F::Service>| -> std::result::Result<bool, LockError> {
                watchdog.beat(l)?;
                if !l.get(&ch.calibrate)? {
                    return Ok(false);
                }
                Ok(health::evaluate(&HealthReadings::read(l)?, max_freq).laser_ok)
            };
            let outcome = self
                .calibrator
                .run(link, actuator, reader, &self.trigger, &mut guard);
            status.invalidate();
            match outcome {
                Ok(CalibrationOutcome::Fitted(fit)) => {
                    params.delay_ns = fit.delay_ns;
                    params.offset_ns = fit.offset_ns;
                    link.put(&ch.delay, fit.delay_ns)?;
                    link.put(&ch.offset, fit.offset_ns)?;
                    link.put(&ch.calib_error, fit.rms_ns)?;
                    self.stats.calibrations += 1;
                    status.write(link, "calibration done")?;
                }
                Ok(CalibrationOutcome::Cancelled) => status.write(link, "calibration cancelled")?,
                Err(LockError::InsufficientData { good }) => {
                    tracing::warn!(good, "calibration kept the previous model");
                    status.write(link, "Calib failed: no data")?;
                }
                Err(e) => return Err(e),
            }
            link.put(&ch.calibrate, false)?;
            link.put(&ch.busy, false)?;
            reader.flush();
            return Ok(CycleReport::bare(LockState::Calibrating, None));
        }

        // bucket detection
        self.state = LockState::Tracking;
        let outcome = reader.read(link)?;
        let trigger_ns = self.trigger.get_ns(link)?;
        let position_ns = actuator.get_position(link)?;
        let target_ns = link.get(&ch.target_time)?;
        let sample = outcome.sample();
        let mut decision = BucketDecision::NONE;
        match sample {
            Some(s) => {
                link.put(&ch.timing_error, s.time_ns - target_ns)?;
                let predicted = params.predict(position_ns, trigger_ns);
                let (mut d, mut gate) =
                    self.corrector
                        .assess(s.time_ns, predicted.time_ns, s.spread_ns);
                if !s.is_good {
                    d = BucketDecision {
                        buckets: 0,
                        exact_correction_ns: 0.0,
                        ..d
                    };
                    gate = Gate::Untrusted;
                }
                if s.spread_ns > self.cfg.counter.max_spread_ns {
                    status.write(link, "Counter not stable")?;
                } else {
                    match gate {
                        Gate::NonInteger => {
                            tracing::warn!(residual_ns = d.residual_ns, "non-integer bucket error");
                            status.write(link, "Not an integer number of buckets")?;
                        }
                        Gate::Trusted => status.write(link, "Laser OK")?,
                        Gate::Untrusted => {}
                    }
                }
                decision = d;
            }
            None => {
                if reader.stale_reads() >= self.cfg.jump.stale_report_cycles {
                    status.write(link, "No counter reading")?;
                }
            }
        }

        // bucket correction
        let enable = link.get(&ch.enable)?;
        let mut corrected = false;
        if decision.buckets != 0 && enable && link.get(&ch.fix_bucket)? {
            link.put(&ch.laser_ok, false)?;
            link.put(&ch.busy, true)?;
            status.invalidate();
            if let Some(c) = self.corrector.apply(link, actuator, params, &decision)? {
                let now = link.now();
                self.latency.corrected(now, c.to_ns);
                self.stats.jumps_corrected += 1;
                reader.flush();
                corrected = true;
            }
        }
        link.put(&ch.bucket_error, decision.buckets)?;
        link.put(&ch.unfixed_error, decision.residual_ns)?;
        link.put(&ch.laser_ok, true)?;

        // drift and setpoint
        if enable {
            let drift_ns = if self.drift.enabled() {
                self.drift.run(link)?
            } else {
                0.0
            };
            let band = AlarmBand {
                lolo: link.get(&ch.target_time_lolo)?,
                hihi: link.get(&ch.target_time_hihi)?,
            };
            match setpoint::plan(target_ns, band, params, &self.cfg.rf, &self.cfg.limits) {
                Ok(plan) => {
                    if let Some(notice) = plan.notice {
                        status.write(link, notice)?;
                    }
                    let enable_trigger = link.get(&ch.enable_trigger)?;
                    let applied =
                        setpoint::apply(link, actuator, &self.trigger, &plan, drift_ns, enable_trigger)?;
                    if let Some(pc) = applied.moved_to {
                        let now = link.now();
                        self.latency.moved(now, pc);
                    }
                }
                Err(LockError::TargetRejected(msg)) => {
                    tracing::warn!(target_ns, reason = %msg, "target rejected");
                    status.write(link, &msg)?;
                }
                Err(e) => return Err(e),
            }
            if let Some(s) = sample {
                let now = link.now();
                let lat = self.latency.observe(now, s.time_ns, trigger_ns, params);
                if let Some(d) = lat.move_delay_s {
                    link.put(&ch.move_time_delay, d)?;
                }
                if let Some(d) = lat.bucket_delay_s {
                    link.put(&ch.bucket_correction_delay, d)?;
                }
            }
        }

        // telemetry
        degrees.run(link)?;
        let loop_s = link.clock().secs_since(started);
        link.put(&ch.loop_time, loop_s)?;
        let now = link.now();
        link.errors().maybe_report(now, self.cfg.supervisor.error_report);

        Ok(CycleReport {
            state: LockState::Tracking,
            sample,
            decision,
            corrected,
            error: None,
        })
    }
}
