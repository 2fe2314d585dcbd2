//! Channel naming for one laser locker.
//!
//! All names derive from the locker's base prefix, e.g. `LAS:FS14:`:
//! locker records live under `<base>VIT:`, the time-interval counter under
//! `<base>CNT:TI:` and the phase shifter motor at `<base>MMS:PH`.
use crate::channel::Channel;

/// Every channel the controller touches, as typed handles.
#[derive(Debug, Clone)]
pub struct LockerChannels {
    // supervisor / operator
    pub watchdog: Channel<i64>,
    pub version: Channel<String>,
    pub status: Channel<String>,
    pub busy: Channel<bool>,
    pub laser_ok: Channel<bool>,
    pub enable: Channel<bool>,
    pub calibrate: Channel<bool>,
    pub fix_bucket: Channel<bool>,
    pub enable_trigger: Channel<bool>,
    pub loop_time: Channel<f64>,

    // target time and its alarm band
    pub target_time: Channel<f64>,
    pub target_time_hihi: Channel<f64>,
    pub target_time_lolo: Channel<f64>,
    pub timing_error: Channel<f64>,

    // fitted model
    pub delay: Channel<f64>,
    pub offset: Channel<f64>,
    pub calib_error: Channel<f64>,

    // bucket correction
    pub bucket_error: Channel<i64>,
    pub unfixed_error: Channel<f64>,
    pub bucket_counter: Channel<i64>,
    pub bucket_correction_delay: Channel<f64>,
    pub move_time_delay: Channel<f64>,

    // time-interval counter
    pub counter: Channel<f64>,
    pub counter_low: Channel<f64>,
    pub counter_high: Channel<f64>,
    pub counter_jitter: Channel<f64>,
    pub counter_jitter_high: Channel<f64>,

    // phase shifter and trigger
    pub phase_motor: Channel<f64>,
    pub phase_motor_dmov: Channel<bool>,
    pub phase_motor_rbv: Channel<f64>,
    pub laser_trigger: Channel<f64>,

    // health readbacks
    pub oscillator_f: Channel<f64>,
    pub freq_sp: Channel<f64>,
    pub rf_pwr: Channel<f64>,
    pub rf_pwr_lolo: Channel<f64>,
    pub rf_pwr_hihi: Channel<f64>,
    pub diode_pwr: Channel<f64>,
    pub diode_pwr_lolo: Channel<f64>,
    pub diode_pwr_hihi: Channel<f64>,
    pub laser_locked: Channel<bool>,

    // S-band degrees view of the target time
    pub deg_sband: Channel<f64>,
    pub deg_offset: Channel<f64>,
    pub ns_offset: Channel<f64>,

    // drift correction
    pub drift_signal: Channel<f64>,
    pub drift_value: Channel<f64>,
    pub drift_offset: Channel<f64>,
    pub drift_gain: Channel<f64>,
    pub drift_smoothing: Channel<f64>,
    pub drift_accum: Channel<bool>,
}

impl LockerChannels {
    /// Build the channel map from the base prefix and the two names that are
    /// wired per installation (the EVR trigger record and the correction-delay record).
    pub fn new(base: &str, laser_trigger: &str, bucket_correction_delay: &str) -> Self {
        let dev = format!("{base}VIT:");
        let cnt = format!("{base}CNT:TI:");
        let motor = format!("{base}MMS:PH");
        let d = |s: &str| format!("{dev}{s}");
        Self {
            watchdog: Channel::new(d("FS_WATCHDOG")),
            version: Channel::new(d("FS_WATCHDOG.DESC")),
            status: Channel::new(d("FS_STATUS")),
            busy: Channel::new(d("FS_CTRL_BUSY")),
            laser_ok: Channel::new(d("FS_LASER_OK")),
            enable: Channel::new(d("FS_ENABLE_TIME_CTRL")),
            calibrate: Channel::new(d("FS_START_CALIB")),
            fix_bucket: Channel::new(d("FS_ENABLE_BUCKET_FIX")),
            enable_trigger: Channel::new(d("FS_ENABLE_TRIGGER")),
            loop_time: Channel::new(d("LOOP_TIME")),

            target_time: Channel::new(d("FS_TGT_TIME")),
            target_time_hihi: Channel::new(d("FS_TGT_TIME.HIHI")),
            target_time_lolo: Channel::new(d("FS_TGT_TIME.LOLO")),
            timing_error: Channel::new(d("FS_TIMING_ERROR")),

            delay: Channel::new(d("FS_TRIGGER_DELAY")),
            offset: Channel::new(d("FS_TIMING_OFFSET")),
            calib_error: Channel::new(d("FS_CALIB_ERROR")),

            bucket_error: Channel::new(d("FS_BUCKET_ERROR")),
            unfixed_error: Channel::new(d("FS_UNFIXED_ERROR")),
            bucket_counter: Channel::new(d("FS_CORRECTION_CNT")),
            bucket_correction_delay: Channel::new(bucket_correction_delay),
            move_time_delay: Channel::new(d("MOV_TIME_DLY")),

            counter: Channel::new(format!("{cnt}GetOffsetInvMeasMean")),
            counter_low: Channel::new(format!("{cnt}GetOffsetInvMeasMean.LOW")),
            counter_high: Channel::new(format!("{cnt}GetOffsetInvMeasMean.HIGH")),
            counter_jitter: Channel::new(format!("{cnt}GetMeasJitter")),
            counter_jitter_high: Channel::new(format!("{cnt}GetMeasJitter.HIGH")),

            phase_motor: Channel::new(motor.clone()),
            phase_motor_dmov: Channel::new(format!("{motor}.DMOV")),
            phase_motor_rbv: Channel::new(format!("{motor}.RBV")),
            laser_trigger: Channel::new(laser_trigger),

            oscillator_f: Channel::new(d("FS_OSC_TGT_FREQ")),
            freq_sp: Channel::new(d("FREQ_SP")),
            rf_pwr: Channel::new(d("CH1_RF_PWR")),
            rf_pwr_lolo: Channel::new(d("CH1_RF_PWR.LOLO")),
            rf_pwr_hihi: Channel::new(d("CH1_RF_PWR.HIHI")),
            diode_pwr: Channel::new(d("CH1_DIODE_PWR")),
            diode_pwr_lolo: Channel::new(d("CH1_DIODE_PWR.LOLO")),
            diode_pwr_hihi: Channel::new(d("CH1_DIODE_PWR.HIHI")),
            laser_locked: Channel::new(d("PHASE_LOCKED")),

            deg_sband: Channel::new(d("PDES")),
            deg_offset: Channel::new(d("POC")),
            ns_offset: Channel::new(d("FS_NS_OFFSET")),

            drift_signal: Channel::new(d("DRIFT_CORRECT_SIG")),
            drift_value: Channel::new(d("DRIFT_CORRECT_VAL")),
            drift_offset: Channel::new(d("DRIFT_CORRECT_OFF")),
            drift_gain: Channel::new(d("DRIFT_CORRECT_GAIN")),
            drift_smoothing: Channel::new(d("DRIFT_CORRECT_SMOOTH")),
            drift_accum: Channel::new(d("DRIFT_CORRECT_ACCUM")),
        }
    }

    /// `(role, channel name)` for every handle, in declaration order.
    pub fn listing(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("watchdog", self.watchdog.name()),
            ("version", self.version.name()),
            ("status", self.status.name()),
            ("busy", self.busy.name()),
            ("laser_ok", self.laser_ok.name()),
            ("enable", self.enable.name()),
            ("calibrate", self.calibrate.name()),
            ("fix_bucket", self.fix_bucket.name()),
            ("enable_trigger", self.enable_trigger.name()),
            ("loop_time", self.loop_time.name()),
            ("target_time", self.target_time.name()),
            ("target_time_hihi", self.target_time_hihi.name()),
            ("target_time_lolo", self.target_time_lolo.name()),
            ("timing_error", self.timing_error.name()),
            ("delay", self.delay.name()),
            ("offset", self.offset.name()),
            ("calib_error", self.calib_error.name()),
            ("bucket_error", self.bucket_error.name()),
            ("unfixed_error", self.unfixed_error.name()),
            ("bucket_counter", self.bucket_counter.name()),
            ("bucket_correction_delay", self.bucket_correction_delay.name()),
            ("move_time_delay", self.move_time_delay.name()),
            ("counter", self.counter.name()),
            ("counter_low", self.counter_low.name()),
            ("counter_high", self.counter_high.name()),
            ("counter_jitter", self.counter_jitter.name()),
            ("counter_jitter_high", self.counter_jitter_high.name()),
            ("phase_motor", self.phase_motor.name()),
            ("phase_motor_dmov", self.phase_motor_dmov.name()),
            ("phase_motor_rbv", self.phase_motor_rbv.name()),
            ("laser_trigger", self.laser_trigger.name()),
            ("oscillator_f", self.oscillator_f.name()),
            ("freq_sp", self.freq_sp.name()),
            ("rf_pwr", self.rf_pwr.name()),
            ("rf_pwr_lolo", self.rf_pwr_lolo.name()),
            ("rf_pwr_hihi", self.rf_pwr_hihi.name()),
            ("diode_pwr", self.diode_pwr.name()),
            ("diode_pwr_lolo", self.diode_pwr_lolo.name()),
            ("diode_pwr_hihi", self.diode_pwr_hihi.name()),
            ("laser_locked", self.laser_locked.name()),
            ("deg_sband", self.deg_sband.name()),
            ("deg_offset", self.deg_offset.name()),
            ("ns_offset", self.ns_offset.name()),
            ("drift_signal", self.drift_signal.name()),
            ("drift_value", self.drift_value.name()),
            ("drift_offset", self.drift_offset.name()),
            ("drift_gain", self.drift_gain.name()),
            ("drift_smoothing", self.drift_smoothing.name()),
            ("drift_accum", self.drift_accum.name()),
        ]
    }
}
