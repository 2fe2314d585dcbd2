//! Laser health: RF and diode power bands, oscillator frequency, lock flag.
use femto_traits::ChannelService;

use crate::error::LockError;
use crate::link::Link;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthReadings {
    pub rf_pwr: f64,
    pub rf_pwr_lolo: f64,
    pub rf_pwr_hihi: f64,
    pub diode_pwr: f64,
    pub diode_pwr_lolo: f64,
    pub diode_pwr_hihi: f64,
    pub freq_sp: f64,
    pub oscillator_f: f64,
    pub locked: bool,
}

impl HealthReadings {
    pub fn read<S: ChannelService>(link: &mut Link<S>) -> Result<Self, LockError> {
        let ch = link.ch();
        Ok(Self {
            rf_pwr: link.get(&ch.rf_pwr)?,
            rf_pwr_lolo: link.get(&ch.rf_pwr_lolo)?,
            rf_pwr_hihi: link.get(&ch.rf_pwr_hihi)?,
            diode_pwr: link.get(&ch.diode_pwr)?,
            diode_pwr_lolo: link.get(&ch.diode_pwr_lolo)?,
            diode_pwr_hihi: link.get(&ch.diode_pwr_hihi)?,
            freq_sp: link.get(&ch.freq_sp)?,
            oscillator_f: link.get(&ch.oscillator_f)?,
            locked: link.get(&ch.laser_locked)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LockHealth {
    pub laser_ok: bool,
    pub rf_ok: bool,
    pub diode_ok: bool,
    pub frequency_ok: bool,
    pub lock_ok: bool,
    /// "OK", or the last failing check.
    pub message: String,
}

fn outside(v: f64, lo: f64, hi: f64) -> bool {
    v > hi || v < lo
}

/// Later checks overwrite the message of earlier ones; the lock flag wins.
pub fn evaluate(r: &HealthReadings, max_frequency_error: f64) -> LockHealth {
    let rf_ok = !outside(r.rf_pwr, r.rf_pwr_lolo, r.rf_pwr_hihi);
    let diode_ok = !outside(r.diode_pwr, r.diode_pwr_lolo, r.diode_pwr_hihi);
    let frequency_ok = (r.freq_sp - r.oscillator_f).abs() <= max_frequency_error;
    let lock_ok = r.locked;

    let mut message = "OK";
    if !rf_ok {
        message = "RF power out of range";
    }
    if !diode_ok {
        message = "Diode power out of range";
    }
    if !frequency_ok {
        message = "Frequency set point out of range";
    }
    if !lock_ok {
        message = "Laser not indicating lock";
    }
    LockHealth {
        laser_ok: rf_ok && diode_ok && frequency_ok && lock_ok,
        rf_ok,
        diode_ok,
        frequency_ok,
        lock_ok,
        message: message.to_string(),
    }
}
