//! Keeps the S-band phase (degrees) and the target time (ns) consistent.
//!
//! Operators may edit either record. Whichever changed since the last cycle
//! is converted into the other; if both changed, the time wins.
use femto_traits::ChannelService;

use crate::error::LockError;
use crate::link::Link;

/// S-band RF frequency (GHz).
pub const SBAND_GHZ: f64 = 2.856;

pub fn ns_to_deg(ns: f64, ns_offset: f64, deg_offset: f64) -> f64 {
    -(ns - ns_offset) * SBAND_GHZ * 360.0 - deg_offset
}

pub fn deg_to_ns(deg: f64, ns_offset: f64, deg_offset: f64) -> f64 {
    -(deg + deg_offset) / (SBAND_GHZ * 360.0) + ns_offset
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DegreesUpdate {
    Unchanged,
    WroteDegrees(f64),
    WroteTime(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Snapshot {
    time: f64,
    deg: f64,
    ns_offset: f64,
    deg_offset: f64,
}

#[derive(Debug, Clone)]
pub struct DegreesSync {
    last: Snapshot,
}

fn snapshot<S: ChannelService>(link: &mut Link<S>) -> Result<Snapshot, LockError> {
    let ch = link.ch();
    Ok(Snapshot {
        time: link.get(&ch.target_time)?,
        deg: link.get(&ch.deg_sband)?,
        ns_offset: link.get(&ch.ns_offset)?,
        deg_offset: link.get(&ch.deg_offset)?,
    })
}

impl DegreesSync {
    pub fn new<S: ChannelService>(link: &mut Link<S>) -> Result<Self, LockError> {
        Ok(Self {
            last: snapshot(link)?,
        })
    }

    pub fn run<S: ChannelService>(&mut self, link: &mut Link<S>) -> Result<DegreesUpdate, LockError> {
        let now = snapshot(link)?;
        // A rejected (non-finite) target is left for the setpoint to report.
        if ![now.time, now.deg, now.ns_offset, now.deg_offset]
            .iter()
            .all(|v| v.is_finite())
        {
            return Ok(DegreesUpdate::Unchanged);
        }
        let ch = link.ch();
        if now.time != self.last.time || now.ns_offset != self.last.ns_offset {
            let deg = ns_to_deg(now.time, now.ns_offset, now.deg_offset);
            link.put(&ch.deg_sband, deg)?;
            self.last = Snapshot { deg, ..now };
            return Ok(DegreesUpdate::WroteDegrees(deg));
        }
        if now.deg != self.last.deg || now.deg_offset != self.last.deg_offset {
            let time = deg_to_ns(now.deg, now.ns_offset, now.deg_offset);
            link.put(&ch.target_time, time)?;
            self.last = Snapshot { time, ..now };
            return Ok(DegreesUpdate::WroteTime(time));
        }
        Ok(DegreesUpdate::Unchanged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timeouts;
    use femto_hardware::MemoryService;
    use femto_traits::{LockerChannels, ManualClock, Value};
    use std::sync::Arc;

    #[test]
    fn conversions_invert() {
        let deg = ns_to_deg(1.25, 0.5, 10.0);
        assert!((deg_to_ns(deg, 0.5, 10.0) - 1.25).abs() < 1e-12);
    }

    #[test]
    fn time_edits_win_over_degree_edits() {
        let ch = Arc::new(LockerChannels::new("T:", "T:TRIG", "T:BKT"));
        let svc = MemoryService::new()
            .with(ch.target_time.name(), Value::Float(1.0))
            .with(ch.deg_sband.name(), Value::Float(0.0))
            .with(ch.ns_offset.name(), Value::Float(0.0))
            .with(ch.deg_offset.name(), Value::Float(0.0));
        let mut link = Link::new(svc, ch.clone(), Timeouts::default(), Arc::new(ManualClock::new()));
        let mut sync = DegreesSync::new(&mut link).unwrap();
        assert_eq!(sync.run(&mut link).unwrap(), DegreesUpdate::Unchanged);

        link.service_mut().write(ch.target_time.name(), Value::Float(2.0));
        link.service_mut().write(ch.deg_sband.name(), Value::Float(45.0));
        let DegreesUpdate::WroteDegrees(deg) = sync.run(&mut link).unwrap() else {
            panic!("time edit should be converted to degrees");
        };
        assert!((deg - ns_to_deg(2.0, 0.0, 0.0)).abs() < 1e-9);
        assert_eq!(sync.run(&mut link).unwrap(), DegreesUpdate::Unchanged);

        link.service_mut().write(ch.deg_sband.name(), Value::Float(-360.0));
        let DegreesUpdate::WroteTime(t) = sync.run(&mut link).unwrap() else {
            panic!("degree edit should be converted to time");
        };
        assert!((t - deg_to_ns(-360.0, 0.0, 0.0)).abs() < 1e-12);
        assert_eq!(sync.run(&mut link).unwrap(), DegreesUpdate::Unchanged);
    }

    #[test]
    fn non_finite_target_is_not_converted() {
        let ch = Arc::new(LockerChannels::new("T:", "T:TRIG", "T:BKT"));
        let svc = MemoryService::new()
            .with(ch.target_time.name(), Value::Float(1.0))
            .with(ch.deg_sband.name(), Value::Float(0.0))
            .with(ch.ns_offset.name(), Value::Float(0.0))
            .with(ch.deg_offset.name(), Value::Float(0.0));
        let mut link = Link::new(svc, ch.clone(), Timeouts::default(), Arc::new(ManualClock::new()));
        let mut sync = DegreesSync::new(&mut link).unwrap();

        link.service_mut().write(ch.target_time.name(), Value::Float(f64::NAN));
        for _ in 0..3 {
            assert_eq!(sync.run(&mut link).unwrap(), DegreesUpdate::Unchanged);
        }
        assert_eq!(link.get(&ch.deg_sband).unwrap(), 0.0);

        link.service_mut().write(ch.target_time.name(), Value::Float(3.0));
        assert!(matches!(sync.run(&mut link).unwrap(), DegreesUpdate::WroteDegrees(_)));
    }
}
