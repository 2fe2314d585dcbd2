//! Liveness heartbeat for external monitors.
use femto_traits::ChannelService;

use crate::error::LockError;
use crate::link::Link;

/// Increments the watchdog counter once per cycle.
#[derive(Debug)]
pub struct Watchdog {
    count: i64,
}

impl Watchdog {
    /// Claim the watchdog record: publish the version string and the first beat.
    pub fn init<S: ChannelService>(link: &mut Link<S>, version: &str) -> Result<Self, LockError> {
        let ch = link.ch();
        let start = link
            .get(&ch.watchdog)
            .map_err(|e| LockError::WatchdogInit(e.to_string()))?;
        link.put(&ch.version, version.to_string())
            .map_err(|e| LockError::WatchdogInit(e.to_string()))?;
        let mut this = Self { count: start };
        this.beat(link)
            .map_err(|e| LockError::WatchdogInit(e.to_string()))?;
        Ok(this)
    }

    pub fn beat<S: ChannelService>(&mut self, link: &mut Link<S>) -> Result<(), LockError> {
        let ch = link.ch();
        let next = self.count.wrapping_add(1);
        link.put(&ch.watchdog, next)?;
        self.count = next;
        Ok(())
    }

    pub fn count(&self) -> i64 {
        self.count
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
    fn beats_continue_from_the_stored_count() {
        let ch = Arc::new(LockerChannels::new("T:", "T:TRIG", "T:BKT"));
        let svc = MemoryService::new().with(ch.watchdog.name(), Value::Int(41));
        let mut link = Link::new(svc, ch.clone(), Timeouts::default(), Arc::new(ManualClock::new()));
        let mut w = Watchdog::init(&mut link, "femto 0.1.0").unwrap();
        assert_eq!(w.count(), 42);
        w.beat(&mut link).unwrap();
        assert_eq!(link.get(&ch.watchdog).unwrap(), 43);
        assert_eq!(link.get(&ch.version).unwrap(), "femto 0.1.0");
    }

    #[test]
    fn unreadable_watchdog_fails_init() {
        let ch = Arc::new(LockerChannels::new("T:", "T:TRIG", "T:BKT"));
        let mut link = Link::new(
            MemoryService::new(),
            ch,
            Timeouts::default(),
            Arc::new(ManualClock::new()),
        );
        assert!(matches!(
            Watchdog::init(&mut link, "v"),
            Err(LockError::WatchdogInit(_))
        ));
    }
}
