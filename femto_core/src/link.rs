//! One live connection to the locker's channels.
//!
//! `Link` bundles the channel service with the typed channel map, per-call
//! timeouts, the clock and the channel error tally. Components borrow it for
//! the duration of a call and never keep it; on reinit the supervisor drops the
//! link and builds a new one from the factory.
use std::sync::Arc;
use std::time::{Duration, Instant};

use femto_traits::{Channel, ChannelService, ChannelValue, Clock, LockerChannels};

use crate::config::Timeouts;
use crate::error::LockError;
use crate::hw_error::map_channel_error;
use crate::report::{Direction, ErrorTally};

pub type SharedClock = Arc<dyn Clock + Send + Sync>;

pub struct Link<S> {
    svc: S,
    ch: Arc<LockerChannels>,
    timeouts: Timeouts,
    clock: SharedClock,
    errors: ErrorTally,
}

impl<S: ChannelService> Link<S> {
    pub fn new(svc: S, ch: Arc<LockerChannels>, timeouts: Timeouts, clock: SharedClock) -> Self {
        Self {
            svc,
            ch,
            timeouts,
            clock,
            errors: ErrorTally::new(),
        }
    }

    /// Carry an existing error tally over from a previous link.
    #[must_use]
    pub fn with_errors(mut self, errors: ErrorTally) -> Self {
        self.errors = errors;
        self
    }

    /// Shared handle to the channel map, so callers can name a channel while
    /// holding `&mut self`.
    pub fn ch(&self) -> Arc<LockerChannels> {
        Arc::clone(&self.ch)
    }

    pub fn get<T: ChannelValue>(&mut self, c: &Channel<T>) -> Result<T, LockError> {
        let timeout = self.timeouts.read;
        c.get(&mut self.svc, timeout).map_err(|e| {
            self.errors.record(c.name(), Direction::Read);
            map_channel_error(c.name(), e.as_ref())
        })
    }

    pub fn put<T: ChannelValue>(&mut self, c: &Channel<T>, value: T) -> Result<(), LockError> {
        let timeout = self.timeouts.write;
        self.put_with(c, value, timeout)
    }

    /// Write with the shorter status timeout.
    pub fn put_status(&mut self, msg: &str) -> Result<(), LockError> {
        let ch = self.ch();
        let timeout = self.timeouts.status;
        self.put_with(&ch.status, msg.to_string(), timeout)
    }

    fn put_with<T: ChannelValue>(
        &mut self,
        c: &Channel<T>,
        value: T,
        timeout: Duration,
    ) -> Result<(), LockError> {
        c.put(&mut self.svc, value, timeout).map_err(|e| {
            self.errors.record(c.name(), Direction::Write);
            map_channel_error(c.name(), e.as_ref())
        })
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    pub fn sleep(&self, d: Duration) {
        self.clock.sleep(d);
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub fn errors(&mut self) -> &mut ErrorTally {
        &mut self.errors
    }

    /// Tear down the connection, keeping the error tally.
    pub fn into_errors(self) -> ErrorTally {
        self.errors
    }

    pub fn service_mut(&mut self) -> &mut S {
        &mut self.svc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use femto_hardware::MemoryService;
    use femto_traits::{ManualClock, Value};

    #[test]
    fn failures_are_typed_and_counted() {
        let ch = Arc::new(LockerChannels::new("T:", "T:TRIG", "T:BKT"));
        let svc = MemoryService::new().with(ch.delay.name(), Value::Float(3.0));
        let mut link = Link::new(svc, ch.clone(), Timeouts::default(), Arc::new(ManualClock::new()));

        assert_eq!(link.get(&ch.delay).unwrap(), 3.0);
        let err = link.get(&ch.offset).unwrap_err();
        assert!(matches!(err, LockError::Channel { ref channel, .. } if channel == ch.offset.name()));
        assert_eq!(link.errors().count(ch.offset.name(), Direction::Read), 1);

        link.put_status("hello").unwrap();
        assert_eq!(link.get(&ch.status).unwrap(), "hello");
    }
}
