//! Shared abstractions for the femto locker stack.
//!
//! - `Clock`: monotonic time and sleeping, replaceable by a manual clock in tests.
//! - `ChannelService`: the control-system key/value service every piece of
//!   hardware is reached through, with a timeout on each call.
//! - `Channel<T>` / `LockerChannels`: statically typed handles onto that service,
//!   named once at startup from the locker's base prefix.
pub mod channel;
pub mod clock;
pub mod names;

pub use channel::{BoxError, Channel, ChannelService, ChannelValue, Value, ValueKindError};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use names::LockerChannels;

/// Opens fresh connections to the control-system service.
///
/// The supervisor drops every handle it holds and calls `connect` again when a
/// cycle fails, so implementations must not cache a broken connection.
pub trait ServiceFactory {
    type Service: ChannelService;

    fn connect(&mut self) -> Result<Self::Service, BoxError>;
}
