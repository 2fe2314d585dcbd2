//! Maps `Box<dyn Error>` from the channel service boundary to typed `LockError`.
//!
//! `femto_traits::ChannelService` returns `Box<dyn Error + Send + Sync>` so any
//! backend can plug in; this module converts those to our typed error enum,
//! with a feature-gated path for `femto_hardware::HwError` downcasting.

use crate::error::LockError;
use femto_traits::ValueKindError;

/// Map a service error on `channel` to a typed `LockError`.
///
/// Known error types are downcast first, then string heuristics apply.
pub fn map_channel_error(channel: &str, e: &(dyn std::error::Error + 'static)) -> LockError {
    #[cfg(feature = "hardware-errors")]
    {
        use femto_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout(_) => LockError::Timeout(channel.to_string()),
                other => LockError::Channel {
                    channel: channel.to_string(),
                    message: other.to_string(),
                },
            };
        }
    }

    if let Some(kind) = e.downcast_ref::<ValueKindError>() {
        return LockError::Channel {
            channel: channel.to_string(),
            message: format!("expected {}, got {:?}", kind.expected, kind.got),
        };
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") || s.to_lowercase().contains("timed out") {
        LockError::Timeout(channel.to_string())
    } else {
        LockError::Channel {
            channel: channel.to_string(),
            message: s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Opaque(&'static str);

    impl std::fmt::Display for Opaque {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.0)
        }
    }

    impl std::error::Error for Opaque {}

    #[test]
    fn string_fallback_detects_timeouts() {
        let e = Opaque("operation timed out");
        assert_eq!(map_channel_error("A", &e), LockError::Timeout("A".into()));
        let e = Opaque("link down");
        assert!(matches!(map_channel_error("A", &e), LockError::Channel { .. }));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn hardware_errors_are_downcast() {
        use femto_hardware::error::HwError;
        let e = HwError::Timeout("X:Y".into());
        assert_eq!(map_channel_error("X:Y", &e), LockError::Timeout("X:Y".into()));
        let e = HwError::Disconnected("X:Y".into());
        assert!(matches!(
            map_channel_error("X:Y", &e),
            LockError::Channel { channel, .. } if channel == "X:Y"
        ));
    }
}
