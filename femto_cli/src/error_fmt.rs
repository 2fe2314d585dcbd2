//! Human-readable error descriptions and structured JSON error formatting.

use femto_core::error::{BuildError, LockError};

/// Stable exit codes.
pub const EXIT_GENERIC: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_WATCHDOG: i32 = 3;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingFactory | BuildError::MissingChannels => format!(
                "What happened: The supervisor was built without its hardware connection ({be}).\nLikely causes: A bug in the caller wiring the supervisor.\nHow to fix: Report it with --log-level=debug output."
            ),
            BuildError::MissingConfig => "What happened: No locker configuration was provided.\nLikely causes: The config was not loaded before building the supervisor.\nHow to fix: Pass --config <FILE> pointing at a valid TOML file.".to_string(),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/femto_config.toml for a sample."
            ),
        };
    }

    if let Some(le) = err.downcast_ref::<LockError>() {
        return match le {
            LockError::Config(msg) => format!(
                "What happened: Configuration problem: {msg}.\nLikely causes: Missing file, a typo in the TOML, or an out-of-range value; or no usable delay/offset and no [model] section.\nHow to fix: Fix the config (see etc/femto_config.toml) and rerun."
            ),
            LockError::WatchdogInit(msg) => format!(
                "What happened: Watchdog initialization failed repeatedly ({msg}).\nLikely causes: The control-system service is unreachable or the watchdog record is missing.\nHow to fix: Check that the locker IOC is up and that [locker].base is correct."
            ),
            LockError::Timeout(ch) => format!(
                "What happened: Channel {ch} timed out.\nLikely causes: IOC down or overloaded, or timeouts configured too low.\nHow to fix: Check the IOC and consider raising [timeouts]."
            ),
            LockError::ActuatorStuck { target_ns, tries } => format!(
                "What happened: Phase shifter did not reach {target_ns:.4} ns after {tries} polls.\nLikely causes: Motor disabled, at a limit, or tolerance too tight.\nHow to fix: Check the motor record; adjust [actuator].tolerance_ns or max_tries."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return EXIT_CONFIG;
    }
    match err.downcast_ref::<LockError>() {
        Some(LockError::Config(_)) => EXIT_CONFIG,
        Some(LockError::WatchdogInit(_)) => EXIT_WATCHDOG,
        _ => EXIT_GENERIC,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    match err.downcast_ref::<LockError>() {
        Some(LockError::Config(_)) => "Config",
        Some(LockError::WatchdogInit(_)) => "WatchdogInit",
        Some(LockError::Timeout(_)) => "Timeout",
        Some(LockError::Channel { .. }) => "Channel",
        Some(LockError::ActuatorStuck { .. }) => "ActuatorStuck",
        Some(LockError::InsufficientData { .. }) => "InsufficientData",
        Some(LockError::TargetRejected(_)) => "TargetRejected",
        Some(LockError::State(_)) => "State",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_errors_pick_their_exit_codes() {
        let cfg = eyre::Report::new(LockError::Config("bad".into()));
        let wd = eyre::Report::new(LockError::WatchdogInit("refused".into()));
        let other = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&cfg), EXIT_CONFIG);
        assert_eq!(exit_code_for_error(&wd), EXIT_WATCHDOG);
        assert_eq!(exit_code_for_error(&other), EXIT_GENERIC);
    }

    #[test]
    fn json_carries_reason_and_message() {
        let err = eyre::Report::new(LockError::WatchdogInit("refused".into()));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "WatchdogInit");
        assert_eq!(v["exit_code"], 3);
        assert!(v["message"].as_str().unwrap().contains("Watchdog initialization failed"));
    }
}
