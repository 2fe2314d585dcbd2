use femto_config::{load_file, load_toml};
use rstest::rstest;
use std::io::Write;

const MINIMAL: &str = r#"
[locker]
name = "xpp"
base = "LAS:FS3:"
laser_trigger = "EVR:LAS:T0:TDES"
bucket_correction_delay = "LAS:FS3:VIT:BKT_DLY"
"#;

#[test]
fn minimal_config_gets_deployed_defaults() {
    let cfg = load_toml(MINIMAL).expect("parse TOML");
    cfg.validate().expect("defaults must validate");
    assert_eq!(cfg.rf.locking_ghz, 3.808);
    assert_eq!(cfg.counter.ring_size, 12);
    assert_eq!(cfg.calibration.points, 50);
    assert_eq!(cfg.calibration.offset_candidates, 10_000);
    assert_eq!(cfg.jump.max_jump_error_ns, 0.05);
    assert_eq!(cfg.supervisor.max_watchdog_failures, 2);
    assert!(!cfg.drift.enabled);
    assert!(cfg.model.is_none());
}

#[test]
fn missing_locker_section_is_a_parse_error() {
    let err = load_toml("[rf]\nlaser_ghz = 0.068\n").expect_err("locker is required");
    assert!(err.to_string().contains("locker"));
}

#[rstest]
#[case("[rf]\nlaser_ghz = 0.0", "rf.laser_ghz must be > 0")]
#[case("[rf]\nlocking_ghz = -1.0", "rf.locking_ghz must be > 0")]
#[case("[counter]\nring_size = 1", "counter.ring_size must be >= 2")]
#[case("[actuator]\nmax_tries = 0", "actuator.max_tries must be >= 1")]
#[case("[calibration]\npoints = 1", "calibration.points must be >= 2")]
#[case("[calibration]\nsample_attempts = 0", "calibration.sample_attempts must be >= 1")]
#[case("[jump]\nmax_jump_error_ns = 0.2", "below half a bucket")]
#[case("[limits]\nmin_time_ns = 10.0\nmax_time_ns = 5.0", "limits.min_time_ns must be <")]
#[case("[drift]\ndirection = 0.5", "drift.direction must be 1 or -1")]
#[case("[drift]\nclamp_ns = 0.0", "drift.clamp_ns must be in")]
#[case("[timeouts]\nread_ms = 0", "timeouts.read_ms must be >= 1")]
#[case("[timeouts]\nwrite_ms = 120000", "timeouts.write_ms is unreasonably large")]
#[case("[supervisor]\nmax_watchdog_failures = 0", "supervisor.max_watchdog_failures must be >= 1")]
#[case("[logging]\nrotation = \"weekly\"", "logging.rotation must be one of")]
fn rejects_bad_knobs(#[case] extra: &str, #[case] needle: &str) {
    let text = format!("{MINIMAL}\n{extra}\n");
    let cfg = load_toml(&text).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        err.to_string().contains(needle),
        "expected {needle:?} in {err}"
    );
}

#[test]
fn persisted_model_round_trips() {
    let text = format!("{MINIMAL}\n[model]\ndelay_ns = 12.5\noffset_ns = 3.25\n");
    let cfg = load_toml(&text).expect("parse TOML");
    cfg.validate().expect("valid");
    let m = cfg.model.expect("model present");
    assert_eq!(m.delay_ns, 12.5);
    assert_eq!(m.offset_ns, 3.25);
}

#[test]
fn load_file_reads_and_validates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("femto.toml");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "{MINIMAL}").unwrap();
    writeln!(f, "[rf]\nlaser_ghz = -2.0").unwrap();
    drop(f);

    let err = load_file(&path).expect_err("invalid frequency");
    assert!(err.to_string().contains("rf.laser_ghz"));

    let missing = dir.path().join("nope.toml");
    let err = load_file(&missing).expect_err("missing file");
    assert!(err.to_string().contains("read config"));
}
