use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// A simulated locker with millisecond timings so runs finish quickly.
fn write_fast_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[locker]
name = "sim"
base = "LAS:SIM:"
laser_trigger = "EVR:SIM:TDES"
bucket_correction_delay = "LAS:SIM:VIT:BKT_DLY"

[actuator]
poll_ms = 1

[calibration]
points = 40
offset_candidates = 2000
settle_ms = 1

[jump]
settle_ms = 1

[supervisor]
cycle_ms = 1
fault_backoff_ms = 1

[model]
delay_ns = 21.7
offset_ns = 4.2
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["run", "--cycles", "30"], 0, "30 cycles", "stdout")]
#[case(&["self-check"], 0, "OK: locker sim", "stdout")]
#[case(&["channels"], 0, "LAS:SIM:VIT:FS_STATUS", "stdout")]
#[case(&["run", "--cycles", "nope"], 2, "invalid value", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);

    let mut cmd = Command::cargo_bin("femto").unwrap();
    cmd.arg("--config").arg(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn injected_jump_is_corrected_and_reported_as_json() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);

    let out = Command::cargo_bin("femto")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .args(["run", "--cycles", "40", "--inject-jump", "-2"])
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let line = String::from_utf8(out.stdout).unwrap();
    let v: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(v["cycles"], 40);
    assert_eq!(v["jumps_corrected"], 1);
    assert_eq!(v["bucket_counter"], 1);
    let offset = v["offset_ns"].as_f64().unwrap();
    assert!((offset - (4.2 - 2.0 / 3.808)).abs() < 1e-6, "offset {offset}");
}

#[test]
fn calibrate_flag_runs_a_sweep() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);

    Command::cargo_bin("femto")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--cycles", "3", "--calibrate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 calibrations"));
}

#[test]
fn missing_config_exits_with_config_code() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("femto")
        .unwrap()
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("channels")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Configuration problem"));
}

#[test]
fn invalid_config_is_explained_in_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(
        &path,
        r#"
[locker]
name = "sim"
base = "LAS:SIM:"
laser_trigger = "EVR:SIM:TDES"
bucket_correction_delay = "LAS:SIM:VIT:BKT_DLY"

[jump]
max_jump_error_ns = 0.2
"#,
    )
    .unwrap();

    let out = Command::cargo_bin("femto")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .arg("--json")
        .arg("self-check")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
    let v: serde_json::Value =
        serde_json::from_str(String::from_utf8(out.stdout).unwrap().trim()).unwrap();
    assert_eq!(v["reason"], "Config");
    assert!(v["message"].as_str().unwrap().contains("max_jump_error_ns"));
}
