use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use assert_cmd::Command;
use tempfile::tempdir;

// Fast timings so the simulated circuit answers immediately.
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[stability]
mode = "windowed"
window = 5
threshold_ph = 0.005
required_windows = 2

[timing]
read_settle_ms = 1
command_settle_ms = 1
step_timeout_ms = 1000
idle_tick_ms = 1
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn phcal(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("phcal").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("PHCAL_TEST_SIM_FAIL")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(cfg);
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "OK: ?i,pH,2.16", "stdout")]
#[case(&["status"], 0, "Calibration: none", "stdout")]
#[case(&["check", "--windows", "2"], 0, "window 2:", "stdout")]
#[case(&["check", "--windows", "0"], 2, "invalid value", "stderr")]
#[case(&["run", "--mode", "median"], 2, "invalid value", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let assert = phcal(&cfg).args(args).assert().code(exit_code);
    let out = assert.get_output();
    let text = if stream == "stdout" {
        String::from_utf8_lossy(&out.stdout).to_string()
    } else {
        String::from_utf8_lossy(&out.stderr).to_string()
    };
    assert!(text.contains(needle), "missing {needle:?} in {stream}: {text}");
}

#[rstest]
#[case::windowed("windowed")]
#[case::exact_repeat("exact-repeat")]
fn run_start_then_stop_clears_calibration(#[case] mode: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    phcal(&cfg)
        .args(["run", "--mode", mode])
        .write_stdin("start\nstop\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Place the probe in the pH 7.00 solution"))
        .stdout(predicate::str::contains(
            "Calibration stopped; device calibration cleared.",
        ));
}

#[rstest]
fn run_with_closed_input_exits_cleanly() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    phcal(&cfg)
        .arg("run")
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("pH probe calibration"));
}

#[rstest]
fn invalid_command_is_reported_and_session_continues() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    phcal(&cfg)
        .arg("run")
        .write_stdin("calibrate\nstatus\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("invalid command: 'calibrate'"));
}

#[rstest]
fn stable_window_override_is_echoed() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    phcal(&cfg)
        .arg("run")
        .write_stdin("set_stable_windows 4\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Stable windows required: 4."));
}
