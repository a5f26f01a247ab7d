use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_config(dir: &tempfile::TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("siggen.toml");
    fs::write(&path, body).unwrap();
    path
}

const FAST: &str = r#"
[engine]
debounce_ms = 10
"#;

fn siggen() -> Command {
    let mut cmd = Command::cargo_bin("siggen").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd.arg("--log-level").arg("error");
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["features"], 0, "burst (Burst)", "stdout")]
#[case(&["self-check"], 0, "SIGGEN,SIM-2CH", "stdout")]
#[case(&["show", "nosuch"], 1, "no feature named 'nosuch'", "stderr")]
#[case(&["--channel", "3", "show", "burst"], 2, "Invalid configuration", "stderr")]
#[case(&["set", "burst"], 2, "required", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let mut cmd = siggen();
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
fn set_with_enable_writes_and_reads_back() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, FAST);
    siggen()
        .arg("--config")
        .arg(&cfg)
        .args(["set", "burst", "cycles=4", "mode=Gated", "--enable"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Burst [burst] channel 1: enabled"))
        .stdout(predicate::str::contains("Gated"))
        .stdout(predicate::str::contains("2 debounced write(s)"));
}

#[test]
fn set_json_reports_fields_and_unit() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, FAST);
    let out = siggen()
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .args(["set", "sweep", "stop=25kHz", "--enable"])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["feature"], "sweep");
    assert_eq!(v["state"], "enabled");
    assert_eq!(v["applied"], 1);
    let stop = v["fields"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["id"] == "stop")
        .unwrap();
    assert_eq!(stop["text"], "25");
    assert_eq!(stop["unit"], "kHz");
    assert_eq!(stop["base"], 25000.0);
}

#[test]
fn set_without_enable_refuses_an_inactive_feature() {
    siggen()
        .args(["set", "burst", "cycles=4"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("pass --enable"));
}

#[test]
fn show_mirrors_a_seeded_instrument() {
    siggen()
        .env("SIGGEN_SIM_SEED", "SOUR2:HARM:STAT=ON;SOUR2:HARM:AMPL=0.25;SOUR2:HARM:TYPE=ODD")
        .args(["--channel", "2", "show", "harmonics"])
        .assert()
        .success()
        .stdout(predicate::str::contains("channel 2: enabled"))
        .stdout(predicate::str::contains("250 mV"))
        .stdout(predicate::str::contains("Odd"));
}

#[test]
fn disconnected_instrument_exits_with_device_code() {
    siggen()
        .env("SIGGEN_SIM_OFFLINE", "1")
        .arg("--json")
        .arg("self-check")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("\"reason\":\"Disconnected\""));
}

#[test]
fn invalid_config_exits_with_config_code() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[engine]\ndebounce_ms = 0\n");
    siggen()
        .arg("--config")
        .arg(&cfg)
        .arg("features")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("debounce_ms"));
}

#[test]
fn unit_csv_with_bad_header_is_rejected() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("units.csv");
    let mut f = fs::File::create(&csv).unwrap();
    writeln!(f, "family,unit,factor").unwrap();
    writeln!(f, "frequency,GHz,1e9").unwrap();

    siggen()
        .arg("--units")
        .arg(&csv)
        .args(["show", "sweep"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("family,name,multiplier"));
}

#[test]
fn interactive_session_applies_on_eof() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, FAST);
    assert_cmd::Command::from_std(siggen())
        .arg("--config")
        .arg(&cfg)
        .arg("interactive")
        .write_stdin("enable serial\nserial.data=300\nbogus line\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Serial bytes enabled on channel 1"))
        .stdout(predicate::str::contains("error: unknown command 'bogus'"));
}
