//! Robot mode: one JSON document on stdout, errors as JSON on stderr.

use crate::common::env::TestEnv;
use crate::common::fixtures::write_config;

#[test]
fn quick_start_describes_the_tool() {
    let env = TestEnv::new();
    let json = env.run_json(&[], 0);
    assert_eq!(json["tool"], "attend");
    assert_eq!(json["exit_codes"]["attempt_failed"], 2);
    assert!(json["attendance"]["kiosk"].as_str().unwrap().contains("scan"));
}

#[test]
fn version_reports_build_metadata() {
    let env = TestEnv::new();
    let json = env.run_json(&["version"], 0);
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert!(json["git_sha"].is_string());
    assert!(json["git_dirty"].is_boolean());
}

#[test]
fn slot_for_an_explicit_hour() {
    let env = TestEnv::new();
    for (hour, slot) in [("9", "morning"), ("12", "noon"), ("16", "afternoon"), ("23", "evening")] {
        let json = env.run_json(&["slot", "--hour", hour], 0);
        assert_eq!(json["slot"], slot, "hour {hour}");
        assert_eq!(json["hour"].to_string(), hour);
    }
}

#[test]
fn compact_format_is_a_single_line() {
    let env = TestEnv::new();
    let out = env
        .cmd()
        .args(["--format", "json-compact", "slot", "--hour", "7"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.trim_end().lines().count(), 1);
    assert!(text.contains(r#""slot":"morning""#));
}

#[test]
fn clock_without_session_is_a_recoverable_error() {
    let env = TestEnv::new();
    write_config(env.dir(), "http://127.0.0.1:9", "");
    let err = env.run_json_error(&["clock", "in", "--lat", "13.7", "--lng", "100.5"]);
    assert_eq!(err["error"], true);
    assert_eq!(err["message"], "Not signed in");
    assert_eq!(err["recoverable"], true);
    assert!(err["suggestion"].as_str().unwrap().contains("attend login"));
}

#[test]
fn scan_without_camera_source_fails_before_any_request() {
    let env = TestEnv::new();
    write_config(env.dir(), "http://127.0.0.1:9", "");
    let err = env.run_json_error(&["scan", "in"]);
    assert!(err["message"].as_str().unwrap().contains("camera unavailable"), "{err}");
}

#[test]
fn init_writes_defaults_and_config_reads_them_back() {
    let env = TestEnv::new();

    let before = env.run_json(&["config"], 0);
    assert_eq!(before["exists"], false);
    assert_eq!(before["config"]["base_url"], "http://127.0.0.1:8000");

    let written = env.run_json(&["init"], 0);
    assert_eq!(written["ok"], true);
    assert!(env.config.exists());

    let after = env.run_json(&["config"], 0);
    assert_eq!(after["exists"], true);
    assert_eq!(after["config"]["recognition"]["threshold"], 0.35);
    assert_eq!(after["config"]["burst"]["count"], 5);

    let again = env.run_json_error(&["init"]);
    assert!(again["message"].as_str().unwrap().contains("--force"));
    env.run_json(&["init", "--force"], 0);
}

#[test]
fn invalid_config_is_reported() {
    let env = TestEnv::new();
    write_config(env.dir(), "ftp://nowhere", "");
    let err = env.run_json_error(&["config"]);
    assert!(err["message"].as_str().unwrap().contains("unsupported scheme"), "{err}");
}

#[test]
fn logout_without_session_is_not_an_error() {
    let env = TestEnv::new();
    let json = env.run_json(&["logout"], 0);
    assert_eq!(json["logged_out"], true);
    assert_eq!(json["had_session"], false);
}

#[test]
fn whoami_without_session_fails() {
    let env = TestEnv::new();
    let err = env.run_json_error(&["whoami"]);
    assert_eq!(err["message"], "Not signed in");
}
