//! Login, attempts and session teardown against a mock backend.

use mockito::{Matcher, Server, ServerGuard};
use serde_json::{Value, json};

use crate::common::env::TestEnv;
use crate::common::fixtures::{token_for, write_config, write_frame, write_frames};

const LAT: &str = "13.7563";
const LNG: &str = "100.5018";

fn login_as(env: &TestEnv, server: &mut ServerGuard, role: &str, token: &str) {
    let mock = server
        .mock("POST", "/api/login")
        .match_body(Matcher::UrlEncoded("username".into(), "ann@example.com".into()))
        .with_status(200)
        .with_body(
            json!({
                "access_token": token,
                "token_type": "bearer",
                "role": role,
                "name": "Ann",
            })
            .to_string(),
        )
        .create();

    let json = env.run_json(&["login", "ann@example.com", "--password", "pw"], 0);
    assert_eq!(json["logged_in"], true);
    assert_eq!(json["session"]["name"], "Ann");
    mock.assert();
}

fn json_lines(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).expect("json line"))
        .collect()
}

#[test]
fn login_then_manual_clock_in() {
    let env = TestEnv::new();
    let mut server = Server::new();
    write_config(env.dir(), &server.url(), "");
    let token = token_for("ann", 8);
    login_as(&env, &mut server, "employee", &token);
    assert!(env.session.exists());

    let me = env.run_json(&["whoami"], 0);
    assert_eq!(me["username"], "ann");
    assert_eq!(me["email"], "ann@example.com");
    assert!(me["expires_at"].is_string());

    let clock = server
        .mock("POST", "/api/attendance/manual-in")
        .match_header("authorization", format!("Bearer {token}").as_str())
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="lat""#.into()),
            Matcher::Regex("\r\n\r\n6\r\n".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"ok":true,"action":"in","distance_m":12.5,"slot":"morning","attendance_id":31}"#)
        .create();

    let json = env.run_json(&["clock", "in", "--lat", LAT, "--lng", LNG, "--accuracy", "6.4"], 0);
    assert_eq!(json["outcome"], "success");
    assert_eq!(json["mode"], "manual in");
    assert_eq!(json["name"], "Ann");
    assert_eq!(json["distance_meters"], 12.5);
    assert_eq!(json["display_slot"], "morning");
    assert_eq!(json["credential_invalid"], false);
    clock.assert();
}

#[test]
fn stale_session_is_cleared_on_401() {
    let env = TestEnv::new();
    let mut server = Server::new();
    write_config(env.dir(), &server.url(), "");
    login_as(&env, &mut server, "employee", "opaque-token");

    server
        .mock("POST", "/api/attendance/manual-out")
        .with_status(401)
        .with_body(r#"{"detail":"Could not validate credentials"}"#)
        .create();

    let out = env
        .cmd()
        .args(["--robot", "clock", "out", "--lat", LAT, "--lng", LNG])
        .assert()
        .code(2)
        .get_output()
        .clone();

    let json: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["outcome"], "rejected");
    assert_eq!(json["reason"], "Could not validate credentials");
    assert_eq!(json["credential_invalid"], true);
    assert!(String::from_utf8_lossy(&out.stderr).contains("sign in again"));
    assert!(!env.session.exists());

    let err = env.run_json_error(&["whoami"]);
    assert_eq!(err["message"], "Not signed in");
}

#[test]
fn kiosk_scan_needs_no_session() {
    let env = TestEnv::new();
    let mut server = Server::new();
    let frame = write_frame(env.dir(), "face.png", 640, 480, [120, 110, 100]);
    write_config(env.dir(), &server.url(), "");

    let mock = server
        .mock("POST", "/api/attendance/anonymous-clock")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Regex(r#"name="action"\r\n\r\nout"#.into()))
        .with_status(422)
        .with_body(r#"{"detail":"Face not recognized"}"#)
        .create();

    let json = env.run_json(
        &["scan", "out", "--camera", frame.to_str().unwrap(), "--lat", LAT, "--lng", LNG],
        2,
    );
    assert_eq!(json["outcome"], "rejected");
    assert_eq!(json["reason"], "Face not recognized");
    assert!(json["display_slot"].is_string());
    mock.assert();
}

#[test]
fn admin_enroll_lists_snapshots_then_the_result() {
    let env = TestEnv::new();
    let mut server = Server::new();
    let frames = write_frames(env.dir(), 3);
    write_config(env.dir(), &server.url(), "");
    let token = token_for("root", 8);
    login_as(&env, &mut server, "admin", &token);

    let enroll = server
        .mock("POST", "/api/admin/enroll")
        .match_header("authorization", format!("Bearer {token}").as_str())
        .match_body(Matcher::Regex(r#"name="email"\r\n\r\nnew.hire@example.com"#.into()))
        .with_status(200)
        .with_body(r#"{"ok":true,"added":4,"total":4}"#)
        .create();

    let out = env
        .cmd()
        .args(["--format", "json-compact", "admin", "enroll", "new.hire@example.com"])
        .args(["-n", "4", "--interval-ms", "0", "--camera", frames.to_str().unwrap()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let docs = json_lines(&out);
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0]["snapshots"].as_array().unwrap().len(), 4);
    assert_eq!(docs[1]["outcome"], "success");
    assert_eq!(docs[1]["enrollment"]["total"], 4);
    enroll.assert();
}

#[test]
fn enroll_with_too_few_frames_never_calls_the_server() {
    let env = TestEnv::new();
    let mut server = Server::new();
    let frames = write_frames(env.dir(), 2);
    write_config(env.dir(), &server.url(), "");
    login_as(&env, &mut server, "admin", &token_for("root", 8));

    let enroll = server.mock("POST", "/api/admin/enroll").expect(0).create();

    let out = env
        .cmd()
        .args(["--robot", "admin", "enroll", "new.hire@example.com"])
        .args(["-n", "2", "--interval-ms", "0", "--camera", frames.to_str().unwrap()])
        .assert()
        .code(1)
        .get_output()
        .stderr
        .clone();

    let err: Value = serde_json::from_slice(&out).unwrap();
    assert!(err["message"].as_str().unwrap().contains("at least 3"), "{err}");
    assert_eq!(err["suggestion"], "Capture more frames with --count");
    enroll.assert();
}

#[test]
fn password_can_come_from_the_environment() {
    let env = TestEnv::new();
    let mut server = Server::new();
    write_config(env.dir(), &server.url(), "");
    server
        .mock("POST", "/api/login")
        .match_body(Matcher::UrlEncoded("password".into(), "from-env".into()))
        .with_status(200)
        .with_body(r#"{"access_token":"t","role":"employee","name":"Ann"}"#)
        .create();

    env.cmd()
        .env("ATTEND_PASSWORD", "from-env")
        .args(["--robot", "login", "ann@example.com"])
        .assert()
        .success();
    assert!(env.session.exists());
}

#[test]
fn wrong_password_is_rejected_without_a_session() {
    let env = TestEnv::new();
    let mut server = Server::new();
    write_config(env.dir(), &server.url(), "");
    server
        .mock("POST", "/api/login")
        .with_status(401)
        .with_body(r#"{"detail":"Incorrect email or password"}"#)
        .create();

    let err = env.run_json_error(&["login", "ann@example.com", "--password", "nope"]);
    assert!(err["message"].as_str().unwrap().contains("Incorrect email or password"));
    assert!(!env.session.exists());
}
