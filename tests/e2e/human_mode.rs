//! Human mode: plain text once color is off.

use predicates::prelude::*;

use crate::common::env::TestEnv;

#[test]
fn quick_start_lists_commands() {
    let env = TestEnv::new();
    env.cmd()
        .assert()
        .success()
        .stdout(predicate::str::contains("QUICK START"))
        .stdout(predicate::str::contains("attend clock in"))
        .stdout(predicate::str::contains("attend --robot"));
}

#[test]
fn slot_line_is_plain_text() {
    let env = TestEnv::new();
    env.cmd()
        .args(["--no-color", "slot", "--hour", "14"])
        .assert()
        .success()
        .stdout("14:00 -> afternoon\n");
}

#[test]
fn no_color_env_accepts_any_value() {
    let env = TestEnv::new();
    for value in ["1", "", "true", "0"] {
        env.cmd()
            .env("NO_COLOR", value)
            .args(["slot", "--hour", "14"])
            .assert()
            .success()
            .stdout(predicate::str::contains("afternoon"));
    }
}

#[test]
fn errors_carry_a_hint() {
    let env = TestEnv::new();
    env.cmd()
        .arg("whoami")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error: Not signed in"))
        .stderr(predicate::str::contains("Hint: Run: attend login <email>"));
}

#[test]
fn config_path_flag_prints_only_the_path() {
    let env = TestEnv::new();
    env.cmd()
        .args(["config", "--path"])
        .assert()
        .success()
        .stdout(format!("{}\n", env.config.display()));
}

#[test]
fn out_of_range_hour_is_a_usage_error() {
    let env = TestEnv::new();
    env.cmd()
        .args(["slot", "--hour", "24"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("24"));
}

#[test]
fn completions_are_generated() {
    let env = TestEnv::new();
    env.cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("attend"));
}
