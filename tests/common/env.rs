//! Isolated environment for running the `attend` binary.

use std::path::PathBuf;

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// A temp directory holding the config and session files for one test.
pub struct TestEnv {
    tmp: TempDir,
    pub config: PathBuf,
    pub session: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let config = tmp.path().join("config.toml");
        let session = tmp.path().join("data").join("session.json");
        Self {
            tmp,
            config,
            session,
        }
    }

    pub fn dir(&self) -> &std::path::Path {
        self.tmp.path()
    }

    /// `attend` with every path pointed into the temp directory.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("attend").expect("attend binary");
        cmd.env("ATTEND_CONFIG", &self.config)
            .env("ATTEND_SESSION", &self.session)
            .env("RUST_LOG", "off")
            .env("NO_COLOR", "1")
            .env_remove("ATTEND_API_URL")
            .env_remove("ATTEND_PASSWORD")
            .env_remove("ATTEND_FORMAT");
        cmd
    }

    /// Run with `--robot`, expecting `code`, and parse stdout.
    pub fn run_json(&self, args: &[&str], code: i32) -> Value {
        let out = self
            .cmd()
            .arg("--robot")
            .args(args)
            .assert()
            .code(code)
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&out).expect("valid json output")
    }

    /// Run with `--robot`, expecting failure, and parse the stderr error object.
    pub fn run_json_error(&self, args: &[&str]) -> Value {
        let out = self
            .cmd()
            .arg("--robot")
            .args(args)
            .assert()
            .failure()
            .get_output()
            .stderr
            .clone();
        serde_json::from_slice(&out).expect("valid json error")
    }
}
