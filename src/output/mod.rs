//! Output mode abstraction for robot and human output.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::camera::SnapshotInfo;
use crate::config::ClientConfig;
use crate::error::AttendError;
use crate::orchestrator::SubmitReport;
use crate::slot::Slot;

pub mod human;
pub mod robot;

pub use human::HumanOutput;
pub use robot::RobotOutput;

/// Who the stored session belongs to, as shown by `whoami` and `login`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Username decoded from the token, display only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub session_file: String,
}

/// Embedded build metadata.
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_sha: &'static str,
    pub git_dirty: bool,
    pub build_timestamp: &'static str,
    pub rustc_version: &'static str,
    pub target: &'static str,
}

/// A derived attendance slot.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SlotView {
    pub hour: u32,
    pub slot: Slot,
}

/// JSON formatting options for robot mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotFormat {
    /// Pretty-printed JSON (default for --robot).
    Json,
    /// Single-line JSON (--format=json-compact).
    JsonCompact,
}

/// Determines how command output is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// JSON output for agents and scripting.
    Robot(RobotFormat),
    /// Styled terminal output. `color` is false under `--no-color` or `NO_COLOR`.
    Human { color: bool, quiet: bool },
}

impl OutputMode {
    /// Returns true if output should be JSON.
    #[must_use]
    pub const fn is_robot(&self) -> bool {
        matches!(self, Self::Robot(_))
    }

    /// Convert into the appropriate Output implementation.
    #[must_use]
    pub fn into_output(self) -> Box<dyn Output> {
        match self {
            Self::Robot(format) => Box::new(RobotOutput::new(format)),
            Self::Human { color, quiet } => Box::new(HumanOutput::new(color, quiet)),
        }
    }
}

/// Trait for all output operations.
///
/// Commands call these methods without knowing the output mode.
pub trait Output {
    // Basic messages
    fn success(&self, message: &str);
    fn error(&self, error: &AttendError);
    fn warning(&self, message: &str);
    fn info(&self, message: &str);

    // Attendance
    /// Result of one submission attempt. `name` is the display name of the
    /// signed-in user, when there is one.
    fn attempt(&self, report: &SubmitReport, name: Option<&str>);
    /// Snapshots collected before an admin submission.
    fn snapshots(&self, snapshots: &[SnapshotInfo]);
    fn slot(&self, view: &SlotView);

    // Session
    fn logged_in(&self, session: &SessionView);
    fn whoami(&self, session: &SessionView);
    fn logged_out(&self, had_session: bool);

    // Configuration
    fn config(&self, config: &ClientConfig, path: &Path, exists: bool);
    fn config_written(&self, path: &Path);

    // Metadata
    fn version_info(&self, info: &BuildInfo);
}
