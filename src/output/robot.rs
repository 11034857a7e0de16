//! Robot mode JSON output implementation.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, instrument, trace, warn};

use crate::camera::SnapshotInfo;
use crate::config::ClientConfig;
use crate::error::AttendError;
use crate::orchestrator::SubmitReport;

use super::{BuildInfo, Output, RobotFormat, SessionView, SlotView};

/// JSON output implementation for agents and scripting.
///
/// Results go to stdout, one document per call. Errors and warnings go to
/// stderr so stdout stays parseable.
pub struct RobotOutput {
    format: RobotFormat,
}

/// Attempt report plus the resolved display name.
#[derive(Serialize)]
struct AttemptDocument<'a> {
    #[serde(flatten)]
    report: &'a SubmitReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_slot: Option<crate::slot::Slot>,
}

impl RobotOutput {
    #[instrument]
    pub fn new(format: RobotFormat) -> Self {
        debug!(?format, "Creating RobotOutput");
        Self { format }
    }

    /// Serialize `data` in the configured format.
    pub fn render<T: Serialize + ?Sized>(&self, data: &T) -> serde_json::Result<String> {
        match self.format {
            RobotFormat::Json => serde_json::to_string_pretty(data),
            RobotFormat::JsonCompact => serde_json::to_string(data),
        }
    }

    /// Output any serializable data as JSON to stdout.
    #[instrument(skip(self, data), fields(format = ?self.format))]
    fn output_json<T: Serialize + ?Sized>(&self, data: &T) {
        match self.render(data) {
            Ok(json) => {
                trace!(json_len = json.len(), "JSON serialized");
                println!("{json}");
            }
            Err(e) => warn!(error = %e, "Failed to serialize output"),
        }
    }

    /// Error document written to stderr.
    #[must_use]
    pub fn error_document(error: &AttendError) -> serde_json::Value {
        serde_json::json!({
            "error": true,
            "message": error.to_string(),
            "suggestion": error.suggestion(),
            "recoverable": error.is_user_recoverable(),
        })
    }
}

impl Output for RobotOutput {
    fn success(&self, message: &str) {
        self.output_json(&serde_json::json!({
            "success": true,
            "message": message
        }));
    }

    #[instrument(skip(self))]
    fn error(&self, error: &AttendError) {
        debug!(error = %error, "Robot: error");
        match serde_json::to_string_pretty(&Self::error_document(error)) {
            Ok(json) => eprintln!("{json}"),
            Err(e) => warn!(error = %e, "Failed to serialize error"),
        }
    }

    fn warning(&self, message: &str) {
        let doc = serde_json::json!({
            "warning": true,
            "message": message
        });
        eprintln!("{doc}");
    }

    fn info(&self, message: &str) {
        self.output_json(&serde_json::json!({
            "info": true,
            "message": message
        }));
    }

    #[instrument(skip(self, report), fields(outcome = report.outcome.label()))]
    fn attempt(&self, report: &SubmitReport, name: Option<&str>) {
        self.output_json(&AttemptDocument {
            report,
            name,
            display_slot: report.display_slot(),
        });
    }

    fn snapshots(&self, snapshots: &[SnapshotInfo]) {
        self.output_json(&serde_json::json!({ "snapshots": snapshots }));
    }

    fn slot(&self, view: &SlotView) {
        self.output_json(view);
    }

    fn logged_in(&self, session: &SessionView) {
        self.output_json(&serde_json::json!({
            "logged_in": true,
            "session": session,
        }));
    }

    fn whoami(&self, session: &SessionView) {
        self.output_json(session);
    }

    fn logged_out(&self, had_session: bool) {
        self.output_json(&serde_json::json!({
            "logged_out": true,
            "had_session": had_session,
        }));
    }

    fn config(&self, config: &ClientConfig, path: &Path, exists: bool) {
        self.output_json(&serde_json::json!({
            "path": path.display().to_string(),
            "exists": exists,
            "config": config,
        }));
    }

    fn config_written(&self, path: &Path) {
        self.output_json(&serde_json::json!({
            "ok": true,
            "path": path.display().to_string(),
        }));
    }

    fn version_info(&self, info: &BuildInfo) {
        self.output_json(info);
    }
}
