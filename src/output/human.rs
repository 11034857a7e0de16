//! Human-friendly output implementation using console styling.

use std::fmt::Write as _;
use std::path::Path;

use console::Style;
use tracing::{debug, instrument, trace};

use crate::camera::SnapshotInfo;
use crate::config::ClientConfig;
use crate::error::AttendError;
use crate::orchestrator::SubmitReport;
use crate::outcome::{AttemptOutcome, Success};

use super::{BuildInfo, Output, SessionView, SlotView};

/// Styled terminal output implementation for human users.
pub struct HumanOutput {
    color: bool,
    quiet: bool,
}

impl HumanOutput {
    #[must_use]
    pub const fn new(color: bool, quiet: bool) -> Self {
        Self { color, quiet }
    }

    fn paint(&self, style: Style) -> Style {
        if self.color { style } else { style.force_styling(false) }
    }

    fn tag(&self, text: &str, style: Style) -> String {
        self.paint(style.bold()).apply_to(text).to_string()
    }

    fn label(&self, name: &str) -> String {
        self.paint(Style::new().dim())
            .apply_to(format!("  {name:<10}"))
            .to_string()
    }

    fn headline(report: &SubmitReport, success: &Success, name: Option<&str>) -> String {
        let who = success
            .matched_identity
            .as_ref()
            .map(|m| m.name.as_str())
            .filter(|n| !n.is_empty())
            .or(name);

        match report.mode.as_str() {
            "admin-enroll" => success.enrollment.map_or_else(
                || "Enrollment accepted".to_string(),
                |e| format!("Enrolled {} sample(s), {} stored", e.added, e.total),
            ),
            "admin-recognize" => match who {
                Some(n) => format!("Recognized {n}"),
                None => "Recognized".to_string(),
            },
            _ => {
                let verb = match success.action {
                    Some(action) => format!("Clocked {action}"),
                    None => "Attendance recorded".to_string(),
                };
                match who {
                    Some(n) => format!("{verb}: {n}"),
                    None => verb,
                }
            }
        }
    }

    /// Render an attempt report as it is printed.
    #[must_use]
    pub fn render_attempt(&self, report: &SubmitReport, name: Option<&str>) -> String {
        let mut out = String::new();
        match &report.outcome {
            AttemptOutcome::Success(success) => {
                let _ = writeln!(
                    out,
                    "{} {}",
                    self.tag("[OK]", Style::new().green()),
                    Self::headline(report, success, name)
                );
                if let Some(identity) = &success.matched_identity {
                    if !identity.email.is_empty() {
                        let _ = writeln!(out, "{}{}", self.label("Email"), identity.email);
                    }
                }
                if let Some(slot) = report.display_slot() {
                    let _ = writeln!(out, "{}{slot}", self.label("Slot"));
                }
                if let Some(score) = success.match_score {
                    let _ = writeln!(out, "{}{score:.2}", self.label("Score"));
                }
                if let Some(distance) = success.distance_meters {
                    let _ = writeln!(out, "{}{distance:.1} m", self.label("Distance"));
                }
                if let Some(id) = success.attendance_id {
                    let _ = writeln!(out, "{}#{id}", self.label("Record"));
                }
            }
            AttemptOutcome::Rejected { reason } => {
                let _ = writeln!(out, "{} {reason}", self.tag("[REJECTED]", Style::new().red()));
                if let Some(slot) = report.display_slot() {
                    let _ = writeln!(out, "{}{slot}", self.label("Slot"));
                }
            }
            AttemptOutcome::DeviceError { kind, message } => {
                let _ = writeln!(
                    out,
                    "{} {kind}: {message}",
                    self.tag("[DEVICE]", Style::new().yellow())
                );
            }
            AttemptOutcome::NetworkError {
                status_code,
                message,
            } => {
                let status = status_code.map(|s| format!(" (HTTP {s})")).unwrap_or_default();
                let _ = writeln!(
                    out,
                    "{} {message}{status}",
                    self.tag("[NETWORK]", Style::new().red())
                );
            }
        }
        out
    }

    /// Render an error with its hint.
    #[must_use]
    pub fn render_error(&self, error: &AttendError) -> String {
        let mut out = format!(
            "{} {}",
            self.tag("Error:", Style::new().red()),
            self.paint(Style::new().bold()).apply_to(error)
        );
        if let Some(suggestion) = error.suggestion() {
            let _ = write!(
                out,
                "\n{} {suggestion}",
                self.paint(Style::new().yellow()).apply_to("Hint:")
            );
        }
        out
    }

    fn render_session(&self, session: &SessionView) -> String {
        let mut out = String::new();
        if !session.role.is_empty() {
            let _ = writeln!(out, "{}{}", self.label("Role"), session.role);
        }
        if let Some(email) = &session.email {
            let _ = writeln!(out, "{}{email}", self.label("Email"));
        }
        if let Some(username) = &session.username {
            let _ = writeln!(out, "{}{username}", self.label("Username"));
        }
        if let Some(expires) = session.expires_at {
            let _ = writeln!(
                out,
                "{}{}",
                self.label("Expires"),
                expires.format("%Y-%m-%d %H:%M UTC")
            );
        }
        let _ = writeln!(
            out,
            "{}{}",
            self.label("Session"),
            self.paint(Style::new().dim()).apply_to(&session.session_file)
        );
        out
    }
}

impl Output for HumanOutput {
    #[instrument(skip(self))]
    fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        println!("{} {message}", self.tag("[OK]", Style::new().green()));
    }

    #[instrument(skip(self))]
    fn error(&self, error: &AttendError) {
        debug!(
            error = %error,
            recoverable = error.is_user_recoverable(),
            "Outputting error"
        );
        eprintln!("{}", self.render_error(error));
    }

    #[instrument(skip(self))]
    fn warning(&self, message: &str) {
        eprintln!("{} {message}", self.tag("[WARN]", Style::new().yellow()));
    }

    #[instrument(skip(self))]
    fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        println!("{} {message}", self.tag("[INFO]", Style::new().cyan()));
    }

    #[instrument(skip(self, report), fields(outcome = report.outcome.label()))]
    fn attempt(&self, report: &SubmitReport, name: Option<&str>) {
        debug!("Outputting attempt");
        print!("{}", self.render_attempt(report, name));
    }

    #[instrument(skip(self, snapshots), fields(count = snapshots.len()))]
    fn snapshots(&self, snapshots: &[SnapshotInfo]) {
        if self.quiet {
            return;
        }
        println!("Collected {} snapshot(s):", snapshots.len());
        for (i, snap) in snapshots.iter().enumerate() {
            trace!(index = i, sha256 = %snap.sha256, "Listing snapshot");
            let short = snap.sha256.get(..12).unwrap_or(&snap.sha256);
            println!(
                "  {i:>2}  {}x{}  {:>7} B  {}",
                snap.width,
                snap.height,
                snap.size_bytes,
                self.paint(Style::new().dim()).apply_to(short)
            );
        }
    }

    fn slot(&self, view: &SlotView) {
        println!(
            "{:02}:00 -> {}",
            view.hour,
            self.paint(Style::new().cyan().bold()).apply_to(view.slot)
        );
    }

    #[instrument(skip(self, session))]
    fn logged_in(&self, session: &SessionView) {
        println!(
            "{} Signed in as {}",
            self.tag("[OK]", Style::new().green()),
            self.paint(Style::new().bold()).apply_to(&session.name)
        );
        if !self.quiet {
            print!("{}", self.render_session(session));
        }
    }

    fn whoami(&self, session: &SessionView) {
        println!("{}", self.paint(Style::new().bold()).apply_to(&session.name));
        print!("{}", self.render_session(session));
    }

    fn logged_out(&self, had_session: bool) {
        if had_session {
            self.success("Signed out");
        } else {
            self.info("No active session");
        }
    }

    fn config(&self, config: &ClientConfig, path: &Path, exists: bool) {
        let source = if exists {
            path.display().to_string()
        } else {
            format!("{} (not found, using defaults)", path.display())
        };
        println!("{}{source}", self.label("File"));
        println!("{}{}", self.label("Backend"), config.base_url);
        println!("{}{} ms", self.label("Timeout"), config.request_timeout_ms);
        println!(
            "{}{}",
            self.label("Camera"),
            config
                .camera
                .source
                .as_ref()
                .map_or_else(|| "(none)".to_string(), |p| p.display().to_string())
        );
        println!("{}{}", self.label("Threshold"), config.recognition.threshold);
        println!(
            "{}{} x {} ms",
            self.label("Burst"),
            config.burst.count,
            config.burst.interval_ms
        );
        match &config.position {
            Some(p) => println!("{}{}, {}", self.label("Position"), p.latitude, p.longitude),
            None => println!("{}(device)", self.label("Position")),
        }
    }

    fn config_written(&self, path: &Path) {
        self.success(&format!("Wrote {}", path.display()));
    }

    #[instrument(skip(self, info))]
    fn version_info(&self, info: &BuildInfo) {
        let dirty = if info.git_dirty {
            self.paint(Style::new().yellow()).apply_to(" (dirty)").to_string()
        } else {
            String::new()
        };
        println!(
            "{} {}",
            self.paint(Style::new().cyan().bold()).apply_to("attend"),
            info.version
        );
        println!("{}{}{dirty}", self.label("Git SHA"), info.git_sha);
        println!("{}{}", self.label("Built"), info.build_timestamp);
        println!("{}{}", self.label("Rust"), info.rustc_version);
        println!("{}{}", self.label("Target"), info.target);
    }
}
