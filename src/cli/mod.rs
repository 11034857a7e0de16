//! CLI argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::api::Action;
use crate::geo::PositionReading;
use crate::orchestrator::THRESHOLD_RANGE;
use crate::output::{OutputMode, RobotFormat};

/// Attendance client: clock in and out with a face capture and a position fix.
///
/// Robot Mode: Use --robot or --format=json for machine-parseable output.
#[derive(Parser, Debug)]
#[command(name = "attend", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (text for humans, json for agents/scripts)
    #[arg(
        long,
        short = 'f',
        default_value = "text",
        global = true,
        env = "ATTEND_FORMAT"
    )]
    pub format: OutputFormat,

    /// Robot mode: equivalent to --format=json
    #[arg(long, global = true)]
    pub robot: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Configuration file (.toml, .yaml)
    #[arg(long, short = 'c', global = true, env = "ATTEND_CONFIG")]
    pub config: Option<PathBuf>,

    /// Session file (default: <data dir>/attend/session.json)
    #[arg(long, global = true, env = "ATTEND_SESSION")]
    pub session: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with optional color
    #[default]
    Text,
    /// JSON output for scripts and agents
    Json,
    /// Compact JSON (single line)
    JsonCompact,
}

impl Cli {
    /// Returns true if output should be JSON (robot mode or explicit --format=json).
    pub const fn use_json(&self) -> bool {
        self.robot || matches!(self.format, OutputFormat::Json | OutputFormat::JsonCompact)
    }

    /// Returns true if output should be compact JSON.
    pub const fn use_compact_json(&self) -> bool {
        matches!(self.format, OutputFormat::JsonCompact)
    }

    /// Output mode selected by the global flags.
    pub const fn output_mode(&self) -> OutputMode {
        if self.use_json() {
            let format = if self.use_compact_json() {
                RobotFormat::JsonCompact
            } else {
                RobotFormat::Json
            };
            OutputMode::Robot(format)
        } else {
            OutputMode::Human {
                color: !self.no_color,
                quiet: self.quiet,
            }
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // === Session ===
    /// Sign in and store the session
    Login(LoginArgs),

    /// Forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    // === Attendance ===
    /// Clock in or out as the signed-in user
    Clock(ClockArgs),

    /// Kiosk clock: anonymous, the server identifies the face
    Scan(ScanArgs),

    /// Administrative face operations
    Admin(AdminArgs),

    /// Show the attendance slot for an hour
    Slot(SlotArgs),

    // === Configuration ===
    /// Write a default configuration file
    Init(InitArgs),

    /// Show the effective configuration
    Config(ConfigArgs),

    // === Utilities ===
    /// Show version and build information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// === Argument Structs ===

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email or username
    pub email: String,

    /// Password (prompted when omitted on a terminal)
    #[arg(long, env = "ATTEND_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Camera source override shared by capturing commands.
#[derive(Args, Debug, Default)]
pub struct CameraArgs {
    /// Image file or directory of frames to capture from
    #[arg(long, value_name = "PATH")]
    pub camera: Option<PathBuf>,
}

/// Fixed position override.
#[derive(Args, Debug, Default)]
pub struct PositionArgs {
    /// Latitude in degrees
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude in degrees
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lng: Option<f64>,

    /// Accuracy radius in meters
    #[arg(long, requires = "lat")]
    pub accuracy: Option<f64>,
}

impl PositionArgs {
    /// Reading built from the flags, if both coordinates were given.
    pub fn reading(&self) -> Option<PositionReading> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(PositionReading::new(lat, lng, self.accuracy)),
            _ => None,
        }
    }
}

/// Examples:
///
/// ```bash
/// # Position-only clock in
/// attend clock in --lat 13.7563 --lng 100.5018
///
/// # Face + position, frames staged in a directory
/// attend clock out --live --camera ~/frames
/// ```
#[derive(Args, Debug)]
pub struct ClockArgs {
    /// in | out
    #[arg(value_name = "ACTION")]
    pub action: Action,

    /// Capture a face frame and verify it against the signed-in user
    #[arg(long)]
    pub live: bool,

    /// Face-match threshold for --live (default from config)
    #[arg(long, requires = "live", value_parser = parse_threshold)]
    pub threshold: Option<f64>,

    #[command(flatten)]
    pub camera: CameraArgs,

    #[command(flatten)]
    pub position: PositionArgs,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// in | out
    #[arg(value_name = "ACTION")]
    pub action: Action,

    #[command(flatten)]
    pub camera: CameraArgs,

    #[command(flatten)]
    pub position: PositionArgs,
}

#[derive(Args, Debug)]
pub struct AdminArgs {
    #[command(subcommand)]
    pub command: AdminCommands,
}

#[derive(Subcommand, Debug)]
pub enum AdminCommands {
    /// Identify whoever is in front of the camera
    Recognize(RecognizeArgs),

    /// Capture a burst and add it to a user's face samples
    Enroll(EnrollArgs),
}

#[derive(Args, Debug)]
pub struct RecognizeArgs {
    /// Face-match threshold (default from config)
    #[arg(long, value_parser = parse_threshold)]
    pub threshold: Option<f64>,

    #[command(flatten)]
    pub camera: CameraArgs,
}

#[derive(Args, Debug)]
pub struct EnrollArgs {
    /// Email of the user to enroll
    pub email: String,

    /// Frames to capture (default from config)
    #[arg(long, short = 'n')]
    pub count: Option<usize>,

    /// Delay between frames in milliseconds (default from config)
    #[arg(long)]
    pub interval_ms: Option<u64>,

    #[command(flatten)]
    pub camera: CameraArgs,
}

#[derive(Args, Debug)]
pub struct SlotArgs {
    /// Local hour (0-23); defaults to now
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=23))]
    pub hour: Option<u32>,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force overwrite existing configuration
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Show configuration file path only
    #[arg(long)]
    pub path: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

fn parse_threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if THRESHOLD_RANGE.contains(&value) {
        Ok(value)
    } else {
        Err(format!("threshold must be between 0 and 1, got {s}"))
    }
}
