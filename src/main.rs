//! attend - attendance client with face capture and position verification.
//!
//! Provides both human-friendly and agent-friendly (robot mode) interfaces.
#![forbid(unsafe_code)]

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use chrono::{Local, Timelike, Utc};
use clap::{CommandFactory, Parser};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info, warn};

use attend::api::{self, HttpBackend, SubmissionMode};
use attend::camera::{CameraController, ImageFileCamera, Snapshot, SnapshotInfo};
use attend::cli::{self, AdminCommands, CameraArgs, Cli, Commands};
use attend::config::{self, ClientConfig};
use attend::error::{AttendError, DeviceError, PreconditionViolation, Result};
use attend::geo::{self, Geolocator, PositionReading, StaticPositionSource};
use attend::identity::{SessionFile, StoredSession, display_name};
use attend::logging;
use attend::orchestrator::{Orchestrator, OrchestratorState, SubmitOptions, SubmitReport};
use attend::output::{BuildInfo, Output, SessionView, SlotView};
use attend::slot;

/// Build information embedded at compile time.
mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn git_sha() -> &'static str {
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
    }

    pub fn git_dirty() -> bool {
        matches!(option_env!("VERGEN_GIT_DIRTY"), Some("true"))
    }

    pub fn build_timestamp() -> &'static str {
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
    }

    pub fn rustc_semver() -> &'static str {
        option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown")
    }

    pub fn target() -> &'static str {
        option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown")
    }
}

/// Exit status when an attempt ran but did not succeed.
const ATTEMPT_FAILED: u8 = 2;

type CliOrchestrator<'s> =
    Orchestrator<ImageFileCamera, StaticPositionSource, HttpBackend, &'s SessionFile>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.use_json(), cli.verbose, cli.quiet);

    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let output = cli.output_mode().into_output();
    match run(&cli, output.as_ref()).await {
        Ok(code) => code,
        Err(e) => {
            output.error(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, out: &dyn Output) -> Result<ExitCode> {
    match &cli.command {
        None => print_quick_start(cli),
        Some(Commands::Login(args)) => cmd_login(cli, out, args).await,
        Some(Commands::Logout) => cmd_logout(cli, out),
        Some(Commands::Whoami) => cmd_whoami(cli, out),
        Some(Commands::Clock(args)) => cmd_clock(cli, out, args).await,
        Some(Commands::Scan(args)) => cmd_scan(cli, out, args).await,
        Some(Commands::Admin(args)) => match &args.command {
            AdminCommands::Recognize(a) => cmd_recognize(cli, out, a).await,
            AdminCommands::Enroll(a) => cmd_enroll(cli, out, a).await,
        },
        Some(Commands::Slot(args)) => cmd_slot(out, args),
        Some(Commands::Init(args)) => cmd_init(cli, out, args),
        Some(Commands::Config(args)) => cmd_config(cli, out, args),
        Some(Commands::Version) => cmd_version(out),
        Some(Commands::Completions(args)) => cmd_completions(args),
    }
}

// === Quick Start (Robot Mode Optimized) ===

/// Prints quick-start help optimized for both humans and agents.
#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn print_quick_start(cli: &Cli) -> Result<ExitCode> {
    if cli.use_json() {
        print_robot_quick_start();
    } else {
        print_human_quick_start();
    }
    Ok(ExitCode::SUCCESS)
}

fn print_robot_quick_start() {
    let help = RobotQuickStart {
        tool: "attend",
        version: build_info::VERSION,
        description: "Attendance client: face capture plus position fix, verified by the server",
        session: RobotSession {
            login: "attend login <EMAIL> --password <PASSWORD>",
            whoami: "attend whoami --robot",
            logout: "attend logout",
        },
        attendance: RobotAttendance {
            clock: "attend clock in|out --lat <LAT> --lng <LNG>",
            clock_live: "attend clock in|out --live --camera <PATH>",
            kiosk: "attend scan in|out --camera <PATH>",
            slot: "attend slot --hour <0-23>",
        },
        admin: RobotAdmin {
            recognize: "attend admin recognize --camera <PATH>",
            enroll: "attend admin enroll <EMAIL> --count 5 --camera <PATH>",
        },
        output_modes: OutputModes {
            human: "--format=text (default)",
            robot: "--robot or --format=json",
            compact: "--format=json-compact",
        },
        exit_codes: ExitCodes {
            success: 0,
            error: 1,
            attempt_failed: ATTEMPT_FAILED,
        },
    };

    match serde_json::to_string_pretty(&help) {
        Ok(json) => println!("{json}"),
        Err(e) => warn!(error = %e, "Failed to serialize quick start"),
    }
}

fn print_human_quick_start() {
    println!(
        "{} {} - attendance client\n",
        style("attend").bold().cyan(),
        build_info::VERSION
    );

    println!("{}", style("QUICK START").bold().underlined());
    println!();
    println!("  {}  Sign in", style("attend login you@example.com").green());
    println!("  {}  Clock in (position only)", style("attend clock in").green());
    println!(
        "  {}  Clock out with a face frame",
        style("attend clock out --live --camera ~/frames").green()
    );
    println!("  {}  Kiosk clock in", style("attend scan in").green());
    println!("  {}  Current slot", style("attend slot").green());
    println!();

    println!("{}", style("ADMIN").bold().underlined());
    println!();
    println!("  {}  Identify a face", style("attend admin recognize").green());
    println!(
        "  {}  Enroll face samples",
        style("attend admin enroll you@example.com").green()
    );
    println!();

    println!("{}", style("ROBOT MODE (for agents)").bold().underlined());
    println!();
    println!("  {}  JSON output", style("attend --robot <command>").cyan());
    println!("  {}  Quick-start JSON", style("attend --robot").cyan());
    println!();

    println!("Run {} for full help", style("attend --help").yellow());
}

// === Robot Mode JSON Structures ===

#[derive(Serialize)]
struct RobotQuickStart {
    tool: &'static str,
    version: &'static str,
    description: &'static str,
    session: RobotSession,
    attendance: RobotAttendance,
    admin: RobotAdmin,
    output_modes: OutputModes,
    exit_codes: ExitCodes,
}

#[derive(Serialize)]
struct RobotSession {
    login: &'static str,
    whoami: &'static str,
    logout: &'static str,
}

#[derive(Serialize)]
struct RobotAttendance {
    clock: &'static str,
    clock_live: &'static str,
    kiosk: &'static str,
    slot: &'static str,
}

#[derive(Serialize)]
struct RobotAdmin {
    recognize: &'static str,
    enroll: &'static str,
}

#[derive(Serialize)]
struct OutputModes {
    human: &'static str,
    robot: &'static str,
    compact: &'static str,
}

#[derive(Serialize)]
struct ExitCodes {
    success: u8,
    error: u8,
    attempt_failed: u8,
}

// === Session Commands ===

async fn cmd_login(cli: &Cli, out: &dyn Output, args: &cli::LoginArgs) -> Result<ExitCode> {
    let config = ClientConfig::load(cli.config.as_deref())?;
    let session = session_file(cli)?;
    let password = match &args.password {
        Some(p) => p.clone(),
        None => prompt_password()?,
    };

    let backend = HttpBackend::new(&config.base_url, config.request_timeout())?;
    let body = api::login(&backend, &args.email, &password).await?;

    let stored = StoredSession {
        access_token: body.access_token,
        role: body.role,
        name: body.name,
        email: body.email.or_else(|| Some(args.email.clone())),
        saved_at: Utc::now(),
    };
    session.save(&stored)?;
    out.logged_in(&session_view(&stored, session.path()));
    Ok(ExitCode::SUCCESS)
}

fn prompt_password() -> Result<String> {
    let term = console::Term::stderr();
    if !term.is_term() {
        return Err(AttendError::Other(
            "Password required: pass --password or set ATTEND_PASSWORD".to_string(),
        ));
    }
    term.write_str("Password: ")?;
    Ok(term.read_secure_line()?)
}

fn cmd_logout(cli: &Cli, out: &dyn Output) -> Result<ExitCode> {
    let had_session = session_file(cli)?.clear()?;
    out.logged_out(had_session);
    Ok(ExitCode::SUCCESS)
}

fn cmd_whoami(cli: &Cli, out: &dyn Output) -> Result<ExitCode> {
    let session = session_file(cli)?;
    let stored = match session.load()? {
        None => return Err(AttendError::NotLoggedIn),
        Some(s) if s.is_expired() => return Err(AttendError::SessionExpired),
        Some(s) => s,
    };
    out.whoami(&session_view(&stored, session.path()));
    Ok(ExitCode::SUCCESS)
}

// === Attendance Commands ===

async fn cmd_clock(cli: &Cli, out: &dyn Output, args: &cli::ClockArgs) -> Result<ExitCode> {
    let mode = if args.live {
        SubmissionMode::LiveCapture(args.action)
    } else {
        SubmissionMode::Manual(args.action)
    };
    let config = ClientConfig::load(cli.config.as_deref())?;
    let session = session_file(cli)?;
    let stored = require_session(&session, &mode)?;

    let source = camera_source(&args.camera, &config, args.live)?;
    let orchestrator = build_orchestrator(&config, &session, source, args.position.reading())?;
    if args.live {
        orchestrator.camera().await.start().await?;
    }

    let options = SubmitOptions {
        threshold: args.threshold.unwrap_or(config.recognition.threshold),
    };
    let report = submit_with_progress(cli, &orchestrator, &mode, &options).await?;
    finish_attempt(out, &session, stored.as_ref(), &report)
}

async fn cmd_scan(cli: &Cli, out: &dyn Output, args: &cli::ScanArgs) -> Result<ExitCode> {
    let mode = SubmissionMode::Kiosk(args.action);
    let config = ClientConfig::load(cli.config.as_deref())?;
    let session = session_file(cli)?;

    let source = camera_source(&args.camera, &config, true)?;
    let orchestrator = build_orchestrator(&config, &session, source, args.position.reading())?;
    orchestrator.camera().await.start().await?;

    let options = SubmitOptions {
        threshold: config.recognition.threshold,
    };
    let report = submit_with_progress(cli, &orchestrator, &mode, &options).await?;
    finish_attempt(out, &session, None, &report)
}

async fn cmd_recognize(cli: &Cli, out: &dyn Output, args: &cli::RecognizeArgs) -> Result<ExitCode> {
    let mode = SubmissionMode::AdminRecognize;
    let config = ClientConfig::load(cli.config.as_deref())?;
    let session = session_file(cli)?;
    let stored = require_session(&session, &mode)?;

    let source = camera_source(&args.camera, &config, true)?;
    let orchestrator = build_orchestrator(&config, &session, source, None)?;
    {
        let mut camera = orchestrator.camera().await;
        camera.start().await?;
        camera.clear_collection();
        camera.add_to_collection().await?;
    }

    let options = SubmitOptions {
        threshold: args.threshold.unwrap_or(config.recognition.threshold),
    };
    let report = submit_with_progress(cli, &orchestrator, &mode, &options).await?;
    finish_attempt(out, &session, stored.as_ref(), &report)
}

async fn cmd_enroll(cli: &Cli, out: &dyn Output, args: &cli::EnrollArgs) -> Result<ExitCode> {
    let mode = SubmissionMode::AdminEnroll {
        email: args.email.clone(),
    };
    let config = ClientConfig::load(cli.config.as_deref())?;
    let session = session_file(cli)?;
    let stored = require_session(&session, &mode)?;

    let count = args.count.unwrap_or(config.burst.count);
    let interval = args
        .interval_ms
        .map_or_else(|| config.burst_interval(), Duration::from_millis);

    let source = camera_source(&args.camera, &config, true)?;
    let orchestrator = build_orchestrator(&config, &session, source, None)?;

    let snapshots: Vec<SnapshotInfo> = {
        let mut camera = orchestrator.camera().await;
        camera.start().await?;

        let bar = if show_progress(cli) {
            ProgressBar::new(count as u64)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(bar_style) = ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} {msg}") {
            bar.set_style(bar_style);
        }
        bar.set_message("capturing");

        let burst = camera
            .capture_burst_with(count, interval, |i, snap| {
                bar.set_position(i as u64 + 1);
                bar.set_message(snap.digest().get(..8).unwrap_or_default().to_string());
            })
            .await;
        match burst {
            Ok(_) => bar.finish_and_clear(),
            Err(failure) => {
                bar.abandon_with_message(failure.to_string());
                return Err(AttendError::Device(failure.error));
            }
        }
        camera.snapshots().iter().map(Snapshot::info).collect()
    };
    out.snapshots(&snapshots);

    let report = submit_with_progress(cli, &orchestrator, &mode, &SubmitOptions::default()).await?;
    if report.outcome.is_success() {
        orchestrator.camera().await.clear_collection();
    }
    finish_attempt(out, &session, stored.as_ref(), &report)
}

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn cmd_slot(out: &dyn Output, args: &cli::SlotArgs) -> Result<ExitCode> {
    let hour = args.hour.unwrap_or_else(|| Local::now().hour());
    out.slot(&SlotView {
        hour,
        slot: slot::derive_slot(hour),
    });
    Ok(ExitCode::SUCCESS)
}

// === Configuration Commands ===

fn cmd_init(cli: &Cli, out: &dyn Output, args: &cli::InitArgs) -> Result<ExitCode> {
    let path = config_path(cli)?;
    if path.exists() && !args.force {
        return Err(AttendError::Other(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    config::save_config(&ClientConfig::default(), &path)?;
    out.config_written(&path);
    Ok(ExitCode::SUCCESS)
}

fn cmd_config(cli: &Cli, out: &dyn Output, args: &cli::ConfigArgs) -> Result<ExitCode> {
    let path = config_path(cli)?;
    if args.path && !cli.use_json() {
        println!("{}", path.display());
        return Ok(ExitCode::SUCCESS);
    }
    let exists = path.exists();
    let config = if exists {
        ClientConfig::load(Some(&path))?
    } else {
        let mut defaults = ClientConfig::default();
        defaults.apply_env_override(std::env::var(config::API_URL_ENV).ok())?;
        defaults
    };
    out.config(&config, &path, exists);
    Ok(ExitCode::SUCCESS)
}

// === Utilities ===

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn cmd_version(out: &dyn Output) -> Result<ExitCode> {
    out.version_info(&BuildInfo {
        version: build_info::VERSION,
        git_sha: build_info::git_sha(),
        git_dirty: build_info::git_dirty(),
        build_timestamp: build_info::build_timestamp(),
        rustc_version: build_info::rustc_semver(),
        target: build_info::target(),
    });
    Ok(ExitCode::SUCCESS)
}

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn cmd_completions(args: &cli::CompletionsArgs) -> Result<ExitCode> {
    clap_complete::generate(args.shell, &mut Cli::command(), "attend", &mut io::stdout());
    Ok(ExitCode::SUCCESS)
}

// === Helpers ===

fn session_file(cli: &Cli) -> Result<SessionFile> {
    let path = match &cli.session {
        Some(p) => config::expand_tilde(p)?,
        None => SessionFile::default_path()?,
    };
    Ok(SessionFile::new(path))
}

fn config_path(cli: &Cli) -> Result<PathBuf> {
    cli.config
        .as_deref()
        .map_or_else(ClientConfig::default_path, config::expand_tilde)
}

fn session_view(stored: &StoredSession, path: &Path) -> SessionView {
    let claims = stored.claims();
    SessionView {
        name: display_name(Some(&stored.name), claims.as_ref()),
        role: stored.role.clone(),
        email: stored.email.clone(),
        username: claims.as_ref().and_then(|c| c.username.clone()),
        expires_at: claims.as_ref().and_then(|c| c.expires_at()),
        session_file: path.display().to_string(),
    }
}

/// Stored session for modes that need one, with friendlier errors than the
/// orchestrator's precondition check.
fn require_session(session: &SessionFile, mode: &SubmissionMode) -> Result<Option<StoredSession>> {
    let stored = session.load()?;
    if !mode.requires_credential() {
        return Ok(stored);
    }
    match stored {
        None => Err(AttendError::NotLoggedIn),
        Some(s) if s.is_expired() => Err(AttendError::SessionExpired),
        Some(s) => {
            if matches!(mode, SubmissionMode::AdminRecognize | SubmissionMode::AdminEnroll { .. })
                && !s.credential().is_admin()
            {
                warn!(role = %s.role, "Admin operation with a non-admin session; the server may refuse it");
            }
            Ok(Some(s))
        }
    }
}

/// Frame source from the flag or the config file.
fn camera_source(args: &CameraArgs, config: &ClientConfig, required: bool) -> Result<PathBuf> {
    match args.camera.as_deref().or(config.camera.source.as_deref()) {
        Some(p) => config::expand_tilde(p),
        None if required => Err(AttendError::Device(DeviceError::camera_unavailable(
            "no camera source configured",
        ))),
        None => Ok(PathBuf::new()),
    }
}

fn build_orchestrator<'s>(
    config: &ClientConfig,
    session: &'s SessionFile,
    camera_source: PathBuf,
    position_flags: Option<PositionReading>,
) -> Result<CliOrchestrator<'s>> {
    let backend = HttpBackend::new(&config.base_url, config.request_timeout())?;
    let secure = geo::is_secure_context(backend.base_url());
    if !secure {
        warn!(base_url = %config.base_url, "Backend is neither HTTPS nor loopback");
    }

    let position = position_flags.or_else(|| config.position.map(PositionReading::from));
    debug!(?position, "Position source configured");
    let geolocator = Geolocator::new(StaticPositionSource::new(position), config.geolocation_timeout())
        .with_high_accuracy(config.geolocation.high_accuracy)
        .with_secure_context(secure);

    let camera = CameraController::new(
        ImageFileCamera::new(camera_source),
        config.camera.capture_settings(),
    );
    Ok(Orchestrator::new(camera, geolocator, backend, session))
}

fn show_progress(cli: &Cli) -> bool {
    !cli.use_json() && !cli.quiet
}

const fn state_message(state: OrchestratorState) -> &'static str {
    match state {
        OrchestratorState::Acquiring => "Acquiring position and frame...",
        OrchestratorState::Submitting => "Verifying with server...",
        OrchestratorState::Idle | OrchestratorState::Succeeded | OrchestratorState::Failed => "",
    }
}

/// Run the attempt while a spinner follows the published state.
async fn submit_with_progress(
    cli: &Cli,
    orchestrator: &CliOrchestrator<'_>,
    mode: &SubmissionMode,
    options: &SubmitOptions,
) -> std::result::Result<SubmitReport, PreconditionViolation> {
    let spinner = if show_progress(cli) {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::hidden()
    };
    spinner.enable_steady_tick(Duration::from_millis(100));

    let mut states = orchestrator.subscribe();
    let submit = orchestrator.submit(mode, options);
    tokio::pin!(submit);

    let result = loop {
        tokio::select! {
            result = &mut submit => break result,
            Ok(()) = states.changed() => {
                let state = *states.borrow_and_update();
                debug!(%state, "State changed");
                spinner.set_message(state_message(state));
            }
        }
    };
    spinner.finish_and_clear();
    orchestrator.camera().await.stop();
    result
}

fn finish_attempt(
    out: &dyn Output,
    session: &SessionFile,
    stored: Option<&StoredSession>,
    report: &SubmitReport,
) -> Result<ExitCode> {
    if report.credential_invalid {
        session.clear()?;
        out.warning("The server rejected the stored session; sign in again with: attend login <email>");
    }
    info!(mode = %report.mode, outcome = report.outcome.label(), "Attempt finished");

    let name = stored.map(|s| display_name(Some(&s.name), s.claims().as_ref()));
    out.attempt(report, name.as_deref());
    Ok(if report.outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(ATTEMPT_FAILED)
    })
}
