//! Structured logging for the attendance client.
//!
//! Logs always go to stderr so stdout stays clean for results and JSON.

use std::io::{self, IsTerminal};

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStyle {
    /// JSON lines, one event per line.
    Json,
    /// Colored multi-field output for terminals.
    Pretty,
    /// Plain single-line output for pipes and files.
    Compact,
}

impl LogStyle {
    /// Pick a style from the output mode and whether stderr is a TTY.
    #[must_use]
    pub const fn detect(robot_mode: bool, stderr_is_tty: bool) -> Self {
        if robot_mode {
            Self::Json
        } else if stderr_is_tty {
            Self::Pretty
        } else {
            Self::Compact
        }
    }
}

/// Filter used when `RUST_LOG` is not set.
///
/// `verbose`: 0 = info, 1 = debug, 2+ = trace. `quiet` wins over `verbose`.
/// HTTP internals stay at warn unless `RUST_LOG` says otherwise.
#[must_use]
pub const fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "attend=error";
    }
    match verbose {
        0 => "attend=info,reqwest=warn,hyper=warn",
        1 => "attend=debug,reqwest=warn,hyper=warn",
        _ => "attend=trace,reqwest=debug,hyper=warn",
    }
}

/// Initialize the tracing subscriber from CLI flags and environment.
///
/// # Environment Variables
///
/// * `RUST_LOG` - Override the default filter (e.g. "attend=debug,reqwest=trace")
///
/// # Output Behavior
///
/// | Mode | TTY | Output |
/// |------|-----|--------|
/// | Robot | any | JSON lines to stderr |
/// | Human | yes | Pretty colored output to stderr |
/// | Human | no | Compact plain output to stderr |
///
/// Calling it again after a subscriber is installed does nothing.
pub fn init_logging(robot_mode: bool, verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let base = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(io::stderr);

    let registry = tracing_subscriber::registry().with(filter);
    let result = match LogStyle::detect(robot_mode, io::stderr().is_terminal()) {
        LogStyle::Json => registry.with(base.json().with_target(true)).try_init(),
        LogStyle::Pretty => registry.with(base.with_target(false)).try_init(),
        LogStyle::Compact => registry
            .with(base.with_ansi(false).with_target(false).compact())
            .try_init(),
    };
    // Already initialized (tests, embedding applications): keep the existing one.
    drop(result);
}
