//! Path resolution for configuration values.
//!
//! Supports absolute paths, paths relative to the config file, and "~" home
//! directory expansion.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::{AttendError, Result};

/// Resolve a path found in a config file.
///
/// Resolution rules:
/// 1. Paths starting with `~`: expanded to the home directory
/// 2. Absolute paths: used as-is
/// 3. Relative paths: resolved against `base_dir`
pub fn resolve_path(path: &Path, base_dir: &Path) -> Result<PathBuf> {
    trace!(path = %path.display(), base_dir = %base_dir.display(), "Resolving path");

    if let Some(expanded) = expand_home(path)? {
        return Ok(expanded);
    }
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let resolved = base_dir.join(path);
    debug!(original = %path.display(), resolved = %resolved.display(), "Resolved relative path");
    Ok(resolved)
}

/// Expand a leading `~` in a command-line path; other paths pass through.
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    Ok(expand_home(path)?.unwrap_or_else(|| path.to_path_buf()))
}

fn expand_home(path: &Path) -> Result<Option<PathBuf>> {
    let path_str = path.to_string_lossy();
    if path_str != "~" && !path_str.starts_with("~/") {
        return Ok(None);
    }
    let home = home_dir()?;
    let resolved = match path_str.strip_prefix("~/") {
        Some(rest) if !rest.is_empty() => home.join(rest),
        _ => home,
    };
    debug!(original = %path.display(), resolved = %resolved.display(), "Expanded home directory path");
    Ok(Some(resolved))
}

/// Resolve the user's home directory (cross-platform).
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| AttendError::ConfigInvalid("Could not determine home directory".to_string()))
}
