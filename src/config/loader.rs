//! Loading and saving the client configuration as YAML or TOML.

use std::path::Path;

use tracing::{debug, info, instrument, trace};

use super::ClientConfig;
use crate::error::{AttendError, Result};

/// Configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format (.yaml, .yml).
    Yaml,
    /// TOML format (.toml).
    Toml,
}

impl ConfigFormat {
    /// Detect format from file extension.
    ///
    /// Returns `None` if the extension is not recognized.
    #[must_use]
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        trace!(extension = %ext, "Detecting config format from extension");
        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    /// Get the canonical file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Toml => "toml",
        }
    }
}

fn format_for(path: &Path) -> Result<ConfigFormat> {
    ConfigFormat::from_extension(path).ok_or_else(|| {
        AttendError::ConfigParse(format!(
            "Unknown config format for '{}': expected .yaml, .yml, or .toml",
            path.display()
        ))
    })
}

/// Load and validate a configuration file.
///
/// Relative `camera.source` paths are resolved against the file's directory.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read
/// - The format cannot be detected from the extension
/// - The file content cannot be parsed
/// - Validation fails
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ClientConfig> {
    let path = path.as_ref();
    info!("Loading configuration file");

    let format = format_for(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AttendError::ConfigNotFound {
                path: path.display().to_string(),
            }
        } else {
            AttendError::Io(e)
        }
    })?;
    debug!(bytes = content.len(), ?format, "Read config file");

    let mut config = load_config_from_str(&content, format)?;
    if let Some(dir) = path.parent() {
        config.resolve_paths(dir)?;
    }
    Ok(config)
}

/// Parse and validate configuration content.
///
/// # Errors
///
/// Returns an error if parsing or validation fails.
#[instrument(skip(content), fields(format = ?format, content_len = content.len()))]
pub fn load_config_from_str(content: &str, format: ConfigFormat) -> Result<ClientConfig> {
    let config: ClientConfig = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content)
            .map_err(|e| AttendError::ConfigParse(format!("YAML: {e}")))?,
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| AttendError::ConfigParse(format!("TOML: {e}")))?
        }
    };

    config.validate()?;
    debug!(base_url = %config.base_url, "Configuration parsed and validated");
    Ok(config)
}

/// Write a configuration file, format chosen by extension.
///
/// Missing parent directories are created.
#[instrument(skip(config), fields(path = %path.as_ref().display()))]
pub fn save_config<P: AsRef<Path>>(config: &ClientConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    let format = format_for(path)?;

    let content = match format {
        ConfigFormat::Yaml => serde_yaml::to_string(config)
            .map_err(|e| AttendError::ConfigParse(format!("YAML: {e}")))?,
        ConfigFormat::Toml => toml::to_string_pretty(config)
            .map_err(|e| AttendError::ConfigParse(format!("TOML: {e}")))?,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    info!("Configuration saved");
    Ok(())
}
