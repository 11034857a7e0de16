//! Client configuration.
//!
//! Loaded from YAML or TOML (by extension). Every section has defaults, so a
//! partial file, or none at all, is valid.
//!
//! # Example TOML
//!
//! ```toml
//! base_url = "https://hr.example.com"
//!
//! [camera]
//! source = "~/frames"
//!
//! [recognition]
//! threshold = 0.4
//!
//! [position]
//! latitude = 13.7563
//! longitude = 100.5018
//! accuracy = 5.0
//! ```

mod loader;
mod path;

pub use loader::{ConfigFormat, load_config, load_config_from_str, save_config};
pub use path::{expand_tilde, home_dir, resolve_path};

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::camera::CaptureSettings;
use crate::error::{AttendError, Result};
use crate::geo::PositionReading;
use crate::image_ops::{DEFAULT_JPEG_QUALITY, DEFAULT_MAX_WIDTH};
use crate::orchestrator::{DEFAULT_THRESHOLD, THRESHOLD_RANGE};

/// Environment variable overriding `base_url`.
pub const API_URL_ENV: &str = "ATTEND_API_URL";

/// Backend URL used when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    pub timeout_ms: u64,
    pub high_accuracy: bool,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            high_accuracy: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Image file or directory of frames.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    pub max_width: u32,
    pub jpeg_quality: u8,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            source: None,
            max_width: DEFAULT_MAX_WIDTH,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl CameraConfig {
    #[must_use]
    pub const fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            max_width: self.max_width,
            jpeg_quality: self.jpeg_quality,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Face-match threshold sent as `th`.
    pub threshold: f64,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurstConfig {
    pub count: usize,
    pub interval_ms: u64,
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            count: 5,
            interval_ms: 600,
        }
    }
}

/// Fixed coordinates for a stationary terminal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionConfig {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl From<PositionConfig> for PositionReading {
    fn from(p: PositionConfig) -> Self {
        Self::new(p.latitude, p.longitude, p.accuracy)
    }
}

/// Complete client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
    pub geolocation: GeolocationConfig,
    pub camera: CameraConfig,
    pub recognition: RecognitionConfig,
    pub burst: BurstConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<PositionConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: 30_000,
            geolocation: GeolocationConfig::default(),
            camera: CameraConfig::default(),
            recognition: RecognitionConfig::default(),
            burst: BurstConfig::default(),
            position: None,
        }
    }
}

impl ClientConfig {
    /// `<config_dir>/attend/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join("attend").join("config.toml"))
            .ok_or_else(|| {
                AttendError::ConfigInvalid("Could not determine config directory".to_string())
            })
    }

    /// Load from `path`, or from the default location.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    /// `ATTEND_API_URL` overrides `base_url` either way.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => load_config(expand_tilde(p)?)?,
            None => {
                let default = Self::default_path()?;
                if default.exists() {
                    load_config(&default)?
                } else {
                    debug!(path = %default.display(), "No config file, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_env_override(std::env::var(API_URL_ENV).ok())?;
        Ok(config)
    }

    /// Replace `base_url` with a non-empty override and revalidate.
    pub fn apply_env_override(&mut self, base_url: Option<String>) -> Result<()> {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            info!(%url, "Using {API_URL_ENV} override");
            self.base_url = url;
            self.validate()?;
        }
        Ok(())
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(AttendError::ConfigInvalid(msg));

        match Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => return invalid(format!("base_url: unsupported scheme '{}'", url.scheme())),
            Err(e) => return invalid(format!("base_url '{}': {e}", self.base_url)),
        }
        if self.request_timeout_ms == 0 {
            return invalid("request_timeout_ms must be greater than 0".to_string());
        }
        if self.geolocation.timeout_ms == 0 {
            return invalid("geolocation.timeout_ms must be greater than 0".to_string());
        }
        if self.camera.max_width == 0 {
            return invalid("camera.max_width must be greater than 0".to_string());
        }
        if !(1..=100).contains(&self.camera.jpeg_quality) {
            return invalid(format!(
                "camera.jpeg_quality must be 1-100, got {}",
                self.camera.jpeg_quality
            ));
        }
        if !THRESHOLD_RANGE.contains(&self.recognition.threshold) {
            return invalid(format!(
                "recognition.threshold must be 0-1, got {}",
                self.recognition.threshold
            ));
        }
        if self.burst.count == 0 {
            return invalid("burst.count must be at least 1".to_string());
        }
        if let Some(p) = &self.position {
            if !(-90.0..=90.0).contains(&p.latitude) || !(-180.0..=180.0).contains(&p.longitude) {
                return invalid(format!(
                    "position ({}, {}) is out of range",
                    p.latitude, p.longitude
                ));
            }
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base_dir: &Path) -> Result<()> {
        if let Some(source) = &self.camera.source {
            self.camera.source = Some(resolve_path(source, base_dir)?);
        }
        Ok(())
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    #[must_use]
    pub const fn geolocation_timeout(&self) -> Duration {
        Duration::from_millis(self.geolocation.timeout_ms)
    }

    #[must_use]
    pub const fn burst_interval(&self) -> Duration {
        Duration::from_millis(self.burst.interval_ms)
    }
}
