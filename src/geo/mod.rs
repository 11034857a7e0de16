//! One-shot device position acquisition.
//!
//! A [`PositionSource`] is the platform side (GPS daemon, browser bridge,
//! fixed kiosk coordinates, mocks). [`Geolocator`] wraps a source with an
//! independent timeout and normalizes every failure into a [`DeviceError`].

mod fixed;
pub mod mock;

pub use fixed::StaticPositionSource;

use std::net::IpAddr;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::DeviceError;

/// A single position fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionReading {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius in meters, if the platform reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_meters: Option<f64>,
}

impl PositionReading {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64, accuracy_meters: Option<f64>) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_meters,
        }
    }

    fn is_plausible(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Options handed to the platform for one fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRequest {
    pub high_accuracy: bool,
    /// Oldest cached fix the platform may return. Always zero: staleness
    /// invalidates the server-side geofence check.
    pub maximum_age: Duration,
    /// The platform's own timeout. [`Geolocator`] enforces it again.
    pub timeout: Duration,
}

/// Platform error codes, as reported by the position API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionFaultCode {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Unsupported,
    Other,
}

impl PositionFaultCode {
    /// Map the numeric codes used by web-style position APIs (1, 2, 3).
    #[must_use]
    pub const fn from_code(code: u16) -> Self {
        match code {
            1 => Self::PermissionDenied,
            2 => Self::PositionUnavailable,
            3 => Self::Timeout,
            _ => Self::Other,
        }
    }
}

/// A structured failure reported by a [`PositionSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionFault {
    pub code: PositionFaultCode,
    pub message: String,
}

impl PositionFault {
    pub fn new(code: PositionFaultCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<PositionFault> for DeviceError {
    fn from(fault: PositionFault) -> Self {
        match fault.code {
            PositionFaultCode::PermissionDenied => Self::permission_denied(fault.message),
            PositionFaultCode::Timeout => Self::timeout(fault.message),
            PositionFaultCode::PositionUnavailable
            | PositionFaultCode::Unsupported
            | PositionFaultCode::Other => Self::position_unavailable(fault.message),
        }
    }
}

/// Platform position provider.
#[allow(async_fn_in_trait)]
pub trait PositionSource {
    /// Request one fix. Implementations may ignore `request.timeout`;
    /// the caller enforces it.
    async fn locate(&self, request: &PositionRequest) -> Result<PositionReading, PositionFault>;
}

impl<S: PositionSource + ?Sized> PositionSource for &S {
    async fn locate(&self, request: &PositionRequest) -> Result<PositionReading, PositionFault> {
        (**self).locate(request).await
    }
}

/// Position acquirer with a hard timeout and error normalization.
#[derive(Debug)]
pub struct Geolocator<S> {
    source: S,
    timeout: Duration,
    high_accuracy: bool,
    secure_context: bool,
}

impl<S: PositionSource> Geolocator<S> {
    pub const fn new(source: S, timeout: Duration) -> Self {
        Self {
            source,
            timeout,
            high_accuracy: true,
            secure_context: true,
        }
    }

    /// Record whether requests travel over a secure or loopback transport.
    ///
    /// An insecure context does not block acquisition, it only logs an
    /// advisory on each request.
    #[must_use]
    pub const fn with_secure_context(mut self, secure: bool) -> Self {
        self.secure_context = secure;
        self
    }

    #[must_use]
    pub const fn with_high_accuracy(mut self, high_accuracy: bool) -> Self {
        self.high_accuracy = high_accuracy;
        self
    }

    /// Default timeout used by [`Self::acquire`].
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Acquire a fresh fix with the configured timeout.
    pub async fn acquire(&self) -> Result<PositionReading, DeviceError> {
        self.acquire_position(self.timeout).await
    }

    /// Acquire a fresh fix, failing with `Timeout` once `timeout` elapses
    /// regardless of what the platform does.
    #[instrument(skip(self), fields(timeout_ms = timeout.as_millis()))]
    pub async fn acquire_position(&self, timeout: Duration) -> Result<PositionReading, DeviceError> {
        if !self.secure_context {
            warn!("Position requested outside a secure or loopback context; the server may refuse it");
        }

        let request = PositionRequest {
            high_accuracy: self.high_accuracy,
            maximum_age: Duration::ZERO,
            timeout,
        };

        let reading = match tokio::time::timeout(timeout, self.source.locate(&request)).await {
            Err(_) => {
                warn!("Position fix timed out");
                return Err(DeviceError::timeout(format!(
                    "no position fix within {} ms",
                    timeout.as_millis()
                )));
            }
            Ok(Err(fault)) => {
                warn!(code = ?fault.code, message = %fault.message, "Position source failed");
                return Err(fault.into());
            }
            Ok(Ok(reading)) => reading,
        };

        if !reading.is_plausible() {
            warn!(?reading, "Position source returned out-of-range coordinates");
            return Err(DeviceError::position_unavailable(
                "position source returned invalid coordinates",
            ));
        }

        debug!(
            latitude = reading.latitude,
            longitude = reading.longitude,
            accuracy = ?reading.accuracy_meters,
            "Position acquired"
        );
        Ok(reading)
    }
}

/// True when `url` uses TLS or points at a loopback host.
#[must_use]
pub fn is_secure_context(url: &Url) -> bool {
    if url.scheme() == "https" {
        return true;
    }
    match url.host_str() {
        Some("localhost") => true,
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .is_ok_and(|ip| ip.is_loopback()),
        None => false,
    }
}
