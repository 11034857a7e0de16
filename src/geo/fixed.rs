//! Fixed-coordinate position source for stationary kiosks.

use tracing::trace;

use super::{PositionFault, PositionFaultCode, PositionReading, PositionRequest, PositionSource};

/// Serves configured coordinates, or reports the position as unavailable
/// when none were configured.
#[derive(Debug, Clone, Default)]
pub struct StaticPositionSource {
    reading: Option<PositionReading>,
}

impl StaticPositionSource {
    #[must_use]
    pub const fn new(reading: Option<PositionReading>) -> Self {
        Self { reading }
    }

    #[must_use]
    pub const fn at(latitude: f64, longitude: f64, accuracy_meters: Option<f64>) -> Self {
        Self::new(Some(PositionReading::new(latitude, longitude, accuracy_meters)))
    }

    pub const fn reading(&self) -> Option<&PositionReading> {
        self.reading.as_ref()
    }
}

impl PositionSource for StaticPositionSource {
    async fn locate(&self, request: &PositionRequest) -> Result<PositionReading, PositionFault> {
        trace!(?request, configured = self.reading.is_some(), "Static position lookup");
        self.reading.ok_or_else(|| {
            PositionFault::new(
                PositionFaultCode::PositionUnavailable,
                "no position configured for this terminal",
            )
        })
    }
}
