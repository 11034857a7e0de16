//! Submission orchestrator.
//!
//! Drives one attempt at a time through
//! `Idle -> Acquiring -> Submitting -> Succeeded | Failed -> Idle`:
//!
//! 1. Claim the single flight. Any call while not `Idle` is refused with
//!    [`PreconditionViolation::Busy`] before any device or network access.
//! 2. Check the mode's preconditions (credential, target, snapshot count).
//! 3. Acquire the position fix and the image concurrently.
//! 4. Build and send the request, classify the response.
//!
//! The state is published on a [`tokio::sync::watch`] channel; see
//! [`Orchestrator::subscribe`].

use std::cell::Cell;
use std::fmt;
use std::ops::RangeInclusive;

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard, watch};
use tracing::{debug, info, instrument, warn};

use crate::api::{
    ImagePart, ImageSource, SubmissionMode, VerificationBackend, VerificationRequest,
};
use crate::camera::{CameraController, VideoDevice};
use crate::error::{DeviceError, PreconditionViolation};
use crate::geo::{Geolocator, PositionReading, PositionSource};
use crate::identity::IdentityStore;
use crate::outcome::{AttemptOutcome, interpret};
use crate::slot::{self, Slot};

/// Default recognition threshold sent as `th`.
pub const DEFAULT_THRESHOLD: f64 = 0.35;

/// Accepted face-match thresholds.
pub const THRESHOLD_RANGE: RangeInclusive<f64> = 0.0..=1.0;

/// Visible orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrchestratorState {
    Idle,
    Acquiring,
    Submitting,
    Succeeded,
    Failed,
}

impl OrchestratorState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Acquiring => "acquiring",
            Self::Submitting => "submitting",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-attempt options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubmitOptions {
    /// Recognition threshold for modes that send one.
    pub threshold: f64,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// What one attempt produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitReport {
    pub mode: String,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
    /// The server refused the credential; the caller must end the session.
    pub credential_invalid: bool,
    /// Client-side slot guess, kiosk mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_slot: Option<Slot>,
}

impl SubmitReport {
    /// Slot to display: the server's if present, else the client guess.
    #[must_use]
    pub fn display_slot(&self) -> Option<Slot> {
        let server = match &self.outcome {
            AttemptOutcome::Success(s) => s.slot,
            _ => None,
        };
        Slot::resolve(server, self.client_slot)
    }
}

/// Returns the state to `Idle` however the attempt ends.
///
/// Receivers are not told about a claim that fails its preconditions.
struct Flight<'a> {
    state: &'a watch::Sender<OrchestratorState>,
    announced: Cell<bool>,
}

impl Flight<'_> {
    fn enter(&self, next: OrchestratorState) {
        debug!(state = %next, "State transition");
        self.announced.set(true);
        self.state.send_replace(next);
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        let announced = self.announced.get();
        self.state.send_if_modified(|s| {
            if *s == OrchestratorState::Idle {
                return false;
            }
            if announced {
                debug!(from = %s, "State transition to idle");
            }
            *s = OrchestratorState::Idle;
            announced
        });
    }
}

/// Coordinates camera, position, backend and identity for submissions.
pub struct Orchestrator<V, P, B, I>
where
    V: VideoDevice,
{
    camera: Mutex<CameraController<V>>,
    geolocator: Geolocator<P>,
    backend: B,
    identity: I,
    state: watch::Sender<OrchestratorState>,
}

impl<V, P, B, I> Orchestrator<V, P, B, I>
where
    V: VideoDevice,
    P: PositionSource,
    B: VerificationBackend,
    I: IdentityStore,
{
    pub fn new(camera: CameraController<V>, geolocator: Geolocator<P>, backend: B, identity: I) -> Self {
        let (state, _) = watch::channel(OrchestratorState::Idle);
        Self {
            camera: Mutex::new(camera),
            geolocator,
            backend,
            identity,
            state,
        }
    }

    #[must_use]
    pub fn state(&self) -> OrchestratorState {
        *self.state.borrow()
    }

    /// Receiver notified on every state transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<OrchestratorState> {
        self.state.subscribe()
    }

    /// Lock the camera for collection management.
    ///
    /// Release the guard before calling [`Self::submit`], which needs it.
    pub async fn camera(&self) -> MutexGuard<'_, CameraController<V>> {
        self.camera.lock().await
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }

    pub const fn identity(&self) -> &I {
        &self.identity
    }

    pub const fn geolocator(&self) -> &Geolocator<P> {
        &self.geolocator
    }

    /// Claim the flight without notifying receivers yet.
    fn claim(&self) -> Result<Flight<'_>, PreconditionViolation> {
        let mut busy = None;
        self.state.send_if_modified(|s| {
            if *s == OrchestratorState::Idle {
                *s = OrchestratorState::Acquiring;
            } else {
                busy = Some(*s);
            }
            false
        });
        match busy {
            Some(state) => {
                warn!(%state, "Submission refused: already in flight");
                Err(PreconditionViolation::Busy { state })
            }
            None => Ok(Flight {
                state: &self.state,
                announced: Cell::new(false),
            }),
        }
    }

    fn check_preconditions(
        &self,
        mode: &SubmissionMode,
        camera: &CameraController<V>,
    ) -> Result<Option<String>, PreconditionViolation> {
        let bearer = if mode.requires_credential() {
            let credential = self
                .identity
                .current_credential()
                .ok_or(PreconditionViolation::MissingCredential { mode: mode.name() })?;
            Some(credential.token)
        } else {
            None
        };

        if let SubmissionMode::AdminEnroll { email } = mode {
            if email.trim().is_empty() {
                return Err(PreconditionViolation::MissingTarget);
            }
        }

        let required = match mode.image_source() {
            ImageSource::None => 0,
            ImageSource::Fresh => {
                if !camera.is_started() {
                    return Err(PreconditionViolation::CameraNotStarted);
                }
                0
            }
            ImageSource::FirstInCollection => 1,
            ImageSource::Collection { min } => min,
        };
        if camera.len() < required {
            return Err(PreconditionViolation::InsufficientSnapshots {
                mode: mode.name(),
                required,
                actual: camera.len(),
            });
        }

        Ok(bearer)
    }

    /// Run one submission attempt.
    ///
    /// Returns `Err` only for caller-contract violations, in which case
    /// nothing was captured or sent. Every runtime failure is an
    /// [`AttemptOutcome`] in the report.
    #[instrument(skip(self, mode, options), fields(mode = %mode))]
    pub async fn submit(
        &self,
        mode: &SubmissionMode,
        options: &SubmitOptions,
    ) -> Result<SubmitReport, PreconditionViolation> {
        let flight = self.claim()?;
        let mut camera = self.camera.lock().await;
        let bearer = self.check_preconditions(mode, &camera)?;

        flight.enter(OrchestratorState::Acquiring);
        let client_slot = matches!(mode, SubmissionMode::Kiosk(_)).then(slot::current_slot);

        let (position, images) = tokio::join!(
            self.acquire_position(mode),
            Self::acquire_images(mode, &mut camera)
        );
        drop(camera);

        // Position failures take precedence over capture failures.
        let acquired = position.and_then(|p| images.map(|files| (p, files)));
        let (outcome, credential_invalid) = match acquired {
            Err(e) => {
                warn!(kind = ?e.kind, message = %e.message, "Acquisition failed");
                (AttemptOutcome::from(e), false)
            }
            Ok((position, files)) => {
                flight.enter(OrchestratorState::Submitting);
                let request = VerificationRequest::build(
                    mode,
                    position.as_ref(),
                    files,
                    bearer,
                    options.threshold,
                );
                info!(path = request.path, files = request.files.len(), "Submitting");
                match self.backend.send(&request).await {
                    Ok(raw) => {
                        let result = interpret(mode, raw.status, &raw.body);
                        (result.outcome, result.credential_invalid)
                    }
                    Err(e) => {
                        warn!(error = %e, "No response from backend");
                        (AttemptOutcome::from(e), false)
                    }
                }
            }
        };

        flight.enter(if outcome.is_success() {
            OrchestratorState::Succeeded
        } else {
            OrchestratorState::Failed
        });
        info!(outcome = outcome.label(), credential_invalid, "Attempt finished");

        Ok(SubmitReport {
            mode: mode.to_string(),
            outcome,
            credential_invalid,
            client_slot,
        })
    }

    async fn acquire_position(
        &self,
        mode: &SubmissionMode,
    ) -> Result<Option<PositionReading>, DeviceError> {
        if !mode.needs_position() {
            return Ok(None);
        }
        self.geolocator.acquire().await.map(Some)
    }

    async fn acquire_images(
        mode: &SubmissionMode,
        camera: &mut CameraController<V>,
    ) -> Result<Vec<ImagePart>, DeviceError> {
        match mode.image_source() {
            ImageSource::None => Ok(Vec::new()),
            ImageSource::Fresh => {
                let snapshot = camera.capture_frame().await?;
                Ok(vec![ImagePart::jpeg("file", snapshot.file_name(), snapshot.bytes())])
            }
            ImageSource::FirstInCollection => Ok(camera
                .first()
                .map(|s| vec![ImagePart::jpeg("file", s.file_name(), s.bytes())])
                .unwrap_or_default()),
            ImageSource::Collection { .. } => Ok(camera
                .snapshots()
                .iter()
                .enumerate()
                .map(|(i, s)| ImagePart::jpeg("files", format!("snap_{i}.jpg"), s.bytes()))
                .collect()),
        }
    }
}
