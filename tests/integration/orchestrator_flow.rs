//! Full submission attempts through the orchestrator.

use std::time::Duration;

use attend::api::mock::MockBackend;
use attend::api::{Action, SubmissionMode};
use attend::camera::mock::{MockVideoDevice, VideoOp};
use attend::camera::{CameraController, CaptureSettings, ImageFileCamera, VideoDevice};
use attend::error::DeviceErrorKind;
use attend::geo::mock::MockPositionSource;
use attend::geo::{Geolocator, PositionFaultCode, PositionReading, PositionSource};
use attend::identity::{Credential, IdentityStore, MemoryIdentity};
use attend::orchestrator::{Orchestrator, OrchestratorState, SubmitOptions};
use attend::outcome::AttemptOutcome;
use attend::slot::Slot;

use crate::common::fixtures::write_frames;
use crate::common::init_test_logging;

fn build<V: VideoDevice, P: PositionSource, I: IdentityStore>(
    device: V,
    position: P,
    backend: &MockBackend,
    identity: I,
) -> Orchestrator<V, P, &MockBackend, I> {
    Orchestrator::new(
        CameraController::new(device, CaptureSettings::default()),
        Geolocator::new(position, Duration::from_millis(300)),
        backend,
        identity,
    )
}

fn office() -> MockPositionSource {
    MockPositionSource::fixed(PositionReading::new(13.7563, 100.5018, Some(7.6)))
}

fn admin() -> MemoryIdentity {
    MemoryIdentity::signed_in(Credential::new("admin-token", "admin", "Ops"))
}

#[tokio::test]
async fn kiosk_attempt_is_anonymous_and_rounds_accuracy() {
    init_test_logging();
    let device = MockVideoDevice::new(1920, 1080);
    let position = office();
    let backend = MockBackend::new().with_default(
        200,
        r#"{"ok":true,"action":"out","slot":"evening","score":0.77,"user":{"id":9,"name":"Niran","email":"n@example.com"}}"#,
    );
    let orch = build(device.clone(), &position, &backend, MemoryIdentity::anonymous());
    orch.camera().await.start().await.unwrap();

    let report = orch
        .submit(&SubmissionMode::Kiosk(Action::Out), &SubmitOptions::default())
        .await
        .unwrap();

    let AttemptOutcome::Success(success) = &report.outcome else {
        panic!("expected success, got {:?}", report.outcome);
    };
    assert_eq!(success.matched_identity.as_ref().unwrap().name, "Niran");
    assert_eq!(report.display_slot(), Some(Slot::Evening));
    assert!(report.client_slot.is_some());

    let request = backend.last_request().unwrap();
    assert_eq!(request.path, "/api/attendance/anonymous-clock");
    assert_eq!(request.field("action"), Some("out"));
    assert_eq!(request.field("accuracy"), Some("8"));
    assert!(request.bearer.is_none());
    assert!(request.query.is_empty());
    assert_eq!(request.files.len(), 1);
    assert_eq!(request.files[0].field, "file");

    device.assert_operations(&[VideoOp::Open, VideoOp::ReadFrame]);
    assert_eq!(orch.camera().await.len(), 0, "fresh frame must not join the collection");
}

#[tokio::test]
async fn manual_clock_never_touches_the_camera() {
    init_test_logging();
    let device = MockVideoDevice::new(640, 480);
    let position = office();
    let backend = MockBackend::new().with_default(200, r#"{"ok":true,"action":"in","distance_m":3.5}"#);
    let identity = MemoryIdentity::signed_in(Credential::new("tok", "employee", "Ann"));
    let orch = build(device.clone(), &position, &backend, &identity);

    let report = orch
        .submit(&SubmissionMode::Manual(Action::In), &SubmitOptions::default())
        .await
        .unwrap();

    assert!(report.outcome.is_success());
    device.assert_no_operations();
    let request = backend.last_request().unwrap();
    assert_eq!(request.path, "/api/attendance/manual-in");
    assert!(request.files.is_empty());
    assert_eq!(position.call_count(), 1);
    assert!(position.requests()[0].maximum_age.is_zero());
}

#[tokio::test]
async fn enroll_after_burst_sends_every_snapshot_without_position() {
    init_test_logging();
    let device = MockVideoDevice::new(800, 600);
    let position = office();
    let backend = MockBackend::new().with_default(200, r#"{"ok":true,"added":4,"total":9}"#);
    let orch = build(device, &position, &backend, admin());

    {
        let mut camera = orch.camera().await;
        camera.start().await.unwrap();
        camera.capture_burst(4, Duration::from_millis(5)).await.unwrap();
    }

    let mode = SubmissionMode::AdminEnroll {
        email: "new.hire@example.com".to_string(),
    };
    let report = orch.submit(&mode, &SubmitOptions::default()).await.unwrap();

    let AttemptOutcome::Success(success) = &report.outcome else {
        panic!("expected success, got {:?}", report.outcome);
    };
    let enrollment = success.enrollment.unwrap();
    assert_eq!((enrollment.added, enrollment.total), (4, 9));

    let request = backend.last_request().unwrap();
    assert_eq!(request.field("email"), Some("new.hire@example.com"));
    assert!(request.field("lat").is_none());
    assert_eq!(request.files.len(), 4);
    assert!(request.files.iter().all(|f| f.field == "files"));
    assert_eq!(position.call_count(), 0);
    // Snapshots stay until the caller clears them.
    assert_eq!(orch.camera().await.len(), 4);
}

#[tokio::test]
async fn recognize_from_file_camera_sends_jpeg() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let frames = write_frames(dir.path(), 2);
    let backend = MockBackend::new().with_default(
        200,
        r#"{"found":true,"score":0.62,"user":{"id":4,"name":"Mali","email":"m@example.com"}}"#,
    );
    let orch = build(ImageFileCamera::new(&frames), office(), &backend, admin());

    {
        let mut camera = orch.camera().await;
        camera.start().await.unwrap();
        camera.add_to_collection().await.unwrap();
    }
    let report = orch
        .submit(&SubmissionMode::AdminRecognize, &SubmitOptions { threshold: 0.45 })
        .await
        .unwrap();

    assert!(report.outcome.is_success());
    let request = backend.last_request().unwrap();
    assert_eq!(request.query, vec![("th", "0.45".to_string())]);
    let bytes = &request.files[0].bytes;
    assert_eq!(&bytes[..2], &[0xFF, 0xD8], "expected a JPEG payload");
}

#[tokio::test]
async fn denied_position_reports_device_error_and_frees_the_flight() {
    init_test_logging();
    let device = MockVideoDevice::new(640, 480);
    let position = MockPositionSource::failing(PositionFaultCode::PermissionDenied);
    let backend = MockBackend::new();
    let identity = MemoryIdentity::signed_in(Credential::new("tok", "employee", "Ann"));
    let orch = build(device, &position, &backend, &identity);
    orch.camera().await.start().await.unwrap();

    let mode = SubmissionMode::LiveCapture(Action::In);
    let report = orch.submit(&mode, &SubmitOptions::default()).await.unwrap();
    assert!(matches!(
        report.outcome,
        AttemptOutcome::DeviceError {
            kind: DeviceErrorKind::PermissionDenied,
            ..
        }
    ));
    backend.assert_no_requests();
    assert_eq!(orch.state(), OrchestratorState::Idle);

    // The next attempt is accepted; the position source still refuses.
    let again = orch.submit(&mode, &SubmitOptions::default()).await.unwrap();
    assert!(!again.outcome.is_success());
    assert_eq!(position.call_count(), 2);
}

#[tokio::test]
async fn watchers_follow_the_attempt_back_to_idle() {
    init_test_logging();
    let device = MockVideoDevice::new(640, 480);
    let position = office();
    let backend = MockBackend::new()
        .with_default(422, r#"{"detail":"outside geofence"}"#)
        .with_delay(Duration::from_millis(30));
    let identity = MemoryIdentity::signed_in(Credential::new("tok", "employee", "Ann"));
    let orch = build(device, &position, &backend, &identity);

    let mut rx = orch.subscribe();
    let watcher = async {
        let mut seen = Vec::new();
        while rx.changed().await.is_ok() {
            let state = *rx.borrow_and_update();
            seen.push(state);
            if state == OrchestratorState::Idle {
                break;
            }
        }
        seen
    };
    let mode = SubmissionMode::Manual(Action::Out);
    let options = SubmitOptions::default();
    let attempt = orch.submit(&mode, &options);
    let (seen, report) = tokio::join!(watcher, attempt);

    assert_eq!(
        report.unwrap().outcome,
        AttemptOutcome::rejected("outside geofence")
    );
    assert!(seen.contains(&OrchestratorState::Submitting), "{seen:?}");
    assert_eq!(seen.last(), Some(&OrchestratorState::Idle));
    assert!(!seen.contains(&OrchestratorState::Succeeded), "{seen:?}");
}

#[tokio::test]
async fn frame_and_fix_are_acquired_concurrently() {
    init_test_logging();
    let device = MockVideoDevice::new(640, 480);
    device.set_frame_delay(Duration::from_millis(300));
    let position = office().with_delay(Duration::from_millis(300));
    let backend = MockBackend::new().with_default(200, r#"{"ok":true,"action":"in","score":0.8}"#);
    let orch = Orchestrator::new(
        CameraController::new(device, CaptureSettings::default()),
        Geolocator::new(&position, Duration::from_secs(2)),
        &backend,
        MemoryIdentity::signed_in(Credential::new("tok", "employee", "Ann")),
    );
    orch.camera().await.start().await.unwrap();

    let started = std::time::Instant::now();
    let report = orch
        .submit(&SubmissionMode::LiveCapture(Action::In), &SubmitOptions::default())
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(report.outcome.is_success(), "{:?}", report.outcome);
    assert!(
        elapsed < Duration::from_millis(550),
        "sequential acquisition took {elapsed:?}"
    );
    assert_eq!(backend.last_request().unwrap().files.len(), 1);
}
