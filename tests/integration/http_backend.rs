//! reqwest transport against a local mock server.

use std::time::Duration;

use attend::api::{
    self, Action, HttpBackend, ImagePart, SubmissionMode, VerificationBackend, VerificationRequest,
};
use attend::camera::mock::MockVideoDevice;
use attend::camera::{CameraController, CaptureSettings};
use attend::error::AttendError;
use attend::geo::mock::MockPositionSource;
use attend::geo::{Geolocator, PositionReading};
use attend::identity::{Credential, MemoryIdentity};
use attend::orchestrator::{Orchestrator, SubmitOptions};
use attend::outcome::AttemptOutcome;
use mockito::Matcher;

use crate::common::init_test_logging;

fn backend(url: &str) -> HttpBackend {
    HttpBackend::new(url, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn live_clock_sends_bearer_threshold_and_multipart() {
    init_test_logging();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/attendance/clock-in")
        .match_header("authorization", "Bearer tok-1")
        .match_query(Matcher::UrlEncoded("th".into(), "0.35".into()))
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="lat""#.into()),
            Matcher::Regex(r#"name="file"; filename="frame.jpg""#.into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok":true,"action":"in","score":0.71}"#)
        .create_async()
        .await;

    let request = VerificationRequest::build(
        &SubmissionMode::LiveCapture(Action::In),
        Some(&PositionReading::new(13.75, 100.5, Some(12.0))),
        vec![ImagePart::jpeg("file", "frame.jpg", &[0xFF, 0xD8, 0xFF, 0xD9])],
        Some("tok-1".to_string()),
        0.35,
    );
    let raw = backend(&server.url()).send(&request).await.unwrap();

    assert_eq!(raw.status, 200);
    assert!(raw.body.contains("0.71"));
    mock.assert_async().await;
}

#[tokio::test]
async fn error_statuses_are_responses_not_transport_failures() {
    init_test_logging();
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/attendance/manual-out")
        .with_status(403)
        .with_body(r#"{"detail":"Outside allowed area"}"#)
        .create_async()
        .await;

    let request = VerificationRequest::build(
        &SubmissionMode::Manual(Action::Out),
        Some(&PositionReading::new(1.0, 2.0, None)),
        Vec::new(),
        Some("tok".to_string()),
        0.35,
    );
    let raw = backend(&server.url()).send(&request).await.unwrap();
    assert_eq!(raw.status, 403);
    assert!(!raw.is_success());
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    init_test_logging();
    let request = VerificationRequest::build(
        &SubmissionMode::Kiosk(Action::In),
        None,
        Vec::new(),
        None,
        0.35,
    );
    let err = backend("http://127.0.0.1:9").send(&request).await.unwrap_err();
    assert!(!err.message.is_empty());
    assert!(!err.timed_out);
}

#[tokio::test]
async fn login_posts_a_form_and_parses_the_token() {
    init_test_logging();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/login")
        .match_header("content-type", "application/x-www-form-urlencoded")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("username".into(), "ann@example.com".into()),
            Matcher::UrlEncoded("password".into(), "s3cret".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"access_token":"jwt","token_type":"bearer","role":"employee","name":"Ann"}"#)
        .create_async()
        .await;

    let body = api::login(&backend(&server.url()), "ann@example.com", "s3cret")
        .await
        .unwrap();
    assert_eq!(body.access_token, "jwt");
    assert_eq!(body.role, "employee");
    mock.assert_async().await;
}

#[tokio::test]
async fn rejected_login_without_detail_says_invalid_credentials() {
    init_test_logging();
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/login")
        .with_status(401)
        .with_body("Unauthorized")
        .create_async()
        .await;

    let err = api::login(&backend(&server.url()), "ann@example.com", "nope")
        .await
        .unwrap_err();
    assert!(matches!(err, AttendError::Rejected { ref reason } if reason == "invalid credentials"));
}

#[tokio::test]
async fn orchestrator_over_http_flags_a_stale_token() {
    init_test_logging();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/attendance/clock-out")
        .match_header("authorization", "Bearer stale")
        .match_query(Matcher::UrlEncoded("th".into(), "0.35".into()))
        .with_status(401)
        .with_body(r#"{"detail":"Token expired"}"#)
        .expect(1)
        .create_async()
        .await;

    let orch = Orchestrator::new(
        CameraController::new(MockVideoDevice::new(640, 480), CaptureSettings::default()),
        Geolocator::new(
            MockPositionSource::fixed(PositionReading::new(13.75, 100.5, Some(5.0))),
            Duration::from_secs(1),
        ),
        backend(&server.url()),
        MemoryIdentity::signed_in(Credential::new("stale", "employee", "Ann")),
    );
    orch.camera().await.start().await.unwrap();

    let report = orch
        .submit(&SubmissionMode::LiveCapture(Action::Out), &SubmitOptions::default())
        .await
        .unwrap();

    assert_eq!(report.outcome, AttemptOutcome::rejected("Token expired"));
    assert!(report.credential_invalid);
    mock.assert_async().await;
}
