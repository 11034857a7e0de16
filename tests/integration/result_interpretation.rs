//! Server replies mapped to outcomes, across every mode.

use attend::api::{Action, SubmissionMode};
use attend::outcome::{AttemptOutcome, interpret};

fn all_modes() -> Vec<SubmissionMode> {
    vec![
        SubmissionMode::Manual(Action::In),
        SubmissionMode::Manual(Action::Out),
        SubmissionMode::LiveCapture(Action::In),
        SubmissionMode::LiveCapture(Action::Out),
        SubmissionMode::Kiosk(Action::In),
        SubmissionMode::Kiosk(Action::Out),
        SubmissionMode::AdminRecognize,
        SubmissionMode::AdminEnroll {
            email: "a@example.com".to_string(),
        },
    ]
}

#[test]
fn gateway_errors_fall_back_to_the_mode_reason() {
    for mode in all_modes() {
        let result = interpret(&mode, 502, "<html>Bad Gateway</html>");
        assert_eq!(
            result.outcome,
            AttemptOutcome::rejected(mode.fallback_reason()),
            "{mode}"
        );
        assert!(!result.credential_invalid, "{mode}");
    }
}

#[test]
fn validation_detail_lists_are_joined() {
    let body = r#"{"detail":[{"loc":["body","lat"],"msg":"field required"},{"loc":["body","lng"],"msg":"field required"}]}"#;
    for mode in all_modes() {
        let AttemptOutcome::Rejected { reason } = interpret(&mode, 422, body).outcome else {
            panic!("{mode}: expected rejection");
        };
        assert!(reason.contains("field required"), "{mode}: {reason}");
    }
}

#[test]
fn unauthorized_signals_only_for_credentialed_modes() {
    for mode in all_modes() {
        let result = interpret(&mode, 401, r#"{"detail":"Could not validate credentials"}"#);
        assert_eq!(
            result.credential_invalid,
            mode.requires_credential(),
            "{mode}"
        );
        assert!(matches!(result.outcome, AttemptOutcome::Rejected { .. }));
    }
}

#[test]
fn truncated_success_bodies_are_network_errors() {
    for mode in all_modes() {
        let outcome = interpret(&mode, 200, r#"{"ok":tr"#).outcome;
        assert!(
            matches!(
                outcome,
                AttemptOutcome::NetworkError {
                    status_code: Some(200),
                    ..
                }
            ),
            "{mode}: {outcome:?}"
        );
    }
}

#[test]
fn forbidden_geofence_reason_reaches_the_user() {
    let result = interpret(
        &SubmissionMode::Manual(Action::In),
        403,
        r#"{"detail":"Outside allowed area (distance 812 m)"}"#,
    );
    assert_eq!(
        result.outcome,
        AttemptOutcome::rejected("Outside allowed area (distance 812 m)")
    );
}

#[test]
fn outcome_json_is_stable() {
    let result = interpret(
        &SubmissionMode::LiveCapture(Action::In),
        200,
        r#"{"ok":true,"action":"in","score":0.8,"distance_m":0,"slot":"morning","attendance_id":5}"#,
    );
    let json = serde_json::to_value(&result.outcome).unwrap();
    assert_eq!(json["outcome"], "success");
    assert_eq!(json["match_score"], 0.8);
    assert_eq!(json["distance_meters"], 0.0);
    assert_eq!(json["slot"], "morning");
    assert_eq!(json["action"], "in");
    assert_eq!(json["attendance_id"], 5);
    assert!(json.get("enrollment").is_none());
}
