//! `ExternalMeasurementProvider` against a wiremock scan service.

use atelier_commerce::domain::aggregates::SessionStatus;
use atelier_commerce::providers::measurement::{ExternalMeasurementProvider, MeasurementProvider, MeasurementProviderError};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(base_url: &str) -> ExternalMeasurementProvider {
    ExternalMeasurementProvider::new(&format!("{base_url}/api"), Some("scan-key"), 5).expect("client construction should not fail")
}

fn measurements_json() -> serde_json::Value {
    serde_json::json!({
        "chest": 102.0, "waist": 88.0, "hips": 100.0, "shoulderWidth": 46.0, "sleeveLength": 64.0,
        "jacketLength": 76.0, "neck": 40.0, "inseam": 82.0, "outseam": 106.0, "thigh": 58.0,
        "unit": "cm", "confidence": 0.94
    })
}

#[tokio::test]
async fn create_session_returns_mobile_url() {
    let server = MockServer::start().await;
    let session_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/api/sessions"))
        .and(header("authorization", "Bearer scan-key"))
        .and(body_partial_json(serde_json::json!({ "reference": session_id, "userId": user_id })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "scan_42", "url": "https://scan.test/m/scan_42", "status": "pending"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let remote = provider(&server.uri()).create_session(session_id, user_id, None).await.expect("session");
    assert_eq!(remote.provider_ref, "scan_42");
    assert_eq!(remote.mobile_url, "https://scan.test/m/scan_42");
    assert_eq!(remote.status, SessionStatus::Created);
    assert!(remote.measurements.is_none());
}

#[tokio::test]
async fn get_session_maps_completed_scan() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/sessions/scan_42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "scan_42", "url": "https://scan.test/m/scan_42", "status": "done", "measurements": measurements_json()
        })))
        .mount(&server)
        .await;

    let remote = provider(&server.uri()).get_session("scan_42").await.expect("lookup").expect("remote state");
    assert_eq!(remote.status, SessionStatus::Completed);
    let measurements = remote.measurements.expect("measurements");
    assert!((measurements.chest - 102.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn missing_remote_session_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/sessions/scan_gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = provider(&server.uri()).get_session("scan_gone").await.unwrap_err();
    assert!(matches!(err, MeasurementProviderError::SessionNotFound(ref r) if r == "scan_gone"), "got {err:?}");
}

#[tokio::test]
async fn unknown_remote_status_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/sessions/scan_7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "scan_7", "url": "https://scan.test/m/scan_7", "status": "teleported"
        })))
        .mount(&server)
        .await;

    let err = provider(&server.uri()).get_session("scan_7").await.unwrap_err();
    assert!(matches!(err, MeasurementProviderError::InvalidResponse(_)), "got {err:?}");
}

#[tokio::test]
async fn server_error_is_a_rejection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/sessions"))
        .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({ "message": "scanner fleet offline" })))
        .mount(&server)
        .await;

    let err = provider(&server.uri()).create_session(Uuid::new_v4(), Uuid::new_v4(), None).await.unwrap_err();
    match err {
        MeasurementProviderError::Rejected { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "scanner fleet offline");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}
