// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// The router is driven directly via tower::ServiceExt::oneshot.

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _;

use mangrove_validator::{router, AppState, DecisionEngine, ValidatorConfig};

const BODY_LIMIT: usize = 1024 * 1024;

fn test_router() -> Router {
    router(AppState::new(DecisionEngine::from_config(ValidatorConfig::default())))
}

async fn read_json(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn post(uri: &str, payload: &Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(payload).expect("serialize payload")))
        .expect("build request")
}

#[tokio::test]
async fn health_returns_ok() {
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");
    let resp = test_router().oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(String::from_utf8(bytes.to_vec()).unwrap().trim(), "OK");
}

#[tokio::test]
async fn validate_returns_full_result() {
    let payload = json!({
        "title": "Mangrove cutting",
        "description": "Fresh stumps along the creek where mangrove trees stood last week, cleared for a fish pond.",
        "incident_type": "illegal_cutting",
        "latitude": 21.95,
        "longitude": 88.9,
        "submitter_report_count": 3
    });
    let resp = test_router()
        .oneshot(post("/validate", &payload))
        .await
        .expect("oneshot /validate");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;
    let score = v["confidence_score"].as_f64().expect("confidence_score");
    assert!((0.0..=100.0).contains(&score));
    assert!(matches!(
        v["validation_status"].as_str(),
        Some("auto_validated" | "pending_review" | "flagged")
    ));
    for key in ["geography", "text_analysis", "photo_analysis", "reporter_history", "satellite"] {
        assert!(v["ai_analysis"].get(key).is_some(), "missing signal {key}");
    }
    assert_eq!(v["ai_analysis"]["geography"]["score"], json!(1.0));
    assert_eq!(v["policy"], json!("weighted_sum"));
}

#[tokio::test]
async fn outcome_endpoint_flattens_notes() {
    let payload = json!({
        "title": "Dumping",
        "description": "this is a test",
        "incident_type": "dumping"
    });
    let resp = test_router()
        .oneshot(post("/validate/outcome", &payload))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = read_json(resp).await;
    assert_eq!(v["status"], json!("flagged"));
    let notes = v["validation_notes"].as_str().unwrap();
    assert!(notes.starts_with("FLAG: High spam probability detected"));
    assert!(notes.contains("text_analysis ("));
    assert!(v["reason"].as_str().is_some());
}

#[tokio::test]
async fn malformed_submission_is_422_json() {
    let payload = json!({
        "title": "Something odd",
        "description": "whatever",
        "incident_type": "volcano"
    });
    let resp = test_router().oneshot(post("/validate", &payload)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let v = read_json(resp).await;
    assert_eq!(v["code"], json!("unknown_incident_type"));
    assert!(v["error"].as_str().unwrap().contains("volcano"));
}

#[tokio::test]
async fn missing_title_is_422_json() {
    let payload = json!({ "incident_type": "pollution" });
    let resp = test_router().oneshot(post("/validate", &payload)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(read_json(resp).await["code"], json!("missing_field"));
}

#[tokio::test]
async fn wrongly_typed_field_is_422_json() {
    let payload = json!({
        "title": "Cutting",
        "description": "Stumps along the creek bank",
        "incident_type": "illegal_cutting",
        "latitude": "abc"
    });
    let resp = test_router().oneshot(post("/validate", &payload)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let v = read_json(resp).await;
    assert_eq!(v["code"], json!("malformed_body"));
    assert!(v["error"].as_str().unwrap().contains("latitude"));
}

#[tokio::test]
async fn broken_json_on_outcome_is_json_error() {
    let req = Request::builder()
        .method("POST")
        .uri("/validate/outcome")
        .header("content-type", "application/json")
        .body(Body::from("{\"title\": "))
        .unwrap();
    let resp = test_router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(read_json(resp).await["code"], json!("malformed_body"));
}

#[tokio::test]
async fn zones_lists_configured_table() {
    let req = Request::builder().uri("/zones").body(Body::empty()).unwrap();
    let resp = test_router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = read_json(resp).await;
    assert_eq!(v["mode"], json!("zone_lookup"));
    let zones = v["zones"].as_array().unwrap();
    assert!(zones.iter().any(|z| z["name"] == json!("Sundarbans")));
}
