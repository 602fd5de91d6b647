use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::Json;
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::prediction::router::{predict_handler, root_handler};
use crate::prediction::PredictionState;

fn json_request(body: serde_json::Value) -> Request<Body> {
    Request::post("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

#[tokio::test]
async fn predict_route_returns_label() {
    let router = router_with(Arc::new(RecordingModel::returning(1)));

    let response = router
        .oneshot(json_request(json!({
            "claim_rejection_reason": "Incomplete Documentation",
            "icd10_severity_score": 5,
            "payment_method": "Self-Pay",
            "length_of_stay": "6-10",
            "days_taken_to_claim": "11-15",
            "prior_authorization": "Yes"
        })))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await, json!({ "prediction": "Yes" }));
}

#[tokio::test]
async fn predict_handler_reports_invalid_categories() {
    let model = Arc::new(RecordingModel::returning(1));
    let state = Arc::new(PredictionState {
        service: service_with(model.clone()),
        summary: None,
    });
    let mut bad = request();
    bad.claim_rejection_reason = "Nonexistent Reason".to_string();

    let response = predict_handler::<RecordingModel>(State(state), Ok(Json(bad))).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .unwrap_or_default()
        .contains("claim_rejection_reason"));
    assert_eq!(payload["details"]["claim_rejection_reason"], json!(null));
    assert_eq!(payload["details"]["payment_method"], json!(1));
    assert_eq!(payload["details"]["prior_authorization"], json!(0));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn predict_route_reports_inference_failures() {
    let router = router_with(Arc::new(FailingModel));

    let response = router
        .oneshot(json_request(serde_json::to_value(request()).expect("serializes")))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    assert_eq!(payload, json!({ "error": "expected 12 input columns, got 10" }));
}

#[tokio::test]
async fn predict_route_rejects_wrong_primitive_types() {
    let router = router_with(Arc::new(RecordingModel::returning(1)));

    let response = router
        .oneshot(json_request(json!({
            "claim_rejection_reason": "Incomplete Documentation",
            "icd10_severity_score": "five",
            "payment_method": "Self-Pay",
            "length_of_stay": "6-10",
            "days_taken_to_claim": "11-15",
            "prior_authorization": "Yes"
        })))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert!(payload["error"].is_string());
    assert!(payload.get("prediction").is_none());
}

#[tokio::test]
async fn predict_route_rejects_missing_content_type() {
    let router = router_with(Arc::new(RecordingModel::returning(1)));

    let response = router
        .oneshot(
            Request::post("/predict")
                .body(Body::from("{}"))
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn root_route_reports_status() {
    let state = Arc::new(PredictionState {
        service: service_with(Arc::new(RecordingModel::returning(1))),
        summary: None,
    });

    let response = root_handler::<RecordingModel>(State(state)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert!(payload["message"]
        .as_str()
        .unwrap_or_default()
        .contains("running"));
}
