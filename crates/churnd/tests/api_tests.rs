//! HTTP-level tests for churnd, driving the router in-process.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use churn_common::{
    load_model, model::LogisticModel, FeatureSchema, Predictor, LIKELY_TO_CHURN,
    NOT_LIKELY_TO_CHURN,
};
use churnd::config::{ErrorStatus, ServerConfig};
use churnd::server::{app, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

fn artifacts_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../artifacts")
}

fn schema() -> FeatureSchema {
    FeatureSchema::load(artifacts_dir().join("feature_columns.json")).unwrap()
}

fn test_app(error_status: ErrorStatus) -> Router {
    let model = load_model(artifacts_dir().join("churn_model.json")).unwrap();
    let state = AppState::new(Predictor::new(schema(), model), error_status).unwrap();
    app(Arc::new(state), &ServerConfig::default())
}

/// Model fitted on a different column list, so every prediction fails
fn mismatched_app(error_status: ErrorStatus) -> Router {
    let model = LogisticModel::new(vec!["tenure".to_string()], 0.0, vec![0.1]).unwrap();
    let state = AppState::new(Predictor::new(schema(), Arc::new(model)), error_status).unwrap();
    app(Arc::new(state), &ServerConfig::default())
}

fn known_payload() -> Value {
    json!({
        "gender": "Male",
        "SeniorCitizen": 0,
        "Partner": "Yes",
        "Dependents": "No",
        "tenure": 24,
        "PhoneService": "Yes",
        "MultipleLines": "Yes",
        "InternetService": "DSL",
        "OnlineSecurity": "Yes",
        "OnlineBackup": "Yes",
        "DeviceProtection": "Yes",
        "TechSupport": "Yes",
        "StreamingTV": "No",
        "StreamingMovies": "No",
        "Contract": "Two year",
        "PaperlessBilling": "No",
        "MonthlyCharges": 60.0,
        "TotalCharges": 1440.0,
        "PaymentMethod": "Credit card (automatic)"
    })
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let response = test_app(ErrorStatus::Ok)
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_predict_known_value_scenario() {
    let response = test_app(ErrorStatus::Ok)
        .oneshot(post_json("/predict", &known_payload()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    let prediction = &body["prediction"];
    assert_eq!(prediction["prediction"], NOT_LIKELY_TO_CHURN);
    let p = prediction["churn_probability"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&p));
}

#[tokio::test]
async fn test_predict_without_senior_citizen() {
    let mut payload = known_payload();
    payload.as_object_mut().unwrap().remove("SeniorCitizen");

    let response = test_app(ErrorStatus::Ok)
        .oneshot(post_json("/predict", &payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert!(body["prediction"]["churn_probability"].is_number());
}

#[tokio::test]
async fn test_predict_unseen_payment_method() {
    let mut payload = known_payload();
    payload["PaymentMethod"] = json!("Voucher");

    let response = test_app(ErrorStatus::Ok)
        .oneshot(post_json("/predict", &payload))
        .await
        .unwrap();

    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert!(body.get("error").is_none());
    assert!(body["prediction"]["prediction"].is_string());
}

#[tokio::test]
async fn test_predict_rejects_incomplete_payload() {
    let mut payload = known_payload();
    payload.as_object_mut().unwrap().remove("Contract");

    let response = test_app(ErrorStatus::Ok)
        .oneshot(post_json("/predict", &payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_scoring_failure_returns_error_payload() {
    let response = mismatched_app(ErrorStatus::Ok)
        .oneshot(post_json("/predict", &known_payload()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("Feature shape mismatch"));
    assert!(body.get("prediction").is_none());
}

#[tokio::test]
async fn test_scoring_failure_with_server_error_status() {
    let response = mismatched_app(ErrorStatus::ServerError)
        .oneshot(post_json("/predict", &known_payload()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_ui_form_renders_defaults() {
    let response = test_app(ErrorStatus::Ok)
        .oneshot(Request::builder().uri("/ui").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("<option value=\"Fiber optic\" selected>"));
    assert!(html.contains("name=\"TotalCharges\""));
}

#[tokio::test]
async fn test_ui_example_prefill() {
    let response = test_app(ErrorStatus::Ok)
        .oneshot(
            Request::builder()
                .uri("/ui?example=2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let html = body_text(response).await;
    assert!(html.contains("<option value=\"Two year\" selected>"));
}

#[tokio::test]
async fn test_ui_submit_renders_summary() {
    let form = "gender=Female&SeniorCitizen=0&Partner=No&Dependents=No&PhoneService=Yes\
        &MultipleLines=No&InternetService=Fiber+optic&OnlineSecurity=No&OnlineBackup=No\
        &DeviceProtection=No&TechSupport=No&StreamingTV=Yes&StreamingMovies=Yes\
        &Contract=Month-to-month&PaperlessBilling=Yes&PaymentMethod=Electronic+check\
        &tenure=1&MonthlyCharges=85&TotalCharges=85";
    let request = Request::builder()
        .method("POST")
        .uri("/ui")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap();

    let response = test_app(ErrorStatus::Ok).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains(&format!("{} (prob=", LIKELY_TO_CHURN)));
}

#[tokio::test]
async fn test_ui_submit_reports_errors_as_text() {
    let request = Request::builder()
        .method("POST")
        .uri("/ui")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("gender=Male"))
        .unwrap();

    let response = test_app(ErrorStatus::Ok).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Error: missing field"));
}

#[tokio::test]
async fn test_metrics_count_predictions() {
    let app = test_app(ErrorStatus::Ok);
    let response = app
        .clone()
        .oneshot(post_json("/predict", &known_payload()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    assert!(text.contains("churn_predictions_total{label=\"Not likely to churn\",transport=\"api\"} 1"));
}
