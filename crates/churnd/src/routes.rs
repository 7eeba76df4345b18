//! API routes for churnd

use crate::config::ErrorStatus;
use crate::server::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use churn_common::{CustomerData, Prediction, RawRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

type AppStateArc = Arc<AppState>;

// ============================================================================
// Health Routes
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/", get(health_check))
}

/// Load balancer probe; never fails once the server is up
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// ============================================================================
// Predict Routes
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: Prediction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn predict_routes() -> Router<AppStateArc> {
    Router::new().route("/predict", post(predict_churn))
}

async fn predict_churn(
    State(state): State<AppStateArc>,
    Json(data): Json<CustomerData>,
) -> Response {
    let record = RawRecord::from(data);

    match state.predict(&record, "api") {
        Ok(prediction) => {
            info!(
                "Prediction: {} (p={})",
                prediction.prediction, prediction.churn_probability
            );
            Json(PredictResponse { prediction }).into_response()
        }
        Err(e) => {
            let status = match state.error_status {
                ErrorStatus::Ok => StatusCode::OK,
                ErrorStatus::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Metrics Routes
// ============================================================================

pub fn metrics_routes() -> Router<AppStateArc> {
    Router::new().route("/metrics", get(metrics))
}

async fn metrics(State(state): State<AppStateArc>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
