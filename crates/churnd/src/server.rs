//! HTTP server for churnd

use crate::config::{Config, ErrorStatus, ServerConfig};
use crate::metrics::ServingMetrics;
use crate::registry::resolve_model;
use crate::{routes, ui};
use anyhow::{Context, Result};
use axum::Router;
use churn_common::{FeatureSchema, Prediction, Predictor, RawRecord};
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Application state shared across handlers
pub struct AppState {
    pub predictor: Predictor,
    pub metrics: ServingMetrics,
    pub error_status: ErrorStatus,
}

impl AppState {
    pub fn new(predictor: Predictor, error_status: ErrorStatus) -> Result<Self> {
        Ok(Self {
            predictor,
            metrics: ServingMetrics::new().context("registering metrics")?,
            error_status,
        })
    }

    /// Load the feature schema and the model artifact. Any failure here aborts startup.
    pub async fn initialize(config: &Config) -> Result<Self> {
        let schema = FeatureSchema::load(&config.model.feature_schema_path)
            .context("loading feature schema")?;

        let source = config.model_source();
        info!("Resolving model from {}", source);
        let model = resolve_model(&source)
            .await
            .context("loading model artifact")?;

        Self::new(Predictor::new(schema, model), config.http.error_status)
    }

    /// Score one record through the shared predictor, recording metrics.
    pub fn predict(&self, record: &RawRecord, transport: &str) -> churn_common::Result<Prediction> {
        let timer = self.metrics.scoring_seconds.start_timer();
        let result = self.predictor.predict(record);
        timer.observe_duration();

        match &result {
            Ok(prediction) => {
                self.metrics
                    .record_prediction(&prediction.prediction, transport);
            }
            Err(e) if e.is_request_level() => {
                warn!("Prediction failed [{}]: {}", e.code(), e);
                self.metrics.record_error(e.code());
            }
            Err(e) => {
                error!("Prediction failed [{}]: {}", e.code(), e);
                self.metrics.record_error(e.code());
            }
        }
        result
    }
}

/// Build the router with all routes and middleware
pub fn app(state: Arc<AppState>, server: &ServerConfig) -> Router {
    Router::new()
        .merge(routes::health_routes())
        .merge(routes::predict_routes())
        .merge(routes::metrics_routes())
        .merge(ui::ui_routes())
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(server.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until Ctrl-C
pub async fn run(state: AppState, server: &ServerConfig) -> Result<()> {
    let app = app(Arc::new(state), server);

    let listener = tokio::net::TcpListener::bind(&server.bind)
        .await
        .with_context(|| format!("binding {}", server.bind))?;
    info!("Listening on http://{}", server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down gracefully");
        })
        .await?;
    Ok(())
}
