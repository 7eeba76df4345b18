//! Prometheus metrics for the prediction endpoints

use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry, Encoder, Histogram,
    IntCounterVec, Registry, TextEncoder,
};

/// Serving metrics, registered on a private registry
#[derive(Clone)]
pub struct ServingMetrics {
    pub predictions_total: IntCounterVec,
    pub prediction_errors_total: IntCounterVec,
    pub scoring_seconds: Histogram,

    registry: Registry,
}

impl ServingMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let predictions_total = register_int_counter_vec_with_registry!(
            "churn_predictions_total",
            "Total number of predictions served by label and transport",
            &["label", "transport"],
            registry
        )?;

        let prediction_errors_total = register_int_counter_vec_with_registry!(
            "churn_prediction_errors_total",
            "Total number of failed predictions by error code",
            &["code"],
            registry
        )?;

        let scoring_seconds = register_histogram_with_registry!(
            "churn_scoring_seconds",
            "Preprocessing plus model scoring latency in seconds",
            vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1],
            registry
        )?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            predictions_total,
            prediction_errors_total,
            scoring_seconds,
            registry,
        })
    }

    pub fn record_prediction(&self, label: &str, transport: &str) {
        self.predictions_total
            .with_label_values(&[label, transport])
            .inc();
    }

    pub fn record_error(&self, code: &str) {
        self.prediction_errors_total.with_label_values(&[code]).inc();
    }

    /// Text exposition format
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
