//! Logistic regression artifact.

use super::{check_features, sigmoid, ChurnModel};
use crate::error::{ChurnError, Result};
use crate::frame::EncodedFrame;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub features: Vec<String>,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LogisticModel {
    pub fn new(features: Vec<String>, intercept: f64, coefficients: Vec<f64>) -> Result<Self> {
        let model = Self {
            features,
            intercept,
            coefficients,
        };
        model.validate()?;
        Ok(model)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.features.is_empty() {
            return Err(ChurnError::ModelLoad("logistic model has no features".into()));
        }
        if self.coefficients.len() != self.features.len() {
            return Err(ChurnError::ModelLoad(format!(
                "logistic model has {} coefficients for {} features",
                self.coefficients.len(),
                self.features.len()
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|w| !w.is_finite()) {
            return Err(ChurnError::ModelLoad(
                "logistic model has non-finite weights".into(),
            ));
        }
        Ok(())
    }

    fn margin(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }
}

impl ChurnModel for LogisticModel {
    fn features(&self) -> &[String] {
        &self.features
    }

    fn predict_proba(&self, frame: &EncodedFrame) -> Result<Vec<[f64; 2]>> {
        check_features(&self.features, frame)?;
        Ok(frame
            .rows()
            .iter()
            .map(|row| {
                let p = sigmoid(self.margin(row));
                [1.0 - p, p]
            })
            .collect())
    }

    fn describe(&self) -> String {
        format!("logistic regression over {} features", self.features.len())
    }
}
