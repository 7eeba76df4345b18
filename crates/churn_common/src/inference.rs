//! Inference facade: preprocessing + model scoring -> labelled prediction.

use crate::error::{ChurnError, Result};
use crate::frame::EncodedFrame;
use crate::model::ChurnModel;
use crate::preprocess::Preprocessor;
use crate::record::RawRecord;
use crate::schema::FeatureSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Probability at or above which a customer is flagged.
pub const CHURN_THRESHOLD: f64 = 0.30;

pub const LIKELY_TO_CHURN: &str = "Likely to churn";
pub const NOT_LIKELY_TO_CHURN: &str = "Not likely to churn";

/// Prediction result as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub prediction: String,
    pub churn_probability: f64,
}

impl Prediction {
    /// Label against the threshold on the raw probability, then round for display
    pub fn from_probability(probability: f64) -> Self {
        let label = if probability >= CHURN_THRESHOLD {
            LIKELY_TO_CHURN
        } else {
            NOT_LIKELY_TO_CHURN
        };
        Self {
            prediction: label.to_string(),
            churn_probability: round4(probability),
        }
    }

    /// Form UI rendering: `<label> (prob=<probability>)`
    pub fn summary(&self) -> String {
        format!("{} (prob={})", self.prediction, self.churn_probability)
    }
}

/// Round half-to-even on the exact binary value, 4 decimals.
fn round4(x: f64) -> f64 {
    format!("{:.4}", x).parse().unwrap_or(x)
}

/// Composes the preprocessing stage with a loaded model.
#[derive(Clone)]
pub struct Predictor {
    preprocessor: Preprocessor,
    model: Arc<dyn ChurnModel>,
}

impl Predictor {
    pub fn new(schema: FeatureSchema, model: Arc<dyn ChurnModel>) -> Self {
        if schema.columns() != model.features() {
            warn!(
                "Feature schema ({} columns) does not match model features ({} columns); predictions will fail",
                schema.len(),
                model.features().len()
            );
        }
        Self {
            preprocessor: Preprocessor::new(schema),
            model,
        }
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn model(&self) -> &Arc<dyn ChurnModel> {
        &self.model
    }

    /// Score one record.
    pub fn predict(&self, record: &RawRecord) -> Result<Prediction> {
        let row = self.preprocessor.encode(record)?;
        let batch = EncodedFrame::from(row);
        let probabilities = self.model.predict_proba(&batch)?;

        let p = probabilities
            .first()
            .map(|pair| pair[1])
            .ok_or(ChurnError::InvalidProbability(f64::NAN))?;
        if !(0.0..=1.0).contains(&p) {
            return Err(ChurnError::InvalidProbability(p));
        }

        let prediction = Prediction::from_probability(p);
        debug!(
            "Scored record: {} (p={:.6})",
            prediction.prediction, p
        );
        Ok(prediction)
    }
}
