//! Model artifacts and probability scoring.
//!
//! A model artifact is a JSON document tagged by `format`:
//!
//! - [`LogisticModel`]: `{"format": "logistic", "features": [..], "intercept": .., "coefficients": [..]}`
//! - [`TreeEnsembleModel`]: `{"format": "tree_ensemble", "features": [..], "base_score": .., "trees": [..]}`
//!   with trees in the XGBoost JSON dump layout.
//!
//! Artifacts are loaded once at startup and shared behind `Arc<dyn ChurnModel>`.

mod logistic;
mod tree;

pub use logistic::LogisticModel;
pub use tree::{DumpNode, TreeEnsembleModel};

use crate::error::{ChurnError, Result};
use crate::frame::EncodedFrame;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Default artifact file name
pub const MODEL_FILE: &str = "churn_model.json";

/// A trained binary classifier.
pub trait ChurnModel: Send + Sync {
    /// Feature columns the model was fitted on, in order
    fn features(&self) -> &[String];

    /// `[p(not churn), p(churn)]` per row.
    fn predict_proba(&self, frame: &EncodedFrame) -> Result<Vec<[f64; 2]>>;

    /// Short human-readable description for logs
    fn describe(&self) -> String;
}

/// Reject frames whose columns are not exactly the fitted features.
pub(crate) fn check_features(expected: &[String], frame: &EncodedFrame) -> Result<()> {
    if expected != frame.columns() {
        return Err(ChurnError::FeatureMismatch {
            expected: expected.to_vec(),
            found: frame.columns().to_vec(),
        });
    }
    Ok(())
}

pub(crate) fn sigmoid(margin: f64) -> f64 {
    if margin >= 0.0 {
        1.0 / (1.0 + (-margin).exp())
    } else {
        let e = margin.exp();
        e / (1.0 + e)
    }
}

/// On-disk artifact, tagged by format.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum ModelArtifact {
    Logistic(LogisticModel),
    TreeEnsemble(TreeEnsembleModel),
}

impl ModelArtifact {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| ChurnError::ModelLoad(format!("invalid artifact: {}", e)))
    }

    /// Validate and turn into a shareable model
    pub fn into_model(self) -> Result<Arc<dyn ChurnModel>> {
        match self {
            ModelArtifact::Logistic(model) => {
                model.validate()?;
                Ok(Arc::new(model))
            }
            ModelArtifact::TreeEnsemble(mut model) => {
                model.validate()?;
                Ok(Arc::new(model))
            }
        }
    }
}

/// Parse and validate an artifact from its JSON text
pub fn model_from_json(content: &str) -> Result<Arc<dyn ChurnModel>> {
    ModelArtifact::from_json(content)?.into_model()
}

/// Load an artifact file. Callers treat failure as startup-fatal.
pub fn load_model(path: impl AsRef<Path>) -> Result<Arc<dyn ChurnModel>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        ChurnError::ModelLoad(format!("cannot read {}: {}", path.display(), e))
    })?;
    let model = model_from_json(&content)?;
    info!("Loaded model artifact from {}: {}", path.display(), model.describe());
    Ok(model)
}
