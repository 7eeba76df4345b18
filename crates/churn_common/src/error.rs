//! Error types for the churn serving stack.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChurnError {
    #[error("Feature schema error: {0}")]
    Schema(String),

    #[error("SeniorCitizen value cannot be converted to an integer: {value}")]
    InvalidSeniorCitizen { value: String },

    #[error("Model artifact error: {0}")]
    ModelLoad(String),

    #[error("Feature shape mismatch, expected: {expected:?}, got: {found:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Model returned an invalid probability: {0}")]
    InvalidProbability(f64),

    #[error("Model registry error: {0}")]
    Registry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ChurnError {
    /// Stable code for logs and error payloads.
    pub fn code(&self) -> &'static str {
        match self {
            ChurnError::Schema(_) => "schema",
            ChurnError::InvalidSeniorCitizen { .. } => "invalid_senior_citizen",
            ChurnError::ModelLoad(_) => "model_load",
            ChurnError::FeatureMismatch { .. } => "feature_mismatch",
            ChurnError::InvalidProbability(_) => "invalid_probability",
            ChurnError::Registry(_) => "registry",
            ChurnError::Io(_) => "io",
            ChurnError::Json(_) => "json",
        }
    }

    /// Errors raised while scoring a request rather than during startup.
    pub fn is_request_level(&self) -> bool {
        matches!(
            self,
            ChurnError::InvalidSeniorCitizen { .. }
                | ChurnError::FeatureMismatch { .. }
                | ChurnError::InvalidProbability(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ChurnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = vec![
            ChurnError::Schema("x".into()),
            ChurnError::InvalidSeniorCitizen { value: "x".into() },
            ChurnError::ModelLoad("x".into()),
            ChurnError::FeatureMismatch {
                expected: vec![],
                found: vec![],
            },
            ChurnError::InvalidProbability(2.0),
            ChurnError::Registry("x".into()),
        ];
        let mut codes: Vec<&str> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_request_level_classification() {
        assert!(ChurnError::InvalidProbability(1.5).is_request_level());
        assert!(!ChurnError::Schema("missing".into()).is_request_level());
    }
}
