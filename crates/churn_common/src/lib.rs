//! Shared library for churn model serving.
//!
//! Raw customer records are encoded by the [`preprocess`] stage into rows
//! aligned with the training-time [`schema`], scored by a [`model`] artifact,
//! and labelled by the [`inference`] facade.

pub mod error;
pub mod frame;
pub mod inference;
pub mod model;
pub mod preprocess;
pub mod record;
pub mod schema;

pub use error::{ChurnError, Result};
pub use frame::{EncodedFrame, EncodedRow};
pub use inference::{Prediction, Predictor, CHURN_THRESHOLD, LIKELY_TO_CHURN, NOT_LIKELY_TO_CHURN};
pub use model::{load_model, model_from_json, ChurnModel, ModelArtifact};
pub use preprocess::Preprocessor;
pub use record::{CustomerData, RawRecord, RawValue};
pub use schema::FeatureSchema;
