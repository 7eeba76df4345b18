//! Feature schema store.
//!
//! The schema is the ordered list of post-encoding column names the model
//! was trained on (`feature_columns.json`). It is loaded once at startup and
//! shared read-only; every encoded row is reindexed against it.

use crate::error::{ChurnError, Result};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Default schema file name next to the model artifact
pub const FEATURE_SCHEMA_FILE: &str = "feature_columns.json";

/// Immutable ordered feature-column list.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    columns: Arc<[String]>,
    positions: Arc<HashMap<String, usize>>,
}

impl FeatureSchema {
    /// Build a schema from column names. Rejects empty, blank or duplicate names.
    pub fn new(columns: Vec<String>) -> Result<Self> {
        if columns.is_empty() {
            return Err(ChurnError::Schema("feature schema is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for name in &columns {
            if name.trim().is_empty() {
                return Err(ChurnError::Schema("blank feature column name".to_string()));
            }
            if !seen.insert(name.as_str()) {
                return Err(ChurnError::Schema(format!(
                    "duplicate feature column: {}",
                    name
                )));
            }
        }

        let positions = columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        Ok(Self {
            columns: columns.into(),
            positions: Arc::new(positions),
        })
    }

    /// Parse the JSON array form of the schema
    pub fn from_json(content: &str) -> Result<Self> {
        let columns: Vec<String> = serde_json::from_str(content)
            .map_err(|e| ChurnError::Schema(format!("not a JSON array of strings: {}", e)))?;
        Self::new(columns)
    }

    /// Load the schema file. Callers treat failure as startup-fatal.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ChurnError::Schema(format!("cannot read {}: {}", path.display(), e))
        })?;
        let schema = Self::from_json(&content)?;
        info!(
            "Loaded feature schema from {} ({} columns)",
            path.display(),
            schema.len()
        );
        Ok(schema)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub(crate) fn shared_columns(&self) -> Arc<[String]> {
        Arc::clone(&self.columns)
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
