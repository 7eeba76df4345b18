//! Encoded numeric rows aligned to the feature schema.

use std::sync::Arc;

/// One fully encoded record. Always `columns().len() == values().len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRow {
    columns: Arc<[String]>,
    values: Vec<f64>,
}

impl EncodedRow {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value of a named column, if the schema has it
    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A batch of encoded rows sharing one column list.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFrame {
    columns: Arc<[String]>,
    rows: Vec<Vec<f64>>,
}

impl EncodedFrame {
    /// Build a frame; every row must have one value per column.
    pub fn new(columns: Arc<[String]>, rows: Vec<Vec<f64>>) -> Option<Self> {
        if rows.iter().any(|r| r.len() != columns.len()) {
            return None;
        }
        Some(Self { columns, rows })
    }

    /// Rows already known to match the column width
    pub(crate) fn from_aligned(columns: Arc<[String]>, rows: Vec<Vec<f64>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, index: usize) -> Option<EncodedRow> {
        self.rows.get(index).map(|values| EncodedRow {
            columns: Arc::clone(&self.columns),
            values: values.clone(),
        })
    }

    pub fn into_rows(self) -> Vec<EncodedRow> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|values| EncodedRow {
                columns: Arc::clone(&columns),
                values,
            })
            .collect()
    }
}

impl From<EncodedRow> for EncodedFrame {
    /// Single-row batch
    fn from(row: EncodedRow) -> Self {
        Self {
            columns: row.columns,
            rows: vec![row.values],
        }
    }
}
