//! Preprocessing stage: raw customer records -> feature-locked numeric rows.
//!
//! The step order and encoding tables are fixed by the trained model and
//! must not drift:
//!
//! 1. strip whitespace from field names
//! 2. drop id / target fields
//! 3. binary encode yes/no and gender fields
//! 4. coerce `SeniorCitizen` to an integer (default 0, fail on garbage)
//! 5. encode multi-category service flags
//! 6. ordinal encode `InternetService` and `Contract`
//! 7. drop-first one-hot of `PaymentMethod`
//! 8. coerce remaining text to numbers (unparseable -> missing)
//! 9. fill missing with 0
//! 10. reindex to the feature schema
//! 11. booleans -> 0/1
//!
//! Unmapped categorical literals pass through steps 3, 5 and 6 untouched and
//! normally end up as 0 at step 8.

use crate::error::{ChurnError, Result};
use crate::frame::{EncodedFrame, EncodedRow};
use crate::record::{RawRecord, RawValue};
use crate::schema::FeatureSchema;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// Identifier and target fields that never reach the model
pub const DROPPED_FIELDS: [&str; 4] = ["customerID", "CustomerID", "customer_id", "Churn"];

pub const BINARY_FIELDS: [&str; 5] = [
    "gender",
    "Partner",
    "Dependents",
    "PhoneService",
    "PaperlessBilling",
];

const BINARY_MAP: [(&str, f64); 4] = [("Yes", 1.0), ("No", 0.0), ("Male", 1.0), ("Female", 0.0)];

pub const SENIOR_CITIZEN: &str = "SeniorCitizen";

pub const MULTI_CATEGORY_FIELDS: [&str; 7] = [
    "MultipleLines",
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
];

const MULTI_CATEGORY_MAP: [(&str, f64); 4] = [
    ("Yes", 1.0),
    ("No", 0.0),
    ("No internet service", 0.0),
    ("No phone service", 0.0),
];

const INTERNET_SERVICE_MAP: [(&str, f64); 3] = [("No", 0.0), ("DSL", 1.0), ("Fiber optic", 2.0)];

const CONTRACT_MAP: [(&str, f64); 3] = [
    ("Month-to-month", 0.0),
    ("One year", 1.0),
    ("Two year", 2.0),
];

const ORDINAL_FIELDS: [(&str, &[(&str, f64)]); 2] = [
    ("InternetService", &INTERNET_SERVICE_MAP),
    ("Contract", &CONTRACT_MAP),
];

pub const PAYMENT_METHOD: &str = "PaymentMethod";

/// Intermediate cell state while a frame is being encoded.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Missing,
    Bool(bool),
    Int(i64),
    Num(f64),
    Text(String),
}

impl From<&RawValue> for Cell {
    fn from(value: &RawValue) -> Self {
        match value {
            RawValue::Null => Cell::Missing,
            RawValue::Bool(b) => Cell::Bool(*b),
            RawValue::Int(i) => Cell::Int(*i),
            RawValue::Float(x) if x.is_nan() => Cell::Missing,
            RawValue::Float(x) => Cell::Num(*x),
            RawValue::Text(s) => Cell::Text(s.clone()),
        }
    }
}

/// Column-major working frame.
#[derive(Debug, Default)]
struct WorkFrame {
    names: Vec<String>,
    columns: Vec<Vec<Cell>>,
    n_rows: usize,
}

impl WorkFrame {
    fn from_records(records: &[RawRecord]) -> Self {
        let mut frame = WorkFrame {
            n_rows: records.len(),
            ..Default::default()
        };
        let mut index: HashMap<String, usize> = HashMap::new();

        for (row, record) in records.iter().enumerate() {
            for (field, value) in record.fields() {
                let name = field.trim().to_string();
                let col = *index.entry(name.clone()).or_insert_with(|| {
                    frame.names.push(name);
                    frame.columns.push(vec![Cell::Missing; records.len()]);
                    frame.columns.len() - 1
                });
                frame.columns[col][row] = Cell::from(value);
            }
        }

        frame
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    fn column_mut(&mut self, name: &str) -> Option<&mut Vec<Cell>> {
        let i = self.position(name)?;
        Some(&mut self.columns[i])
    }

    fn remove(&mut self, name: &str) -> Option<Vec<Cell>> {
        let i = self.position(name)?;
        self.names.remove(i);
        Some(self.columns.remove(i))
    }

    fn push(&mut self, name: String, cells: Vec<Cell>) {
        self.names.push(name);
        self.columns.push(cells);
    }
}

/// Replace exact text matches from `table`; everything else passes through.
fn replace_literals(cells: &mut [Cell], table: &[(&str, f64)]) {
    for cell in cells.iter_mut() {
        if let Cell::Text(text) = cell {
            if let Some((_, code)) = table.iter().find(|(literal, _)| *literal == text.as_str()) {
                *cell = Cell::Num(*code);
            }
        }
    }
}

fn coerce_senior_citizen(cell: &Cell) -> Result<f64> {
    let invalid = |value: String| ChurnError::InvalidSeniorCitizen { value };
    match cell {
        Cell::Int(i) => Ok(*i as f64),
        Cell::Num(x) if x.is_finite() => Ok(x.trunc()),
        Cell::Num(x) => Err(invalid(x.to_string())),
        Cell::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Cell::Text(s) => s
            .trim()
            .parse::<i64>()
            .map(|i| i as f64)
            .map_err(|_| invalid(s.clone())),
        Cell::Missing => Err(invalid("missing".to_string())),
    }
}

/// One-hot category. Numbers order numerically and ahead of text.
#[derive(Debug, Clone, PartialEq)]
enum Category {
    Number(f64, String),
    Text(String),
}

impl Category {
    /// `floats` is set when the column holds any float, which widens integers
    /// (`3` is labelled `3.0`).
    fn of(cell: &Cell, floats: bool) -> Option<Self> {
        match cell {
            Cell::Missing => None,
            Cell::Bool(b) => Some(Category::Number(
                if *b { 1.0 } else { 0.0 },
                if *b { "True" } else { "False" }.to_string(),
            )),
            Cell::Int(i) if floats => Some(Category::Number(*i as f64, format!("{:?}", *i as f64))),
            Cell::Int(i) => Some(Category::Number(*i as f64, i.to_string())),
            Cell::Num(x) => Some(Category::Number(*x, format!("{:?}", x))),
            Cell::Text(s) => Some(Category::Text(s.clone())),
        }
    }

    fn label(&self) -> &str {
        match self {
            Category::Number(_, label) | Category::Text(label) => label,
        }
    }

    fn order(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Category::Number(a, _), Category::Number(b, _)) => a.total_cmp(b),
            (Category::Number(..), Category::Text(_)) => Ordering::Less,
            (Category::Text(_), Category::Number(..)) => Ordering::Greater,
            (Category::Text(a), Category::Text(b)) => a.cmp(b),
        }
    }
}

/// Parse text the way a lenient numeric coercion does; failures become missing.
fn coerce_text(text: &str) -> Cell {
    match text.trim().parse::<f64>() {
        Ok(x) if !x.is_nan() => Cell::Num(x),
        _ => Cell::Missing,
    }
}

/// Stateless encoder bound to one feature schema.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    schema: FeatureSchema,
}

impl Preprocessor {
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Encode one record into a row aligned to the schema.
    pub fn encode(&self, record: &RawRecord) -> Result<EncodedRow> {
        let frame = self.encode_frame(std::slice::from_ref(record))?;
        // one record in, one row out
        Ok(frame.into_rows().remove(0))
    }

    /// Encode several records together.
    ///
    /// One-hot categories are taken from the records in this call, so the
    /// drop-first reference level depends on the frame contents.
    pub fn encode_frame(&self, records: &[RawRecord]) -> Result<EncodedFrame> {
        let mut frame = WorkFrame::from_records(records);

        for field in DROPPED_FIELDS {
            frame.remove(field);
        }

        for field in BINARY_FIELDS {
            if let Some(cells) = frame.column_mut(field) {
                replace_literals(cells, &BINARY_MAP);
            }
        }

        if let Some(cells) = frame.column_mut(SENIOR_CITIZEN) {
            for cell in cells.iter_mut() {
                *cell = Cell::Num(coerce_senior_citizen(cell)?);
            }
        } else {
            let n_rows = frame.n_rows;
            frame.push(SENIOR_CITIZEN.to_string(), vec![Cell::Num(0.0); n_rows]);
        }

        for field in MULTI_CATEGORY_FIELDS {
            if let Some(cells) = frame.column_mut(field) {
                replace_literals(cells, &MULTI_CATEGORY_MAP);
            }
        }

        for (field, table) in ORDINAL_FIELDS {
            if let Some(cells) = frame.column_mut(field) {
                replace_literals(cells, table);
            }
        }

        if let Some(cells) = frame.remove(PAYMENT_METHOD) {
            let floats = cells.iter().any(|cell| matches!(cell, Cell::Num(_)));
            let values: Vec<Option<Category>> =
                cells.iter().map(|cell| Category::of(cell, floats)).collect();
            let mut categories: Vec<&Category> = values.iter().flatten().collect();
            categories.sort_by(|a, b| a.order(b));
            categories.dedup_by(|a, b| a.label() == b.label());
            for category in categories.into_iter().skip(1) {
                let indicator = values
                    .iter()
                    .map(|value| {
                        Cell::Bool(value.as_ref().map(Category::label) == Some(category.label()))
                    })
                    .collect();
                frame.push(format!("{}_{}", PAYMENT_METHOD, category.label()), indicator);
            }
        }

        for cells in frame.columns.iter_mut() {
            for cell in cells.iter_mut() {
                if let Cell::Text(text) = cell {
                    *cell = coerce_text(text);
                }
                if *cell == Cell::Missing {
                    *cell = Cell::Num(0.0);
                }
            }
        }

        Ok(self.reindex(frame))
    }

    /// Align to the schema, zero-fill absent columns, drop extras, bools -> 0/1.
    fn reindex(&self, frame: WorkFrame) -> EncodedFrame {
        let dropped: Vec<&String> = frame
            .names
            .iter()
            .filter(|n| self.schema.position(n).is_none())
            .collect();
        if !dropped.is_empty() {
            debug!("Dropping columns outside feature schema: {:?}", dropped);
        }

        let source: Vec<Option<usize>> = self
            .schema
            .columns()
            .iter()
            .map(|name| frame.position(name))
            .collect();

        let rows = (0..frame.n_rows)
            .map(|row| {
                source
                    .iter()
                    .map(|col| match col.map(|c| &frame.columns[c][row]) {
                        Some(Cell::Num(x)) => *x,
                        Some(Cell::Int(i)) => *i as f64,
                        Some(Cell::Bool(true)) => 1.0,
                        _ => 0.0,
                    })
                    .collect()
            })
            .collect();

        EncodedFrame::from_aligned(self.schema.shared_columns(), rows)
    }
}
