//! Raw customer records as they arrive at the serving edge.
//!
//! A [`RawRecord`] is an untyped field map (what the preprocessing stage
//! consumes). [`CustomerData`] is the typed request body accepted by the
//! HTTP layer and the form UI; it converts into a `RawRecord`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single raw field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "nan"),
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{:?}", x),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for RawValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Field name -> value map for one customer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(BTreeMap<String, RawValue>);

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, field: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<RawValue>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<RawValue> {
        self.0.remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&RawValue> {
        self.0.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Typed customer payload for `/predict` and the form UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerData {
    // Demographics
    pub gender: String,
    /// Optional on the wire; the preprocessing stage defaults it to 0
    #[serde(rename = "SeniorCitizen", default, skip_serializing_if = "Option::is_none")]
    pub senior_citizen: Option<i64>,
    #[serde(rename = "Partner")]
    pub partner: String,
    #[serde(rename = "Dependents")]
    pub dependents: String,

    // Phone services
    #[serde(rename = "PhoneService")]
    pub phone_service: String,
    #[serde(rename = "MultipleLines")]
    pub multiple_lines: String,

    // Internet services
    #[serde(rename = "InternetService")]
    pub internet_service: String,
    #[serde(rename = "OnlineSecurity")]
    pub online_security: String,
    #[serde(rename = "OnlineBackup")]
    pub online_backup: String,
    #[serde(rename = "DeviceProtection")]
    pub device_protection: String,
    #[serde(rename = "TechSupport")]
    pub tech_support: String,
    #[serde(rename = "StreamingTV")]
    pub streaming_tv: String,
    #[serde(rename = "StreamingMovies")]
    pub streaming_movies: String,

    // Account details
    #[serde(rename = "Contract")]
    pub contract: String,
    #[serde(rename = "PaperlessBilling")]
    pub paperless_billing: String,
    #[serde(rename = "PaymentMethod")]
    pub payment_method: String,

    // Numeric features
    pub tenure: i64,
    #[serde(rename = "MonthlyCharges")]
    pub monthly_charges: f64,
    #[serde(rename = "TotalCharges")]
    pub total_charges: f64,
}

impl CustomerData {
    /// New month-to-month fiber customer, the high-risk demo profile
    pub fn example_month_to_month() -> Self {
        Self {
            gender: "Female".to_string(),
            senior_citizen: Some(0),
            partner: "No".to_string(),
            dependents: "No".to_string(),
            phone_service: "Yes".to_string(),
            multiple_lines: "No".to_string(),
            internet_service: "Fiber optic".to_string(),
            online_security: "No".to_string(),
            online_backup: "No".to_string(),
            device_protection: "No".to_string(),
            tech_support: "No".to_string(),
            streaming_tv: "Yes".to_string(),
            streaming_movies: "Yes".to_string(),
            contract: "Month-to-month".to_string(),
            paperless_billing: "Yes".to_string(),
            payment_method: "Electronic check".to_string(),
            tenure: 1,
            monthly_charges: 85.0,
            total_charges: 85.0,
        }
    }

    /// Long-tenure two-year DSL customer, the low-risk demo profile
    pub fn example_two_year() -> Self {
        Self {
            gender: "Male".to_string(),
            senior_citizen: Some(0),
            partner: "Yes".to_string(),
            dependents: "Yes".to_string(),
            phone_service: "Yes".to_string(),
            multiple_lines: "Yes".to_string(),
            internet_service: "DSL".to_string(),
            online_security: "Yes".to_string(),
            online_backup: "Yes".to_string(),
            device_protection: "Yes".to_string(),
            tech_support: "Yes".to_string(),
            streaming_tv: "No".to_string(),
            streaming_movies: "No".to_string(),
            contract: "Two year".to_string(),
            paperless_billing: "No".to_string(),
            payment_method: "Credit card (automatic)".to_string(),
            tenure: 60,
            monthly_charges: 45.0,
            total_charges: 2700.0,
        }
    }
}

impl From<CustomerData> for RawRecord {
    fn from(c: CustomerData) -> Self {
        let mut record = RawRecord::new()
            .with("gender", c.gender)
            .with("Partner", c.partner)
            .with("Dependents", c.dependents)
            .with("PhoneService", c.phone_service)
            .with("MultipleLines", c.multiple_lines)
            .with("InternetService", c.internet_service)
            .with("OnlineSecurity", c.online_security)
            .with("OnlineBackup", c.online_backup)
            .with("DeviceProtection", c.device_protection)
            .with("TechSupport", c.tech_support)
            .with("StreamingTV", c.streaming_tv)
            .with("StreamingMovies", c.streaming_movies)
            .with("Contract", c.contract)
            .with("PaperlessBilling", c.paperless_billing)
            .with("PaymentMethod", c.payment_method)
            .with("tenure", c.tenure)
            .with("MonthlyCharges", c.monthly_charges)
            .with("TotalCharges", c.total_charges);
        if let Some(senior) = c.senior_citizen {
            record.insert("SeniorCitizen", senior);
        }
        record
    }
}
