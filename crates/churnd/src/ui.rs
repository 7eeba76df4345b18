//! Form UI for manual testing.
//!
//! `GET /ui` renders the customer form (optionally pre-filled with a demo
//! customer via `?example=1|2`), `POST /ui` scores the submitted form and
//! shows `<label> (prob=<probability>)` in the result box.

use crate::server::AppState;
use axum::{
    extract::{Query, State},
    response::Html,
    routing::get,
    Form, Router,
};
use churn_common::{CustomerData, RawRecord};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

type AppStateArc = Arc<AppState>;

const YES_NO: &[&str] = &["Yes", "No"];
const INTERNET_ADDON: &[&str] = &["Yes", "No", "No internet service"];

enum Input {
    Select(&'static [&'static str]),
    Number,
}

struct FieldSpec {
    name: &'static str,
    label: &'static str,
    input: Input,
    default: &'static str,
}

const fn select(
    name: &'static str,
    label: &'static str,
    options: &'static [&'static str],
    default: &'static str,
) -> FieldSpec {
    FieldSpec {
        name,
        label,
        input: Input::Select(options),
        default,
    }
}

const fn number(name: &'static str, label: &'static str, default: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        label,
        input: Input::Number,
        default,
    }
}

const FIELDS: [FieldSpec; 19] = [
    select("gender", "Gender", &["Male", "Female"], "Male"),
    select("SeniorCitizen", "Senior Citizen (1 = Yes, 0 = No)", &["0", "1"], "0"),
    select("Partner", "Partner", YES_NO, "No"),
    select("Dependents", "Dependents", YES_NO, "No"),
    select("PhoneService", "Phone Service", YES_NO, "Yes"),
    select("MultipleLines", "Multiple Lines", &["Yes", "No", "No phone service"], "No"),
    select("InternetService", "Internet Service", &["DSL", "Fiber optic", "No"], "Fiber optic"),
    select("OnlineSecurity", "Online Security", INTERNET_ADDON, "No"),
    select("OnlineBackup", "Online Backup", INTERNET_ADDON, "No"),
    select("DeviceProtection", "Device Protection", INTERNET_ADDON, "No"),
    select("TechSupport", "Tech Support", INTERNET_ADDON, "No"),
    select("StreamingTV", "Streaming TV", INTERNET_ADDON, "Yes"),
    select("StreamingMovies", "Streaming Movies", INTERNET_ADDON, "Yes"),
    select("Contract", "Contract", &["Month-to-month", "One year", "Two year"], "Month-to-month"),
    select("PaperlessBilling", "Paperless Billing", YES_NO, "Yes"),
    select(
        "PaymentMethod",
        "Payment Method",
        &[
            "Electronic check",
            "Mailed check",
            "Bank transfer (automatic)",
            "Credit card (automatic)",
        ],
        "Electronic check",
    ),
    number("tenure", "Tenure (months)", "1"),
    number("MonthlyCharges", "Monthly Charges ($)", "85.0"),
    number("TotalCharges", "Total Charges ($)", "85.0"),
];

type FormValues = HashMap<String, String>;

fn default_values() -> FormValues {
    FIELDS
        .iter()
        .map(|f| (f.name.to_string(), f.default.to_string()))
        .collect()
}

fn example_values(index: usize) -> Option<FormValues> {
    let customer = match index {
        1 => CustomerData::example_month_to_month(),
        2 => CustomerData::example_two_year(),
        _ => return None,
    };
    let json = serde_json::to_value(customer).ok()?;
    let values = json
        .as_object()?
        .iter()
        .map(|(k, v)| {
            let text = match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), text)
        })
        .collect();
    Some(values)
}

/// Build the typed payload from submitted form fields.
fn to_customer(values: &FormValues) -> Result<CustomerData, String> {
    let text = |name: &str| {
        values
            .get(name)
            .map(|v| v.trim().to_string())
            .ok_or_else(|| format!("missing field {}", name))
    };
    let number = |name: &str| -> Result<f64, String> {
        let raw = text(name)?;
        raw.parse::<f64>()
            .ok()
            .filter(|x| x.is_finite())
            .ok_or_else(|| format!("{} must be a number, got {:?}", name, raw))
    };

    let senior = text("SeniorCitizen")?;
    let senior_citizen = senior
        .parse::<i64>()
        .map_err(|_| format!("SeniorCitizen must be 0 or 1, got {:?}", senior))?;

    Ok(CustomerData {
        gender: text("gender")?,
        senior_citizen: Some(senior_citizen),
        partner: text("Partner")?,
        dependents: text("Dependents")?,
        phone_service: text("PhoneService")?,
        multiple_lines: text("MultipleLines")?,
        internet_service: text("InternetService")?,
        online_security: text("OnlineSecurity")?,
        online_backup: text("OnlineBackup")?,
        device_protection: text("DeviceProtection")?,
        tech_support: text("TechSupport")?,
        streaming_tv: text("StreamingTV")?,
        streaming_movies: text("StreamingMovies")?,
        contract: text("Contract")?,
        paperless_billing: text("PaperlessBilling")?,
        payment_method: text("PaymentMethod")?,
        // whole months, fractional input truncates
        tenure: number("tenure")?.trunc() as i64,
        monthly_charges: number("MonthlyCharges")?,
        total_charges: number("TotalCharges")?,
    })
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_page(values: &FormValues, result: Option<&str>) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Telco Customer Churn Predictor</title>\n</head>\n<body>\n\
         <h1>Telco Customer Churn Predictor</h1>\n\
         <p>Predict customer churn using a machine learning model trained on historical telecom customer data.</p>\n\
         <p>Examples: <a href=\"/ui?example=1\">month-to-month fiber</a> | \
         <a href=\"/ui?example=2\">two-year DSL</a></p>\n\
         <form method=\"post\" action=\"/ui\">\n",
    );

    for field in FIELDS.iter() {
        let current = values
            .get(field.name)
            .map(String::as_str)
            .unwrap_or(field.default);
        let _ = write!(
            html,
            "<p><label for=\"{name}\">{label}</label><br>\n",
            name = field.name,
            label = escape(field.label)
        );
        match field.input {
            Input::Select(options) => {
                let _ = writeln!(html, "<select id=\"{0}\" name=\"{0}\">", field.name);
                for option in options {
                    let selected = if *option == current { " selected" } else { "" };
                    let _ = writeln!(
                        html,
                        "<option value=\"{0}\"{1}>{0}</option>",
                        escape(option),
                        selected
                    );
                }
                html.push_str("</select></p>\n");
            }
            Input::Number => {
                let _ = writeln!(
                    html,
                    "<input type=\"number\" step=\"any\" min=\"0\" id=\"{0}\" name=\"{0}\" value=\"{1}\"></p>",
                    field.name,
                    escape(current)
                );
            }
        }
    }

    html.push_str("<button type=\"submit\">Predict</button>\n</form>\n");
    let _ = writeln!(
        html,
        "<h2>Churn Prediction</h2>\n<textarea id=\"result\" rows=\"2\" cols=\"60\" readonly>{}</textarea>",
        escape(result.unwrap_or(""))
    );
    html.push_str("</body>\n</html>\n");
    html
}

#[derive(Debug, Deserialize)]
pub struct UiQuery {
    pub example: Option<usize>,
}

pub fn ui_routes() -> Router<AppStateArc> {
    Router::new().route("/ui", get(show_form).post(submit_form))
}

async fn show_form(Query(query): Query<UiQuery>) -> Html<String> {
    let values = query
        .example
        .and_then(example_values)
        .unwrap_or_else(default_values);
    Html(render_page(&values, None))
}

async fn submit_form(
    State(state): State<AppStateArc>,
    Form(values): Form<FormValues>,
) -> Html<String> {
    let result = to_customer(&values)
        .and_then(|customer| {
            state
                .predict(&RawRecord::from(customer), "ui")
                .map_err(|e| e.to_string())
        })
        .map(|prediction| prediction.summary())
        .unwrap_or_else(|e| format!("Error: {}", e));
    Html(render_page(&values, Some(&result)))
}
