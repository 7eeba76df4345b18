//! Churn daemon library - exposes modules for testing.

pub mod config;
pub mod metrics;
pub mod registry;
pub mod routes;
pub mod server;
pub mod ui;
