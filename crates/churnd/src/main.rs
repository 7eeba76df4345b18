//! Churn Daemon - serves the churn model over HTTP
//!
//! Loads the feature schema and model artifact once, then serves
//! `/`, `/predict`, `/ui` and `/metrics`.

use anyhow::{Context, Result};
use churnd::config::{Config, ModelSourceKind};
use churnd::server::{self, AppState};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "churnd", version, about = "Customer churn prediction server")]
struct Cli {
    /// Config file (TOML)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Listen address, overrides server.bind
    #[arg(long)]
    bind: Option<String>,

    /// Local model artifact, overrides the configured model source
    #[arg(long)]
    model: Option<PathBuf>,

    /// Feature schema file, overrides model.feature_schema_path
    #[arg(long)]
    schema: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();
    info!("churnd v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(model) = cli.model {
        config.model.source = ModelSourceKind::Local;
        config.model.path = model;
    }
    if let Some(schema) = cli.schema {
        config.model.feature_schema_path = schema;
    }

    let state = AppState::initialize(&config)
        .await
        .context("startup failed")?;
    info!(
        "Model ready: {} ({} features)",
        state.predictor.model().describe(),
        state.predictor.preprocessor().schema().len()
    );

    server::run(state, &config.server).await
}
