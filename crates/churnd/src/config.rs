//! Configuration management for churnd.
//!
//! Loads settings from a TOML file or uses defaults. Lookup order:
//! explicit `--config` path, `$CHURN_CONFIG`, /etc/churn/config.toml,
//! ./churn.toml, then built-in defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// System config file path
pub const CONFIG_PATH: &str = "/etc/churn/config.toml";

/// Working-directory config file
pub const LOCAL_CONFIG_PATH: &str = "churn.toml";

/// Environment override for the config file location
pub const CONFIG_ENV: &str = "CHURN_CONFIG";

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum accepted request body in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            request_timeout_secs: default_request_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// HTTP status used for `{"error": ...}` prediction payloads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStatus {
    /// 200, compatible with existing API clients
    #[default]
    Ok,
    /// 500
    ServerError,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default)]
    pub error_status: ErrorStatus,
}

/// Where the model artifact comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSourceKind {
    #[default]
    Local,
    Registry,
}

/// Model registry settings, used when `model.source = "registry"`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registry base URL
    #[serde(default = "default_registry_url")]
    pub url: String,

    /// Registered model name
    #[serde(default = "default_registry_name")]
    pub name: String,

    /// Stage or version to resolve (e.g. "Production", "3")
    #[serde(default = "default_registry_reference")]
    pub reference: String,

    /// Directory for downloaded artifacts; platform cache dir when unset
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// HTTP timeout in seconds
    #[serde(default = "default_registry_timeout")]
    pub timeout_secs: u64,
}

fn default_registry_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_registry_name() -> String {
    "telco-churn".to_string()
}

fn default_registry_reference() -> String {
    "Production".to_string()
}

fn default_registry_timeout() -> u64 {
    30
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            name: default_registry_name(),
            reference: default_registry_reference(),
            cache_dir: None,
            timeout_secs: default_registry_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub source: ModelSourceKind,

    /// Artifact path for the local source
    #[serde(default = "default_model_path")]
    pub path: PathBuf,

    /// Feature schema (ordered column list)
    #[serde(default = "default_feature_schema_path")]
    pub feature_schema_path: PathBuf,

    #[serde(default)]
    pub registry: RegistryConfig,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("artifacts").join(churn_common::model::MODEL_FILE)
}

fn default_feature_schema_path() -> PathBuf {
    PathBuf::from("artifacts").join(churn_common::schema::FEATURE_SCHEMA_FILE)
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            source: ModelSourceKind::default(),
            path: default_model_path(),
            feature_schema_path: default_feature_schema_path(),
            registry: RegistryConfig::default(),
        }
    }
}

/// Resolved model loading strategy
#[derive(Debug, Clone)]
pub enum ModelSource {
    Local(PathBuf),
    Registry(RegistryConfig),
}

impl std::fmt::Display for ModelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(path) => write!(f, "local:{}", path.display()),
            Self::Registry(r) => write!(f, "registry:{}/{}@{}", r.url, r.name, r.reference),
        }
    }
}

/// Full daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub model: ModelConfig,
}

impl Config {
    /// Load config following the lookup order. An explicit path must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::load_from_path(Path::new(&path));
        }

        for candidate in [CONFIG_PATH, LOCAL_CONFIG_PATH] {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        warn!("Config not found, using defaults");
        Ok(Config::default())
    }

    /// Load config from specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn model_source(&self) -> ModelSource {
        match self.model.source {
            ModelSourceKind::Local => ModelSource::Local(self.model.path.clone()),
            ModelSourceKind::Registry => ModelSource::Registry(self.model.registry.clone()),
        }
    }
}
