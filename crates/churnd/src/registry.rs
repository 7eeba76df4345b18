//! Model registry fetcher.
//!
//! Resolves `name` + `reference` against the registry
//! (`GET {url}/models/{name}/{reference}`), validates the artifact, and keeps
//! a copy on disk. When the registry is unreachable the cached copy is used.

use crate::config::{ModelSource, RegistryConfig};
use churn_common::{load_model, model_from_json, ChurnError, ChurnModel};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Async registry fetcher
pub struct RegistryFetcher {
    client: reqwest::Client,
    config: RegistryConfig,
}

impl RegistryFetcher {
    pub fn new(config: RegistryConfig) -> Result<Self, ChurnError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChurnError::Registry(format!("HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Artifact URL for the configured model reference
    pub fn artifact_url(&self) -> String {
        format!(
            "{}/models/{}/{}",
            self.config.url.trim_end_matches('/'),
            self.config.name,
            self.config.reference
        )
    }

    /// On-disk location of the cached artifact
    pub fn cache_path(&self) -> PathBuf {
        let dir = self.config.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("churn")
                .join("models")
        });
        let file = format!(
            "{}-{}.json",
            sanitize(&self.config.name),
            sanitize(&self.config.reference)
        );
        dir.join(file)
    }

    /// Fetch the artifact text from the registry
    pub async fn fetch_remote(&self) -> Result<String, ChurnError> {
        let url = self.artifact_url();
        info!("Fetching model artifact from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ChurnError::Registry(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ChurnError::Registry(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ChurnError::Registry(format!("Failed to read response: {}", e)))
    }

    /// Load the model: registry first, then the cached copy.
    pub async fn load(&self) -> Result<Arc<dyn ChurnModel>, ChurnError> {
        let remote_error = match self.fetch_remote().await {
            Ok(text) => {
                let model = model_from_json(&text)?;
                info!("Model artifact resolved from registry: {}", model.describe());
                if let Err(e) = self.save_to_cache(&text).await {
                    warn!("Failed to cache model artifact: {}", e);
                }
                return Ok(model);
            }
            Err(e) => e,
        };

        let cache = self.cache_path();
        if !cache.exists() {
            return Err(ChurnError::Registry(format!(
                "{} and no cached artifact at {}",
                remote_error,
                cache.display()
            )));
        }
        warn!(
            "Registry unavailable ({}), using cached artifact {}",
            remote_error,
            cache.display()
        );
        load_model(&cache)
    }

    async fn save_to_cache(&self, text: &str) -> std::io::Result<()> {
        let path = self.cache_path();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, text).await
    }
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Resolve a model source into a loaded model. Failure is startup-fatal.
pub async fn resolve_model(source: &ModelSource) -> Result<Arc<dyn ChurnModel>, ChurnError> {
    match source {
        ModelSource::Local(path) => load_model(path),
        ModelSource::Registry(config) => RegistryFetcher::new(config.clone())?.load().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTIFACT: &str =
        r#"{"format": "logistic", "features": ["tenure"], "intercept": 0.0, "coefficients": [-0.1]}"#;

    fn unreachable_registry(cache_dir: PathBuf) -> RegistryConfig {
        RegistryConfig {
            // reserved port, nothing listens there
            url: "http://127.0.0.1:9/".to_string(),
            name: "telco churn".to_string(),
            reference: "Production".to_string(),
            cache_dir: Some(cache_dir),
            timeout_secs: 2,
        }
    }

    #[test]
    fn test_artifact_url_and_cache_path() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = RegistryFetcher::new(unreachable_registry(dir.path().to_path_buf())).unwrap();
        assert_eq!(
            fetcher.artifact_url(),
            "http://127.0.0.1:9/models/telco churn/Production"
        );
        assert_eq!(
            fetcher.cache_path(),
            dir.path().join("telco_churn-Production.json")
        );
    }

    #[tokio::test]
    async fn test_falls_back_to_cache() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = RegistryFetcher::new(unreachable_registry(dir.path().to_path_buf())).unwrap();
        std::fs::write(fetcher.cache_path(), ARTIFACT).unwrap();

        let model = fetcher.load().await.unwrap();
        assert_eq!(model.features(), &["tenure".to_string()]);
    }

    #[tokio::test]
    async fn test_no_registry_and_no_cache_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = RegistryFetcher::new(unreachable_registry(dir.path().to_path_buf())).unwrap();
        let err = fetcher.load().await.err().unwrap();
        assert_eq!(err.code(), "registry");
    }

    /// Serve `ARTIFACT` at `/models/telco-churn/Production`, 404 elsewhere.
    async fn serve_registry() -> String {
        use axum::{extract::Path, http::StatusCode, routing::get, Router};

        let app = Router::new().route(
            "/models/:name/:reference",
            get(|Path((name, reference)): Path<(String, String)>| async move {
                if name == "telco-churn" && reference == "Production" {
                    (StatusCode::OK, ARTIFACT)
                } else {
                    (StatusCode::NOT_FOUND, "")
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_fetch_caches_artifact_for_offline_start() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("nested").join("models");

        let online = RegistryConfig {
            url: serve_registry().await,
            name: "telco-churn".to_string(),
            ..unreachable_registry(cache_dir.clone())
        };
        let fetcher = RegistryFetcher::new(online).unwrap();
        let model = fetcher.load().await.unwrap();
        assert_eq!(model.features(), &["tenure".to_string()]);
        assert!(fetcher.cache_path().exists());

        let offline = RegistryConfig {
            name: "telco-churn".to_string(),
            ..unreachable_registry(cache_dir)
        };
        let fetcher = RegistryFetcher::new(offline).unwrap();
        let cached = fetcher.load().await.unwrap();
        assert_eq!(cached.features(), model.features());
    }

    #[tokio::test]
    async fn test_unknown_reference_without_cache_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = RegistryConfig {
            url: serve_registry().await,
            name: "telco-churn".to_string(),
            reference: "Staging".to_string(),
            ..unreachable_registry(dir.path().to_path_buf())
        };
        let fetcher = RegistryFetcher::new(config).unwrap();
        let err = fetcher.load().await.err().unwrap();
        assert!(err.to_string().contains("404"));
        assert!(!fetcher.cache_path().exists());
    }

    #[tokio::test]
    async fn test_resolve_local_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, ARTIFACT).unwrap();
        let model = resolve_model(&ModelSource::Local(path)).await.unwrap();
        assert_eq!(model.features().len(), 1);
    }
}
