//! Shared command plumbing: config loading and engine construction.

pub mod bulk;
pub mod classify;
pub mod status;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use rubric_core::pipeline::classifier::HierarchicalClassifier;
use rubric_core::taxonomy::{load_taxonomy, JsonFileSource, Taxonomy};
use rubric_llm::{AiGateway, BackendConfig, OpenAiCompatBackend};
use rubric_types::EngineConfig;

/// Environment variable naming the API key for the default backend.
const API_KEY_ENV: &str = "RUBRIC_API_KEY";

/// Environment variable overriding the completion endpoint base URL.
const BASE_URL_ENV: &str = "RUBRIC_BASE_URL";

/// Load the engine config from a JSON file, or defaults when no path is
/// given.
pub async fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: EngineConfig =
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}

/// The backend the CLI talks to, from environment variables.
pub fn backend_config() -> BackendConfig {
    let base_url = std::env::var(BASE_URL_ENV)
        .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
    BackendConfig {
        name: "openai".into(),
        base_url,
        api_key_env: API_KEY_ENV.into(),
        default_model: Some("gpt-4o-mini".into()),
        headers: HashMap::new(),
    }
}

/// Build the full pipeline: taxonomy from a dump file, gateway from the
/// environment, orchestrator from both.
pub async fn build_classifier(
    taxonomy_path: &Path,
    config: &EngineConfig,
) -> anyhow::Result<(Arc<Taxonomy>, Arc<HierarchicalClassifier>)> {
    let source = JsonFileSource::new(taxonomy_path);
    let taxonomy = Arc::new(
        load_taxonomy(&source)
            .await
            .with_context(|| format!("loading taxonomy {}", taxonomy_path.display()))?,
    );

    let backend = Arc::new(OpenAiCompatBackend::new(backend_config()));
    let gateway = Arc::new(AiGateway::new(backend, config));
    let classifier = Arc::new(HierarchicalClassifier::new(
        taxonomy.clone(),
        gateway,
        config.clone(),
    ));
    Ok((taxonomy, classifier))
}
