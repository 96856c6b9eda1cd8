//! OpenAI-compatible backend implementation.
//!
//! [`OpenAiCompatBackend`] works with any API that follows the OpenAI
//! chat completion format by pointing `base_url` at the right endpoint.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{GatewayError, Result};
use crate::provider::CompletionBackend;
use crate::types::{ChatRequest, ChatResponse};

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Backend name used in logs.
    pub name: String,

    /// API base URL, e.g. `https://api.openai.com/v1`.
    pub base_url: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Model used when the engine config does not pin one.
    pub default_model: Option<String>,

    /// Extra headers sent with every request.
    pub headers: HashMap<String, String>,
}

/// A completion backend speaking the OpenAI chat completion API.
pub struct OpenAiCompatBackend {
    config: BackendConfig,
    http: reqwest::Client,
    api_key: Option<String>,
}

impl OpenAiCompatBackend {
    /// Create a backend from configuration.
    ///
    /// The API key is resolved from `config.api_key_env` at request time.
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            api_key: None,
        }
    }

    /// Create a backend with an explicit API key, bypassing the
    /// environment lookup.
    pub fn with_api_key(config: BackendConfig, api_key: String) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            api_key: Some(api_key),
        }
    }

    /// Returns the backend configuration.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Returns the chat completions endpoint URL.
    fn completions_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/chat/completions")
    }

    /// Resolve the API key: explicit key > environment variable.
    fn resolve_api_key(&self) -> Result<String> {
        if let Some(ref key) = self.api_key {
            return Ok(key.clone());
        }
        std::env::var(&self.config.api_key_env).map_err(|_| {
            GatewayError::NotConfigured(format!("set {} env var", self.config.api_key_env))
        })
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn default_model(&self) -> Option<&str> {
        self.config.default_model.as_deref()
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let api_key = self.resolve_api_key()?;
        let url = self.completions_url();

        debug!(
            backend = %self.config.name,
            model = %request.model,
            "sending chat completion request"
        );

        let mut req = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json");

        for (k, v) in &self.config.headers {
            req = req.header(k.as_str(), v.as_str());
        }

        let response = req.json(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(GatewayError::AuthFailed(body));
            }

            if status.as_u16() == 404 {
                return Err(GatewayError::ModelNotFound(format!(
                    "model '{}': {}",
                    request.model, body
                )));
            }

            return Err(GatewayError::RequestFailed(format!("HTTP {status}: {body}")));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(format!("failed to parse response: {e}")))?;

        if let Some(api_err) = &chat_response.error {
            warn!(
                backend = %self.config.name,
                kind = api_err.kind.as_deref().unwrap_or("unknown"),
                "provider returned error object"
            );
            return Err(GatewayError::InvalidResponse(format!(
                "provider error: {}",
                api_err.message
            )));
        }

        if chat_response.choices.is_empty() {
            return Err(GatewayError::InvalidResponse("no choices in response".into()));
        }

        debug!(
            backend = %self.config.name,
            choices = chat_response.choices.len(),
            "chat completion response received"
        );

        Ok(chat_response)
    }
}

impl std::fmt::Debug for OpenAiCompatBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatBackend")
            .field("name", &self.config.name)
            .field("base_url", &self.config.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}
