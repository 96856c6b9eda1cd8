//! The AI gateway façade.
//!
//! [`AiGateway::complete`] is the single entry point the pipeline uses
//! to talk to the model. Every call:
//!
//! 1. is refused immediately with [`GatewayError::CircuitOpen`] when the
//!    breaker is open;
//! 2. takes a token from the process-wide bucket (cancellation-aware);
//! 3. runs the HTTP request under the per-call timeout;
//! 4. records the outcome on the breaker;
//! 5. returns the completion text with Markdown code fences stripped.
//!
//! The text is NOT parsed into JSON here — that is the caller's job.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use rubric_types::EngineConfig;

use crate::breaker::{BreakerSnapshot, CircuitBreaker};
use crate::error::{GatewayError, Result};
use crate::provider::CompletionBackend;
use crate::rate_limit::TokenBucket;
use crate::types::ChatRequest;

/// Default sampling temperature for classification calls.
const DEFAULT_TEMPERATURE: f64 = 0.3;

/// Default completion budget per call.
const DEFAULT_MAX_TOKENS: i32 = 1024;

/// Model used when neither the engine config nor the backend pins one.
const FALLBACK_MODEL: &str = "gpt-4o-mini";

/// Rate-limited, breaker-guarded front of a [`CompletionBackend`].
pub struct AiGateway {
    backend: Arc<dyn CompletionBackend>,
    limiter: TokenBucket,
    breaker: CircuitBreaker,
    model: String,
    temperature: f64,
    max_tokens: i32,
    http_timeout: Duration,
}

impl AiGateway {
    /// Build a gateway from engine configuration.
    ///
    /// The model is resolved once: config `ai_model`, else the backend's
    /// default, else a built-in fallback.
    pub fn new(backend: Arc<dyn CompletionBackend>, config: &EngineConfig) -> Self {
        let model = config
            .ai_model
            .clone()
            .or_else(|| backend.default_model().map(String::from))
            .unwrap_or_else(|| FALLBACK_MODEL.to_string());

        Self {
            limiter: TokenBucket::new(config.rate_limit_per_sec, config.rate_limit_burst),
            breaker: CircuitBreaker::new(
                config.cb_failure_threshold,
                config.cb_success_threshold,
                config.cb_cooldown(),
            ),
            http_timeout: config.http_timeout(),
            model,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            backend,
        }
    }

    /// Execute one completion and return the fence-stripped text.
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if !self.breaker.can_proceed() {
            return Err(GatewayError::CircuitOpen);
        }

        self.limiter.acquire(cancel).await?;

        let request = ChatRequest::new(
            self.model.clone(),
            system,
            user,
            self.temperature,
            self.max_tokens,
        );

        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(GatewayError::Cancelled),
            result = tokio::time::timeout(self.http_timeout, self.backend.complete(&request)) => {
                match result {
                    Ok(inner) => inner,
                    Err(_) => Err(GatewayError::Timeout(self.http_timeout)),
                }
            }
        };

        match outcome {
            Ok(response) => {
                self.breaker.record_success();
                let text = response
                    .choices
                    .first()
                    .map(|c| c.message.content.clone())
                    .unwrap_or_default();
                debug!(
                    backend = %self.backend.name(),
                    chars = text.len(),
                    "completion received"
                );
                Ok(strip_code_fences(&text))
            }
            Err(err) => {
                if err.counts_as_failure() {
                    self.breaker.record_failure();
                }
                Err(err)
            }
        }
    }

    /// The resolved model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Current breaker diagnostics.
    pub fn snapshot(&self) -> BreakerSnapshot {
        self.breaker.snapshot()
    }

    /// Tokens currently available in the rate limiter.
    pub fn tokens_available(&self) -> f64 {
        self.limiter.available()
    }
}

/// Remove leading/trailing Markdown code fences (```` ```json ````,
/// ```` ``` ````) from completion text.
pub fn strip_code_fences(input: &str) -> String {
    let trimmed = input.trim();

    let after_open = if let Some(stripped) = trimmed.strip_prefix("```json") {
        stripped
    } else if let Some(stripped) = trimmed.strip_prefix("```") {
        stripped
    } else {
        return trimmed.to_string();
    };

    let after_open = after_open.strip_prefix('\n').unwrap_or(after_open);

    let before_close = if let Some(stripped) = after_open.trim_end().strip_suffix("```") {
        stripped.trim_end()
    } else {
        after_open
    };

    before_close.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::types::{ChatMessage, ChatResponse, Choice};

    /// A backend that fails a configurable number of times before
    /// succeeding, counting every call.
    struct MockBackend {
        calls: AtomicU32,
        failures_remaining: AtomicU32,
        reply: String,
    }

    impl MockBackend {
        fn new(failures: u32, reply: &str) -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures_remaining: AtomicU32::new(failures),
                reply: reply.into(),
            }
        }
    }

    #[async_trait]
    impl CompletionBackend for MockBackend {
        fn name(&self) -> &str {
            "mock"
        }

        fn default_model(&self) -> Option<&str> {
            Some("mock-model")
        }

        async fn complete(&self, _request: &ChatRequest) -> Result<ChatResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures_remaining.load(Ordering::SeqCst) > 0 {
                self.failures_remaining.fetch_sub(1, Ordering::SeqCst);
                return Err(GatewayError::RequestFailed("HTTP 500: boom".into()));
            }
            Ok(ChatResponse {
                id: Some("resp-1".into()),
                choices: vec![Choice {
                    index: 0,
                    message: ChatMessage::new("assistant", self.reply.clone()),
                    finish_reason: Some("stop".into()),
                }],
                usage: None,
                model: Some("mock-model".into()),
                error: None,
            })
        }
    }

    fn fast_config() -> EngineConfig {
        EngineConfig {
            rate_limit_per_sec: 1000.0,
            rate_limit_burst: 100,
            cb_failure_threshold: 3,
            cb_success_threshold: 2,
            cb_cooldown_secs: 0,
            http_timeout_secs: 5,
            ..EngineConfig::default()
        }
    }

    #[tokio::test]
    async fn complete_returns_stripped_text() {
        let backend = Arc::new(MockBackend::new(0, "```json\n{\"a\":1}\n```"));
        let gateway = AiGateway::new(backend, &fast_config());
        let cancel = CancellationToken::new();

        let text = gateway.complete("sys", "usr", &cancel).await.unwrap();
        assert_eq!(text, "{\"a\":1}");
    }

    #[tokio::test]
    async fn model_resolution_prefers_config() {
        let backend = Arc::new(MockBackend::new(0, "ok"));
        let mut config = fast_config();
        config.ai_model = Some("pinned-model".into());
        let gateway = AiGateway::new(backend.clone(), &config);
        assert_eq!(gateway.model(), "pinned-model");

        let gateway = AiGateway::new(backend, &fast_config());
        assert_eq!(gateway.model(), "mock-model");
    }

    #[tokio::test]
    async fn failures_trip_breaker_and_refuse_calls() {
        let backend = Arc::new(MockBackend::new(100, "never"));
        let mut config = fast_config();
        config.cb_cooldown_secs = 3600;
        let gateway = AiGateway::new(backend.clone(), &config);
        let cancel = CancellationToken::new();

        for _ in 0..3 {
            let err = gateway.complete("s", "u", &cancel).await.unwrap_err();
            assert!(matches!(err, GatewayError::RequestFailed(_)));
        }

        // Breaker is now open: no further backend calls happen.
        let err = gateway.complete("s", "u", &cancel).await.unwrap_err();
        assert!(matches!(err, GatewayError::CircuitOpen));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn breaker_recovers_after_cooldown() {
        let backend = Arc::new(MockBackend::new(3, "recovered"));
        let gateway = AiGateway::new(backend, &fast_config());
        let cancel = CancellationToken::new();

        for _ in 0..3 {
            let _ = gateway.complete("s", "u", &cancel).await;
        }
        // Zero-cooldown config: next call is a half-open probe.
        let text = gateway.complete("s", "u", &cancel).await.unwrap();
        assert_eq!(text, "recovered");
    }

    #[tokio::test]
    async fn cancelled_call_is_not_a_breaker_failure() {
        let backend = Arc::new(MockBackend::new(0, "ok"));
        let gateway = AiGateway::new(backend, &fast_config());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = gateway.complete("s", "u", &cancel).await.unwrap_err();
        assert!(matches!(err, GatewayError::Cancelled));
        assert_eq!(gateway.snapshot().failure_count, 0);
    }

    #[test]
    fn strip_fences_variants() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("  plain text  "), "plain text");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences(""), "");
    }
}
