//! Engine configuration schema.
//!
//! All tunables recognized by the core, as one serde-loadable struct.
//! Fields accept both `snake_case` and `camelCase` names; unknown fields
//! are ignored for forward compatibility. There are no hidden globals:
//! the orchestrator, gateway, and bulk runner are constructed with this
//! struct and pass it down.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for the classification engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Early-stop threshold in the level loop.
    #[serde(default = "default_min_confidence", alias = "minConfidence")]
    pub min_confidence: f64,

    /// Maximum taxonomy depth attempted.
    #[serde(default = "default_max_levels", alias = "maxLevels")]
    pub max_levels: usize,

    /// Model identifier forwarded to the AI call. `None` uses the
    /// provider's default model.
    #[serde(default, alias = "aiModel")]
    pub ai_model: Option<String>,

    /// Token-bucket refill rate, tokens per second.
    #[serde(default = "default_rate_limit_per_sec", alias = "rateLimitPerSec")]
    pub rate_limit_per_sec: f64,

    /// Token-bucket capacity (burst size).
    #[serde(default = "default_rate_limit_burst", alias = "rateLimitBurst")]
    pub rate_limit_burst: u32,

    /// Consecutive failures that trip the circuit breaker open.
    #[serde(default = "default_cb_failure_threshold", alias = "cbFailureThreshold")]
    pub cb_failure_threshold: u32,

    /// Consecutive half-open successes required to close the breaker.
    #[serde(default = "default_cb_success_threshold", alias = "cbSuccessThreshold")]
    pub cb_success_threshold: u32,

    /// Open → half-open cooldown, seconds.
    #[serde(default = "default_cb_cooldown_secs", alias = "cbCooldownSecs")]
    pub cb_cooldown_secs: u64,

    /// Per-AI-call HTTP timeout, seconds.
    #[serde(default = "default_http_timeout_secs", alias = "httpTimeoutSecs")]
    pub http_timeout_secs: u64,

    /// Bulk worker pool size.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Bulk pacing: pause after every this many completed items.
    #[serde(default = "default_throttle_every", alias = "throttleEvery")]
    pub throttle_every: usize,

    /// Bulk pacing: pause duration, milliseconds.
    #[serde(default = "default_throttle_sleep_ms", alias = "throttleSleepMs")]
    pub throttle_sleep_ms: u64,

    /// Admission gate for the root-word cache.
    #[serde(
        default = "default_root_cache_min_confidence",
        alias = "rootCacheMinConfidence"
    )]
    pub root_cache_min_confidence: f64,
}

fn default_min_confidence() -> f64 {
    0.7
}
fn default_max_levels() -> usize {
    4
}
fn default_rate_limit_per_sec() -> f64 {
    1.0
}
fn default_rate_limit_burst() -> u32 {
    5
}
fn default_cb_failure_threshold() -> u32 {
    5
}
fn default_cb_success_threshold() -> u32 {
    2
}
fn default_cb_cooldown_secs() -> u64 {
    30
}
fn default_http_timeout_secs() -> u64 {
    60
}
fn default_concurrency() -> usize {
    6
}
fn default_throttle_every() -> usize {
    5
}
fn default_throttle_sleep_ms() -> u64 {
    200
}
fn default_root_cache_min_confidence() -> f64 {
    0.9
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            max_levels: default_max_levels(),
            ai_model: None,
            rate_limit_per_sec: default_rate_limit_per_sec(),
            rate_limit_burst: default_rate_limit_burst(),
            cb_failure_threshold: default_cb_failure_threshold(),
            cb_success_threshold: default_cb_success_threshold(),
            cb_cooldown_secs: default_cb_cooldown_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            concurrency: default_concurrency(),
            throttle_every: default_throttle_every(),
            throttle_sleep_ms: default_throttle_sleep_ms(),
            root_cache_min_confidence: default_root_cache_min_confidence(),
        }
    }
}

impl EngineConfig {
    /// Circuit breaker cooldown as a `Duration`.
    pub fn cb_cooldown(&self) -> Duration {
        Duration::from_secs(self.cb_cooldown_secs)
    }

    /// HTTP timeout as a `Duration`.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Bulk throttle pause as a `Duration`.
    pub fn throttle_sleep(&self) -> Duration {
        Duration::from_millis(self.throttle_sleep_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert!((config.min_confidence - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.max_levels, 4);
        assert!(config.ai_model.is_none());
        assert!((config.rate_limit_per_sec - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.rate_limit_burst, 5);
        assert_eq!(config.cb_failure_threshold, 5);
        assert_eq!(config.cb_success_threshold, 2);
        assert_eq!(config.cb_cooldown(), Duration::from_secs(30));
        assert_eq!(config.http_timeout(), Duration::from_secs(60));
        assert_eq!(config.throttle_every, 5);
        assert_eq!(config.throttle_sleep(), Duration::from_millis(200));
        assert!((config.root_cache_min_confidence - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_json_yields_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.concurrency, 6);
        assert_eq!(config.cb_failure_threshold, 5);
    }

    #[test]
    fn camel_case_aliases_accepted() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"minConfidence": 0.8, "cbCooldownSecs": 10, "throttleSleepMs": 50, "aiModel": "gpt-4o"}"#,
        )
        .unwrap();
        assert!((config.min_confidence - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.cb_cooldown(), Duration::from_secs(10));
        assert_eq!(config.throttle_sleep(), Duration::from_millis(50));
        assert_eq!(config.ai_model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn unknown_fields_ignored() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"futureKnob": true, "concurrency": 8}"#).unwrap();
        assert_eq!(config.concurrency, 8);
    }
}
