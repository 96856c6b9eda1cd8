//! AI gateway for the rubric classification engine.
//!
//! A single façade — [`AiGateway::complete`] — fronts an
//! OpenAI-compatible chat-completions endpoint with a token-bucket rate
//! limiter and a three-state circuit breaker. The gateway returns the
//! raw completion text (Markdown fences stripped); parsing the text into
//! a verdict is the caller's job.
//!
//! # Architecture
//!
//! - [`CompletionBackend`] trait defines the chat completion seam
//! - [`OpenAiCompatBackend`] implements it for any OpenAI-compatible API
//! - [`TokenBucket`] serializes outgoing calls (default 1/s, burst 5)
//! - [`CircuitBreaker`] refuses calls after repeated failures
//! - [`AiGateway`] composes the three and owns the request defaults

pub mod breaker;
pub mod error;
pub mod gateway;
pub mod openai_compat;
pub mod provider;
pub mod rate_limit;
pub mod types;

pub use breaker::{BreakerSnapshot, BreakerState, CircuitBreaker};
pub use error::{GatewayError, Result};
pub use gateway::AiGateway;
pub use openai_compat::{BackendConfig, OpenAiCompatBackend};
pub use provider::CompletionBackend;
pub use rate_limit::TokenBucket;
pub use types::{ChatMessage, ChatRequest, ChatResponse, Choice, Usage};
