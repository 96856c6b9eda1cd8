//! The [`CompletionBackend`] trait: the transport seam of the gateway.
//!
//! Implementations handle the protocol details of one completion API.
//! The shipped implementation is
//! [`OpenAiCompatBackend`](crate::openai_compat::OpenAiCompatBackend);
//! tests substitute scripted backends.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChatRequest, ChatResponse};

/// A backend that can execute chat completion requests.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Returns the backend name (e.g. "openai", "local").
    fn name(&self) -> &str;

    /// The model to use when the engine config does not pin one.
    fn default_model(&self) -> Option<&str> {
        None
    }

    /// Execute a chat completion request and return the parsed response.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`](crate::error::GatewayError) on network
    /// failure, non-2xx status, an application-level `error` object, or
    /// a response without choices.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse>;
}
