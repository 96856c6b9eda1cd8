//! Error types for the rubric engine.
//!
//! [`ClassifyError`] is the top-level error returned by the orchestrator
//! and its collaborators. Variants are grouped into per-item fatal errors
//! (taxonomy gaps, malformed verdicts) and environmental ones (AI
//! unavailable, store failures) so callers can decide what to count and
//! what to surface. Low-confidence early stops and validator corrections
//! are NOT errors — they are normal results carrying flags.

use thiserror::Error;

use crate::taxonomy::Level;

/// Top-level error type for classification operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ClassifyError {
    /// No candidates exist at a level where the taxonomy shape says some
    /// should. Fatal for the item.
    #[error("taxonomy gap: no children under '{parent_code}' at level {level}")]
    TaxonomyGap {
        /// Parent whose children were requested. Empty for the roots.
        parent_code: String,
        /// The level that came up empty.
        level: Level,
    },

    /// The circuit breaker is open; no HTTP call was made.
    #[error("ai service unavailable: {0}")]
    AiUnavailable(String),

    /// The AI response could not be parsed, or referenced a code that is
    /// not among the offered candidates.
    #[error("malformed ai verdict: {0}")]
    AiMalformed(String),

    /// The classification was cancelled before completion. No cache
    /// write and no persistence happened.
    #[error("classification cancelled")]
    Cancelled,

    /// The request was rejected before entering the pipeline.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The taxonomy dump could not be loaded or failed validation.
    #[error("taxonomy load failed: {0}")]
    TaxonomyLoad(String),

    /// The result store reported a failure.
    #[error("result store error: {0}")]
    Store(String),

    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A convenience alias used throughout the engine.
pub type Result<T> = std::result::Result<T, ClassifyError>;
