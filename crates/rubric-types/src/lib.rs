//! Shared domain types for the rubric classification engine.
//!
//! This crate is deliberately I/O-free: it defines the taxonomy value
//! types, the classification request/result contract, the configuration
//! schema, and the top-level error type. All other rubric crates build
//! on these definitions.

pub mod classify;
pub mod config;
pub mod error;
pub mod taxonomy;

pub use classify::{
    AiVerdict, ClassificationRequest, ClassificationResult, ClassifyOptions, Detection,
    LevelStep, ObjectType,
};
pub use config::EngineConfig;
pub use error::{ClassifyError, Result};
pub use taxonomy::{Level, TaxonomyNode, TaxonomyRecord};
