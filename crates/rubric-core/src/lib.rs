//! Classification pipeline for the rubric engine.
//!
//! The per-item flow, orchestrated by
//! [`HierarchicalClassifier`](pipeline::HierarchicalClassifier):
//! cache probes → keyword fast path → product/service detection → a
//! level-by-level walk of the taxonomy with one AI verdict per level →
//! rule validation → cache write-back. The
//! [`BulkRunner`](bulk::BulkRunner) drives that flow over a whole
//! catalog with bounded concurrency.
//!
//! # Crate layout
//!
//! - [`taxonomy`] — immutable taxonomy tree + dump loader
//! - [`pipeline`] — prompt builder, keyword classifier, detector,
//!   caches, verdict parser, validator, orchestrator
//! - [`store`] — the result-store seam and an in-memory implementation
//! - [`bulk`] — the bounded-concurrency catalog runner

pub mod bulk;
pub mod pipeline;
pub mod store;
pub mod taxonomy;

pub use bulk::{BulkOptions, BulkProgress, BulkRunner, BulkSummary, ProgressSink};
pub use pipeline::cache::ClassificationCache;
pub use pipeline::classifier::HierarchicalClassifier;
pub use pipeline::detector::ObjectTypeDetector;
pub use pipeline::keyword::KeywordClassifier;
pub use pipeline::validator::Validator;
pub use store::{CatalogItem, ItemFilter, LevelMap, MemoryStore, ResultStore, StoredClassification};
pub use taxonomy::loader::{JsonFileSource, TaxonomySource};
pub use taxonomy::store::Taxonomy;
