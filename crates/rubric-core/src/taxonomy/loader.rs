//! Taxonomy source seam.
//!
//! The taxonomy is built once at startup from a persisted dump. The
//! [`TaxonomySource`] trait abstracts where the dump lives; the shipped
//! implementation reads a JSON array of raw records from disk. New
//! backends add no code inside the core.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use rubric_types::{ClassifyError, Result, TaxonomyRecord};

use super::store::Taxonomy;

/// A source of raw taxonomy records.
#[async_trait]
pub trait TaxonomySource: Send + Sync {
    /// Load every node record from the dump, in dump order.
    ///
    /// Order matters: the store's parent normalization relies on
    /// sections appearing before the classes they enclose.
    async fn load_all_nodes(&self) -> Result<Vec<TaxonomyRecord>>;
}

/// Reads the taxonomy dump from a JSON file: a flat array of
/// `{code, name, parentCode, level}` records.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    /// Create a source reading from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TaxonomySource for JsonFileSource {
    async fn load_all_nodes(&self) -> Result<Vec<TaxonomyRecord>> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let records: Vec<TaxonomyRecord> = serde_json::from_str(&raw)?;
        info!(
            path = %self.path.display(),
            records = records.len(),
            "taxonomy dump loaded"
        );
        Ok(records)
    }
}

/// Load and materialize the taxonomy from a source.
pub async fn load_taxonomy(source: &dyn TaxonomySource) -> Result<Taxonomy> {
    let records = source.load_all_nodes().await?;
    if records.is_empty() {
        return Err(ClassifyError::TaxonomyLoad("dump contains no records".into()));
    }
    Taxonomy::from_records(records)
}
