//! The result-store seam.
//!
//! The bulk runner consumes exactly three operations: list the items
//! that still need classification, check whether one item already has a
//! verdict, and upsert a finished verdict. The trait is a capability
//! set — new storage backends add no code inside the core. The shipped
//! [`MemoryStore`] backs the CLI demo path and the tests.

use std::sync::RwLock;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use rubric_types::{LevelStep, Result};

/// One catalog item as the store exposes it to the runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Store-assigned identifier.
    pub id: i64,
    /// Source-system code of the item.
    pub code: String,
    /// Raw item name.
    pub name: String,
}

/// Selection filter for [`ResultStore::list_items_for_classification`].
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    /// Only items with no stored classification.
    pub unclassified_only: bool,
    /// Only items whose stored confidence is at or below this value.
    pub max_confidence: Option<f64>,
}

/// Level-name map persisted alongside a verdict.
///
/// Five slots mirror the persistence schema; the hierarchical walk
/// fills at most four.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelMap {
    /// Section name.
    pub level1: Option<String>,
    /// Class name.
    pub level2: Option<String>,
    /// Subclass name.
    pub level3: Option<String>,
    /// Group name.
    pub level4: Option<String>,
    /// Reserved deeper slot; unused by the hierarchical walk.
    pub level5: Option<String>,
}

impl LevelMap {
    /// Build the map from traversed steps.
    pub fn from_steps(steps: &[LevelStep]) -> Self {
        let mut map = Self::default();
        for step in steps {
            let name = Some(step.name.clone());
            match step.level.index() {
                0 => map.level1 = name,
                1 => map.level2 = name,
                2 => map.level3 = name,
                _ => map.level4 = name,
            }
        }
        map
    }

    /// Whether at least the top level is present.
    pub fn has_level1(&self) -> bool {
        self.level1.is_some()
    }
}

/// A stored verdict for one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredClassification {
    /// Original category payload from the source system, kept verbatim.
    pub category_original: serde_json::Value,
    /// Names per level.
    pub levels: LevelMap,
    /// Which strategy produced the verdict.
    pub strategy_id: String,
    /// Final confidence.
    pub confidence: f64,
}

/// Persistence facade used by the bulk runner.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Items matching `filter`, up to `limit`.
    async fn list_items_for_classification(
        &self,
        filter: &ItemFilter,
        limit: Option<usize>,
    ) -> Result<Vec<CatalogItem>>;

    /// The stored verdict for an item, if any.
    async fn get_classification(&self, item_id: i64) -> Result<Option<StoredClassification>>;

    /// Insert or replace the verdict for an item.
    async fn upsert_classification(
        &self,
        item_id: i64,
        category_original: serde_json::Value,
        levels: LevelMap,
        strategy_id: &str,
        confidence: f64,
    ) -> Result<()>;
}

/// In-memory store: the test double and the CLI demo backend.
#[derive(Default)]
pub struct MemoryStore {
    items: RwLock<Vec<CatalogItem>>,
    classifications: DashMap<i64, StoredClassification>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with items.
    pub fn with_items(items: Vec<CatalogItem>) -> Self {
        Self {
            items: RwLock::new(items),
            classifications: DashMap::new(),
        }
    }

    /// Number of stored classifications.
    pub fn classified_count(&self) -> usize {
        self.classifications.len()
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn list_items_for_classification(
        &self,
        filter: &ItemFilter,
        limit: Option<usize>,
    ) -> Result<Vec<CatalogItem>> {
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        let selected: Vec<CatalogItem> = items
            .iter()
            .filter(|item| {
                let stored = self.classifications.get(&item.id);
                if filter.unclassified_only && stored.is_some() {
                    return false;
                }
                if let (Some(max), Some(stored)) = (filter.max_confidence, &stored) {
                    if stored.confidence > max {
                        return false;
                    }
                }
                true
            })
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(selected)
    }

    async fn get_classification(&self, item_id: i64) -> Result<Option<StoredClassification>> {
        Ok(self.classifications.get(&item_id).map(|entry| entry.clone()))
    }

    async fn upsert_classification(
        &self,
        item_id: i64,
        category_original: serde_json::Value,
        levels: LevelMap,
        strategy_id: &str,
        confidence: f64,
    ) -> Result<()> {
        self.classifications.insert(
            item_id,
            StoredClassification {
                category_original,
                levels,
                strategy_id: strategy_id.to_string(),
                confidence,
            },
        );
        Ok(())
    }
}
