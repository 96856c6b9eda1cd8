//! Two-level classification cache, plus the level-scoped micro-cache.
//!
//! Process-wide, no eviction. Full results are cached under the
//! normalized `(name, category)` pair; a coarser root-word cache reuses
//! high-confidence results across same-stem items (admission gated at
//! `finalConfidence > root_min_confidence`). The level micro-cache
//! shares single AI verdicts across items that reached the same decision
//! point.
//!
//! Consistency is last-writer-wins per key; a double-miss stampede wastes
//! one bounded computation and is tolerated.

use dashmap::DashMap;

use rubric_types::{ClassificationResult, Level, LevelStep, ObjectType};

/// Key of the level-scoped micro-cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LevelKey {
    /// Normalized item name.
    pub name: String,
    /// Category hint ("" when absent).
    pub category: String,
    /// Level being decided.
    pub level: Level,
    /// Parent chosen at the previous level ("" at the roots).
    pub parent_code: String,
    /// Object-type bias active for the prompt.
    pub object_type: ObjectType,
}

/// The shared cache layer.
pub struct ClassificationCache {
    full: DashMap<(String, String), ClassificationResult>,
    by_root: DashMap<(String, String), ClassificationResult>,
    level: DashMap<LevelKey, LevelStep>,
    root_min_confidence: f64,
}

impl ClassificationCache {
    /// Create an empty cache with the given root-cache admission gate.
    pub fn new(root_min_confidence: f64) -> Self {
        Self {
            full: DashMap::new(),
            by_root: DashMap::new(),
            level: DashMap::new(),
            root_min_confidence,
        }
    }

    fn full_key(name: &str, category: &str) -> (String, String) {
        (name.trim().to_lowercase(), category.to_string())
    }

    /// Probe the full-key cache.
    pub fn get_full(&self, name: &str, category: &str) -> Option<ClassificationResult> {
        self.full
            .get(&Self::full_key(name, category))
            .map(|entry| entry.clone())
    }

    /// Store a finished result under the full key.
    pub fn put_full(&self, name: &str, category: &str, result: ClassificationResult) {
        self.full.insert(Self::full_key(name, category), result);
    }

    /// Probe the root-word cache. Entries below the admission gate are
    /// never stored, so any hit is high-confidence.
    pub fn get_by_root(&self, root_word: &str, category: &str) -> Option<ClassificationResult> {
        if root_word.is_empty() {
            return None;
        }
        self.by_root
            .get(&(root_word.to_string(), category.to_string()))
            .map(|entry| entry.clone())
    }

    /// Store a result under the root word. Silently refuses entries at
    /// or below the admission gate.
    pub fn put_by_root(&self, root_word: &str, category: &str, result: ClassificationResult) {
        if root_word.is_empty() || result.final_confidence <= self.root_min_confidence {
            return;
        }
        self.by_root
            .insert((root_word.to_string(), category.to_string()), result);
    }

    /// Probe the level micro-cache.
    pub fn get_level(&self, key: &LevelKey) -> Option<LevelStep> {
        self.level.get(key).map(|entry| entry.clone())
    }

    /// Share one accepted level verdict.
    pub fn put_level(&self, key: LevelKey, step: LevelStep) {
        self.level.insert(key, step);
    }

    /// Entry counts `(full, by_root, level)`, for diagnostics.
    pub fn sizes(&self) -> (usize, usize, usize) {
        (self.full.len(), self.by_root.len(), self.level.len())
    }
}

impl std::fmt::Debug for ClassificationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (full, by_root, level) = self.sizes();
        f.debug_struct("ClassificationCache")
            .field("full", &full)
            .field("by_root", &by_root)
            .field("level", &level)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(code: &str, confidence: f64) -> ClassificationResult {
        ClassificationResult::from_steps(vec![LevelStep {
            level: Level::Section,
            code: code.into(),
            name: format!("node {code}"),
            confidence,
            reasoning: "test".into(),
            duration_ms: 0,
        }])
    }

    #[test]
    fn full_cache_roundtrip() {
        let cache = ClassificationCache::new(0.9);
        assert!(cache.get_full("Кабель", "").is_none());

        cache.put_full("Кабель", "", result("C", 0.8));
        let hit = cache.get_full("Кабель", "").unwrap();
        assert_eq!(hit.final_code, "C");
    }

    #[test]
    fn full_key_normalizes_name() {
        let cache = ClassificationCache::new(0.9);
        cache.put_full("  КАБЕЛЬ  ", "", result("C", 0.8));
        assert!(cache.get_full("кабель", "").is_some());
    }

    #[test]
    fn full_key_distinguishes_categories() {
        let cache = ClassificationCache::new(0.9);
        cache.put_full("кабель", "a", result("C", 0.8));
        assert!(cache.get_full("кабель", "b").is_none());
    }

    #[test]
    fn root_cache_gates_admission() {
        let cache = ClassificationCache::new(0.9);

        cache.put_by_root("кабел", "", result("C", 0.85));
        assert!(cache.get_by_root("кабел", "").is_none());

        // Exactly at the gate is still refused (strict >).
        cache.put_by_root("кабел", "", result("C", 0.9));
        assert!(cache.get_by_root("кабел", "").is_none());

        cache.put_by_root("кабел", "", result("C", 0.95));
        assert!(cache.get_by_root("кабел", "").is_some());
    }

    #[test]
    fn root_cache_ignores_empty_root() {
        let cache = ClassificationCache::new(0.9);
        cache.put_by_root("", "", result("C", 0.99));
        assert!(cache.get_by_root("", "").is_none());
    }

    #[test]
    fn level_cache_roundtrip() {
        let cache = ClassificationCache::new(0.9);
        let key = LevelKey {
            name: "кабель".into(),
            category: String::new(),
            level: Level::Class,
            parent_code: "C".into(),
            object_type: ObjectType::Product,
        };
        assert!(cache.get_level(&key).is_none());

        cache.put_level(
            key.clone(),
            LevelStep {
                level: Level::Class,
                code: "27".into(),
                name: "Электрооборудование".into(),
                confidence: 0.9,
                reasoning: "shared".into(),
                duration_ms: 10,
            },
        );
        assert_eq!(cache.get_level(&key).unwrap().code, "27");

        // A different object type is a different decision point.
        let other = LevelKey {
            object_type: ObjectType::Unknown,
            ..key
        };
        assert!(cache.get_level(&other).is_none());
    }

    #[test]
    fn last_writer_wins() {
        let cache = ClassificationCache::new(0.9);
        cache.put_full("x", "", result("A", 0.8));
        cache.put_full("x", "", result("B", 0.8));
        assert_eq!(cache.get_full("x", "").unwrap().final_code, "B");
    }

    #[test]
    fn sizes_report() {
        let cache = ClassificationCache::new(0.9);
        cache.put_full("a", "", result("A", 0.8));
        cache.put_by_root("root", "", result("A", 0.95));
        assert_eq!(cache.sizes(), (1, 1, 0));
    }
}
