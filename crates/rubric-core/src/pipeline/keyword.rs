//! Keyword fast path.
//!
//! A deterministic, table-driven classifier that resolves well-known
//! item stems straight to a leaf code, bypassing the AI entirely. It
//! also hosts the stemming used for the root-word cache key, the
//! `is_product` heuristic the validator relies on, and the bounded
//! feedback table fed by high-confidence hierarchical results.
//!
//! A keyword hit produces a fully populated result: all level steps
//! along the taxonomic path to the leaf, never a code absent from the
//! taxonomy (entries are checked against the tree at match time).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use rubric_types::{ClassificationResult, LevelStep};

use crate::taxonomy::Taxonomy;

/// Confidence assigned to static stem-table hits.
const STATIC_RULE_CONFIDENCE: f64 = 0.92;

/// Upper bound on the learned table (feedback entries beyond this are
/// dropped; existing stems still refresh).
const LEARNED_CAP: usize = 512;

/// Static stem → leaf-code table, checked in order; first match wins.
///
/// Stems are lowercase prefixes matched as substrings of the normalized
/// name, so "кабел" fires for "кабель", "кабеля", "контрольный кабель".
const STEMS: &[(&str, &str)] = &[
    ("кабел", "27.32.11"),
    ("провод", "27.32.13"),
    ("датчик", "26.51.52"),
    ("манометр", "26.51.52"),
    ("термометр", "26.51.51"),
    ("электродвигател", "27.11.10"),
    ("трансформатор", "27.11.41"),
    ("светильник", "27.40.21"),
    ("ламп", "27.40.11"),
    ("выключател", "27.33.11"),
    ("розетк", "27.33.13"),
    ("насос", "28.13.14"),
    ("компрессор", "28.13.24"),
    ("подшипник", "28.15.10"),
    ("редуктор", "28.15.22"),
    ("фильтр", "28.29.13"),
    ("болт", "25.94.11"),
    ("гайк", "25.94.12"),
    ("труб", "24.20.13"),
    ("краск", "20.30.12"),
    ("бумаг", "17.23.13"),
    ("перчатк", "32.99.11"),
];

/// Standalone tokens (units, standards) that indicate a physical good
/// when deciding `is_product`.
const PRODUCT_HINTS: &[&str] = &["гост", "ту", "мм", "кг", "шт", "уп", "компл"];

/// Service stems that veto `is_product` regardless of other hints.
const SERVICE_VETO: &[&str] = &[
    "услуг",
    "работ",
    "ремонт",
    "обслуживан",
    "монтаж",
    "аренд",
    "поверк",
    "доставк",
    "обучени",
];

/// Common Russian noun endings stripped during root-word extraction,
/// longest first.
const SUFFIXES: &[&str] = &[
    "иями", "ями", "ами", "ией", "иях", "ьев", "ье", "ов", "ев", "ей", "ий", "ый", "ой",
    "ая", "яя", "ое", "ее", "ые", "ие", "ах", "ях", "ом", "ем", "ам", "ям", "ть", "а",
    "я", "о", "е", "ы", "и", "у", "ю", "ь",
];

/// A learned (stem → leaf) association from successful classifications.
#[derive(Debug, Clone)]
struct LearnedEntry {
    code: String,
    confidence: f64,
}

/// The deterministic keyword classifier.
pub struct KeywordClassifier {
    taxonomy: Arc<Taxonomy>,
    learned: RwLock<HashMap<String, LearnedEntry>>,
}

impl KeywordClassifier {
    /// Create a classifier over the shared taxonomy.
    pub fn new(taxonomy: Arc<Taxonomy>) -> Self {
        Self {
            taxonomy,
            learned: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve an item by stem table. Returns `None` on a miss.
    ///
    /// Learned entries take precedence over the static table (the most
    /// recent high-confidence evidence wins over shipped defaults).
    pub fn classify(&self, name: &str, _category: Option<&str>) -> Option<ClassificationResult> {
        let normalized = name.to_lowercase();

        let root = self.extract_root_word(name);
        if !root.is_empty() {
            let learned = self.learned.read().unwrap_or_else(|e| e.into_inner());
            if let Some(entry) = learned.get(&root) {
                if let Some(result) =
                    self.materialize(&entry.code, entry.confidence, &format!("learned stem '{root}'"))
                {
                    return Some(result);
                }
            }
        }

        for (stem, code) in STEMS.iter().copied() {
            if normalized.contains(stem) {
                let reasoning = format!("stem '{stem}' matched");
                match self.materialize(code, STATIC_RULE_CONFIDENCE, &reasoning) {
                    Some(result) => return Some(result),
                    None => {
                        // Table entry points outside the loaded taxonomy;
                        // skip rather than fabricate a code.
                        warn!(stem, code, "keyword table entry absent from taxonomy");
                        continue;
                    }
                }
            }
        }
        None
    }

    /// Build a full result (all level steps along the path) for a leaf
    /// code, or `None` when the code is not in the taxonomy.
    fn materialize(
        &self,
        code: &str,
        confidence: f64,
        reasoning: &str,
    ) -> Option<ClassificationResult> {
        let path = self.taxonomy.path_to(code)?;
        let steps: Vec<LevelStep> = path
            .iter()
            .map(|node| LevelStep {
                level: node.level,
                code: node.code.clone(),
                name: node.name.clone(),
                confidence,
                reasoning: reasoning.to_string(),
                duration_ms: 0,
            })
            .collect();
        debug!(code, reasoning, "keyword fast path hit");
        Some(ClassificationResult::from_steps(steps))
    }

    /// Heuristic: does the name describe a physical good?
    ///
    /// Service stems veto; otherwise any product stem from the static
    /// table or a unit/standard hint counts.
    pub fn is_product(&self, name: &str) -> bool {
        let normalized = name.to_lowercase();
        if SERVICE_VETO.iter().any(|m| normalized.contains(m)) {
            return false;
        }
        if STEMS.iter().any(|(stem, _)| normalized.contains(stem)) {
            return true;
        }
        normalized
            .split(|c: char| !c.is_alphanumeric())
            .any(|token| PRODUCT_HINTS.contains(&token))
    }

    /// Extract the root word used as the coarse cache key.
    ///
    /// Takes the longest Cyrillic/alphabetic token of at least four
    /// characters and strips one common noun ending. Returns an empty
    /// string when the name has no suitable token.
    pub fn extract_root_word(&self, name: &str) -> String {
        let lowered = name.to_lowercase();
        let token = lowered
            .split(|c: char| !c.is_alphabetic())
            .filter(|t| t.chars().count() >= 4)
            .max_by_key(|t| t.chars().count());

        let Some(token) = token else {
            return String::new();
        };

        for suffix in SUFFIXES {
            if let Some(stripped) = token.strip_suffix(suffix) {
                if stripped.chars().count() >= 3 {
                    return stripped.to_string();
                }
            }
        }
        token.to_string()
    }

    /// Feedback hook: remember a (root word → leaf code) pair after the
    /// hierarchical path converged with high confidence.
    ///
    /// Growth is bounded: once the table holds [`LEARNED_CAP`] stems,
    /// only already-known stems refresh. On conflict the newer entry
    /// wins when its confidence is at least the incumbent's.
    pub fn learn_from_successful(
        &self,
        name: &str,
        _category: Option<&str>,
        code: &str,
        confidence: f64,
    ) {
        if confidence <= 0.9 || !self.taxonomy.contains(code) {
            return;
        }
        let root = self.extract_root_word(name);
        if root.is_empty() {
            return;
        }

        let mut learned = self.learned.write().unwrap_or_else(|e| e.into_inner());
        let incumbent = learned.get(&root).map(|entry| entry.confidence);
        match incumbent {
            Some(existing) if existing > confidence => {}
            Some(_) => {
                learned.insert(
                    root,
                    LearnedEntry {
                        code: code.to_string(),
                        confidence,
                    },
                );
            }
            None if learned.len() >= LEARNED_CAP => {
                debug!(root = %root, "learned table full, dropping new stem");
            }
            None => {
                debug!(root = %root, code, confidence, "learned stem admitted");
                learned.insert(
                    root,
                    LearnedEntry {
                        code: code.to_string(),
                        confidence,
                    },
                );
            }
        }
    }

    /// Number of learned stems, for diagnostics and tests.
    pub fn learned_len(&self) -> usize {
        self.learned.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rubric_types::TaxonomyRecord;

    fn record(code: &str, name: &str, parent: &str, level: u8) -> TaxonomyRecord {
        TaxonomyRecord {
            code: code.into(),
            name: name.into(),
            parent_code: parent.into(),
            level,
        }
    }

    fn fixture() -> Arc<Taxonomy> {
        Arc::new(
            Taxonomy::from_records(vec![
                record("C", "Обрабатывающие производства", "", 0),
                record("26", "Компьютеры и электроника", "", 1),
                record("26.51", "Приборы измерительные", "26", 2),
                record("26.51.52", "Приборы для измерения давления", "26.51", 3),
                record("27", "Электрооборудование", "C", 1),
                record("27.32", "Провода и кабели", "27", 2),
                record("27.32.11", "Провода обмоточные изолированные", "27.32", 3),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn stem_hit_builds_full_path() {
        let classifier = KeywordClassifier::new(fixture());
        let result = classifier.classify("контрольный кабель", None).unwrap();

        assert_eq!(result.final_code, "27.32.11");
        assert_eq!(result.steps.len(), 4);
        let codes: Vec<&str> = result.steps.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, vec!["C", "27", "27.32", "27.32.11"]);
        assert!(result.final_confidence >= 0.9);
        assert_eq!(result.ai_calls, 0);
    }

    #[test]
    fn miss_returns_none() {
        let classifier = KeywordClassifier::new(fixture());
        assert!(classifier.classify("неопознанная позиция", None).is_none());
    }

    #[test]
    fn entry_absent_from_taxonomy_is_skipped() {
        // The fixture lacks 25.94.11, so "болт" must not produce a result.
        let classifier = KeywordClassifier::new(fixture());
        assert!(classifier.classify("болт М12", None).is_none());
    }

    #[test]
    fn is_product_heuristics() {
        let classifier = KeywordClassifier::new(fixture());
        assert!(classifier.is_product("датчик давления"));
        assert!(classifier.is_product("прокладка ГОСТ 15180"));
        assert!(!classifier.is_product("поверка датчика давления"));
        assert!(!classifier.is_product("консультационные услуги"));
    }

    #[test]
    fn root_word_extraction() {
        let classifier = KeywordClassifier::new(fixture());
        assert_eq!(classifier.extract_root_word("датчики давления"), "давлени");
        assert_eq!(classifier.extract_root_word("кабель"), "кабел");
        assert_eq!(classifier.extract_root_word("№ 17"), "");
    }

    #[test]
    fn root_word_same_for_inflections() {
        let classifier = KeywordClassifier::new(fixture());
        let a = classifier.extract_root_word("трансформатор");
        let b = classifier.extract_root_word("трансформаторы");
        assert_eq!(a, b);
    }

    #[test]
    fn learn_requires_high_confidence_and_known_code() {
        let classifier = KeywordClassifier::new(fixture());
        classifier.learn_from_successful("расходомер", None, "26.51.52", 0.85);
        assert_eq!(classifier.learned_len(), 0);

        classifier.learn_from_successful("расходомер", None, "99.99.99", 0.95);
        assert_eq!(classifier.learned_len(), 0);

        classifier.learn_from_successful("расходомер", None, "26.51.52", 0.95);
        assert_eq!(classifier.learned_len(), 1);
    }

    #[test]
    fn learned_entry_resolves_future_names() {
        let classifier = KeywordClassifier::new(fixture());
        classifier.learn_from_successful("расходомер вихревой", None, "26.51.52", 0.95);

        let result = classifier.classify("расходомер ЭМИС", None).unwrap();
        assert_eq!(result.final_code, "26.51.52");
        assert!(result.steps[0].reasoning.contains("learned"));
    }

    #[test]
    fn conflict_prefers_higher_or_equal_confidence() {
        let classifier = KeywordClassifier::new(fixture());
        classifier.learn_from_successful("расходомер", None, "26.51.52", 0.97);
        classifier.learn_from_successful("расходомер", None, "27.32.11", 0.92);

        // Lower-confidence newcomer does not displace the incumbent.
        let result = classifier.classify("расходомер", None).unwrap();
        assert_eq!(result.final_code, "26.51.52");

        classifier.learn_from_successful("расходомер", None, "27.32.11", 0.98);
        let result = classifier.classify("расходомер", None).unwrap();
        assert_eq!(result.final_code, "27.32.11");
    }
}
