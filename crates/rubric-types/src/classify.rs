//! Classification request/result contract.
//!
//! A [`ClassificationRequest`] enters the pipeline; a
//! [`ClassificationResult`] leaves it, carrying one [`LevelStep`] per
//! taxonomy level traversed. [`AiVerdict`] is the single-step answer the
//! model is asked to return.

use serde::{Deserialize, Serialize};

use crate::taxonomy::Level;

// ── Request ──────────────────────────────────────────────────────────────

/// Per-request tuning knobs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClassifyOptions {
    /// Maximum depth attempted (1..=4).
    #[serde(default = "default_max_levels", alias = "maxLevels")]
    pub max_levels: usize,

    /// Early-stop threshold: a level verdict below this confidence ends
    /// the walk with a partial result.
    #[serde(default = "default_min_confidence", alias = "minConfidence")]
    pub min_confidence: f64,
}

fn default_max_levels() -> usize {
    4
}
fn default_min_confidence() -> f64 {
    0.7
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            max_levels: default_max_levels(),
            min_confidence: default_min_confidence(),
        }
    }
}

/// A request to classify one catalog item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRequest {
    /// Raw item name, non-empty and trimmed by the caller.
    #[serde(alias = "itemName")]
    pub item_name: String,

    /// Optional free-form category hint from the source system.
    #[serde(default)]
    pub category: Option<String>,

    /// Tuning knobs; defaults apply when absent.
    #[serde(default)]
    pub options: ClassifyOptions,
}

impl ClassificationRequest {
    /// Create a request with default options and no category hint.
    pub fn new(item_name: impl Into<String>) -> Self {
        Self {
            item_name: item_name.into(),
            category: None,
            options: ClassifyOptions::default(),
        }
    }

    /// Attach a category hint.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// The category hint, or empty string when absent (cache key form).
    pub fn category_key(&self) -> &str {
        self.category.as_deref().unwrap_or("")
    }
}

// ── Object type detection ────────────────────────────────────────────────

/// Coarse kind of a catalog item, used only to bias prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    /// A physical good.
    Product,
    /// A service.
    Service,
    /// Could not be determined; the safe default.
    Unknown,
}

impl ObjectType {
    /// Lowercase label used in prompts and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::Product => "product",
            ObjectType::Service => "service",
            ObjectType::Unknown => "unknown",
        }
    }
}

/// Outcome of the product/service heuristic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Detected kind.
    pub object_type: ObjectType,

    /// Heuristic confidence, 0.0..=1.0.
    pub confidence: f64,

    /// Which markers fired.
    pub reasoning: String,
}

impl Detection {
    /// The neutral detection returned when no marker matches.
    pub fn unknown() -> Self {
        Self {
            object_type: ObjectType::Unknown,
            confidence: 0.0,
            reasoning: "no markers matched".into(),
        }
    }
}

// ── Result ───────────────────────────────────────────────────────────────

/// One traversed taxonomy level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelStep {
    /// The level this step decided.
    pub level: Level,

    /// Chosen node code.
    pub code: String,

    /// Chosen node name.
    pub name: String,

    /// Verdict confidence after repair, 0.0..=1.0.
    pub confidence: f64,

    /// Model (or rule) reasoning for the choice.
    pub reasoning: String,

    /// Wall time spent deciding this level.
    #[serde(default, alias = "durationMs")]
    pub duration_ms: u64,
}

/// The finished classification of one item.
///
/// Invariants: `steps` is non-empty and monotone in level; unless
/// `corrected` is set, `final_code`/`final_confidence` mirror the last
/// step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Final (possibly partial-depth) code.
    #[serde(alias = "finalCode")]
    pub final_code: String,

    /// Name of the final node.
    #[serde(alias = "finalName")]
    pub final_name: String,

    /// Confidence of the final verdict.
    #[serde(alias = "finalConfidence")]
    pub final_confidence: f64,

    /// One step per traversed level, in descent order.
    pub steps: Vec<LevelStep>,

    /// Total wall time for the classification.
    #[serde(default, alias = "totalDurationMs")]
    pub total_duration_ms: u64,

    /// How many cache probes answered this request.
    #[serde(default, alias = "cacheHits")]
    pub cache_hits: u32,

    /// How many AI completions were made.
    #[serde(default, alias = "aiCalls")]
    pub ai_calls: u32,

    /// The validator substituted the verdict.
    #[serde(default)]
    pub corrected: bool,

    /// The validator lowered the confidence without substituting.
    #[serde(default)]
    pub lowered: bool,
}

impl ClassificationResult {
    /// Assemble a result from traversed steps. The final fields mirror
    /// the last step.
    ///
    /// # Panics
    ///
    /// Panics if `steps` is empty; the orchestrator never produces an
    /// empty walk.
    pub fn from_steps(steps: Vec<LevelStep>) -> Self {
        let (final_code, final_name, final_confidence) = {
            let last = steps.last().expect("classification requires at least one step");
            (last.code.clone(), last.name.clone(), last.confidence)
        };
        Self {
            final_code,
            final_name,
            final_confidence,
            steps,
            total_duration_ms: 0,
            cache_hits: 0,
            ai_calls: 0,
            corrected: false,
            lowered: false,
        }
    }

    /// The deepest traversed step.
    pub fn last_step(&self) -> Option<&LevelStep> {
        self.steps.last()
    }
}

// ── AI verdict ───────────────────────────────────────────────────────────

/// The per-level answer the model is asked to return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiVerdict {
    /// One of the candidate codes offered at this level.
    #[serde(alias = "selectedCode")]
    pub selected_code: String,

    /// Model confidence, 0.0..=1.0 after repair.
    pub confidence: f64,

    /// Short free-form justification.
    #[serde(default)]
    pub reasoning: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(level: Level, code: &str, confidence: f64) -> LevelStep {
        LevelStep {
            level,
            code: code.into(),
            name: format!("node {code}"),
            confidence,
            reasoning: "test".into(),
            duration_ms: 1,
        }
    }

    #[test]
    fn request_builder() {
        let req = ClassificationRequest::new("контрольный кабель").with_category("Материалы");
        assert_eq!(req.item_name, "контрольный кабель");
        assert_eq!(req.category_key(), "Материалы");
        assert_eq!(req.options.max_levels, 4);
        assert!((req.options.min_confidence - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn category_key_empty_when_absent() {
        let req = ClassificationRequest::new("x");
        assert_eq!(req.category_key(), "");
    }

    #[test]
    fn result_from_steps_mirrors_last() {
        let result = ClassificationResult::from_steps(vec![
            step(Level::Section, "C", 0.95),
            step(Level::Class, "26", 0.9),
        ]);
        assert_eq!(result.final_code, "26");
        assert!((result.final_confidence - 0.9).abs() < f64::EPSILON);
        assert_eq!(result.steps.len(), 2);
        assert!(!result.corrected);
    }

    #[test]
    fn object_type_labels() {
        assert_eq!(ObjectType::Product.as_str(), "product");
        assert_eq!(ObjectType::Unknown.as_str(), "unknown");
    }

    #[test]
    fn verdict_serde_roundtrip() {
        let verdict = AiVerdict {
            selected_code: "26.51".into(),
            confidence: 0.88,
            reasoning: "instruments".into(),
        };
        let json = serde_json::to_string(&verdict).unwrap();
        let parsed: AiVerdict = serde_json::from_str(&json).unwrap();
        assert_eq!(verdict, parsed);
    }

    #[test]
    fn verdict_reasoning_defaults_empty() {
        let verdict: AiVerdict =
            serde_json::from_str(r#"{"selected_code":"C","confidence":0.9}"#).unwrap();
        assert_eq!(verdict.selected_code, "C");
        assert!(verdict.reasoning.is_empty());
    }

    #[test]
    fn result_accepts_camel_case() {
        let json = r#"{
            "finalCode": "26.51.52",
            "finalName": "Pressure instruments",
            "finalConfidence": 0.88,
            "steps": [],
            "cacheHits": 1,
            "aiCalls": 0
        }"#;
        let result: ClassificationResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.final_code, "26.51.52");
        assert_eq!(result.cache_hits, 1);
    }
}
