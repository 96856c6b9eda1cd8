//! Rule-based post-classification validation.
//!
//! A cheap pass over a finished result that catches reproducible model
//! mistakes. Rules are evaluated in order; the first one that fires
//! decides. A substitution always comes from the keyword classifier
//! (taxonomy-checked full paths), never from another AI call.
//!
//! 1. Physical goods classified into a service family are replaced with
//!    a keyword verdict when one exists, otherwise their confidence is
//!    halved.
//! 2. Verdicts landing in a known "misc/other" bucket are replaced with
//!    a more specific keyword verdict when one exists.
//! 3. A small table of named patterns rewrites known bad pairings
//!    (e.g. cables classified as boards).

use std::sync::Arc;

use tracing::{debug, info};

use rubric_types::ClassificationResult;

use super::keyword::KeywordClassifier;

/// Service subtrees outside the 33..=99 class range that still describe
/// services.
const SERVICE_SUBTREES: &[&str] = &["71.20", "96.09"];

/// Codes that name catch-all "other ..." buckets.
const GENERIC_CODE_PREFIXES: &[&str] = &["32.99.5"];

/// Name fragments that mark a catch-all bucket.
const GENERIC_MARKERS: &[&str] = &["прочие", "прочая", "прочее", "не включенн"];

/// Named pattern table: (name contains, bad code prefix, expected
/// replacement prefix).
const NAMED_PATTERNS: &[(&str, &str, &str)] = &[
    // Cables misfiled as electronic boards/components.
    ("кабел", "26.1", "27.32"),
    // Sensors/transducers misfiled as technical testing services.
    ("датчик", "71.20", "26.51"),
    ("преобразовател", "71.20", "26.51"),
];

/// The post-classification validator.
pub struct Validator {
    keyword: Arc<KeywordClassifier>,
}

impl Validator {
    /// Create a validator that substitutes via the given keyword
    /// classifier.
    pub fn new(keyword: Arc<KeywordClassifier>) -> Self {
        Self { keyword }
    }

    /// Check a finished result and return it, a substitution
    /// (`corrected = true`), or the original with lowered confidence
    /// (`lowered = true`).
    pub fn validate(
        &self,
        name: &str,
        category: Option<&str>,
        result: ClassificationResult,
    ) -> ClassificationResult {
        // Rule 1: product in a service family.
        if self.keyword.is_product(name) && is_service_code(&result.final_code) {
            if let Some(substitute) = self.substitute(name, category, &result) {
                if !is_service_code(&substitute.final_code) {
                    info!(
                        item = name,
                        from = %result.final_code,
                        to = %substitute.final_code,
                        "validator replaced service verdict for a product"
                    );
                    return substitute;
                }
            }
            debug!(item = name, code = %result.final_code, "service verdict for a product, lowering confidence");
            let mut lowered = result;
            lowered.final_confidence /= 2.0;
            lowered.lowered = true;
            return lowered;
        }

        // Rule 2: too generic.
        if is_generic(&result.final_code, &result.final_name) {
            if let Some(substitute) = self.substitute(name, category, &result) {
                if !is_generic(&substitute.final_code, &substitute.final_name)
                    && substitute.final_code != result.final_code
                {
                    info!(
                        item = name,
                        from = %result.final_code,
                        to = %substitute.final_code,
                        "validator replaced generic verdict"
                    );
                    return substitute;
                }
            }
            return result;
        }

        // Rule 3: named patterns.
        let lowered_name = name.to_lowercase();
        for (fragment, bad_prefix, expected_prefix) in NAMED_PATTERNS {
            if lowered_name.contains(fragment) && result.final_code.starts_with(bad_prefix) {
                if let Some(substitute) = self.substitute(name, category, &result) {
                    if substitute.final_code.starts_with(expected_prefix) {
                        info!(
                            item = name,
                            pattern = fragment,
                            from = %result.final_code,
                            to = %substitute.final_code,
                            "validator applied named pattern"
                        );
                        return substitute;
                    }
                }
            }
        }

        result
    }

    /// A keyword-classifier substitution carrying over the original
    /// call accounting.
    fn substitute(
        &self,
        name: &str,
        category: Option<&str>,
        original: &ClassificationResult,
    ) -> Option<ClassificationResult> {
        let mut substitute = self.keyword.classify(name, category)?;
        substitute.ai_calls = original.ai_calls;
        substitute.cache_hits = original.cache_hits;
        substitute.total_duration_ms = original.total_duration_ms;
        substitute.corrected = true;
        Some(substitute)
    }
}

/// Whether a code belongs to a service family: classes 33..=99, plus
/// the explicit service subtrees.
pub fn is_service_code(code: &str) -> bool {
    if SERVICE_SUBTREES
        .iter()
        .any(|prefix| code == *prefix || code.starts_with(&format!("{prefix}.")))
    {
        return true;
    }
    let class = code.split('.').next().unwrap_or("");
    matches!(class.parse::<u32>(), Ok(n) if (33..=99).contains(&n))
}

/// Whether a verdict names a catch-all bucket.
fn is_generic(code: &str, name: &str) -> bool {
    if GENERIC_CODE_PREFIXES.iter().any(|p| code.starts_with(p)) {
        return true;
    }
    let lowered = name.to_lowercase();
    GENERIC_MARKERS.iter().any(|m| lowered.contains(m))
}
