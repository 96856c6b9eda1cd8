//! The hierarchical classifier: per-item orchestration.
//!
//! `classify` resolves one catalog item to a taxonomy code:
//!
//! 1. full-key cache probe;
//! 2. root-word cache probe (write-through to the full cache on hit);
//! 3. keyword fast path (no AI);
//! 4. product/service detection (prompt bias only, never fatal);
//! 5. the level loop: candidates → prompt → AI verdict → child check →
//!    step append, stopping early when confidence drops below the
//!    threshold;
//! 6. rule validation;
//! 7. cache write-back and keyword feedback.
//!
//! Within one classification the level calls are strictly sequential —
//! each depends on the previously chosen parent. Concurrency lives one
//! layer up, in the bulk runner. A cancelled classification produces no
//! cache write.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rubric_llm::{AiGateway, GatewayError};
use rubric_types::{
    AiVerdict, ClassificationRequest, ClassificationResult, ClassifyError, EngineConfig, Level,
    LevelStep, Result, TaxonomyNode,
};

use crate::taxonomy::Taxonomy;

use super::cache::{ClassificationCache, LevelKey};
use super::detector::ObjectTypeDetector;
use super::keyword::KeywordClassifier;
use super::prompt::{self, RETRY_SUFFIX};
use super::validator::Validator;
use super::verdict::parse_verdict;

/// The per-item classification orchestrator. Cheap to share via `Arc`;
/// all state lives in the injected collaborators.
pub struct HierarchicalClassifier {
    taxonomy: Arc<Taxonomy>,
    gateway: Arc<AiGateway>,
    keyword: Arc<KeywordClassifier>,
    detector: ObjectTypeDetector,
    cache: Arc<ClassificationCache>,
    validator: Validator,
    config: EngineConfig,
}

impl HierarchicalClassifier {
    /// Wire up the pipeline over a shared taxonomy and gateway.
    pub fn new(taxonomy: Arc<Taxonomy>, gateway: Arc<AiGateway>, config: EngineConfig) -> Self {
        let keyword = Arc::new(KeywordClassifier::new(taxonomy.clone()));
        let cache = Arc::new(ClassificationCache::new(config.root_cache_min_confidence));
        let validator = Validator::new(keyword.clone());
        Self {
            taxonomy,
            gateway,
            keyword,
            detector: ObjectTypeDetector::new(),
            cache,
            validator,
            config,
        }
    }

    /// The shared cache layer (diagnostics, tests).
    pub fn cache(&self) -> &ClassificationCache {
        &self.cache
    }

    /// The keyword classifier (feedback inspection, tests).
    pub fn keyword(&self) -> &Arc<KeywordClassifier> {
        &self.keyword
    }

    /// Classify one item.
    pub async fn classify(
        &self,
        request: &ClassificationRequest,
        cancel: &CancellationToken,
    ) -> Result<ClassificationResult> {
        let name = request.item_name.trim();
        if name.is_empty() {
            return Err(ClassifyError::InvalidRequest("empty item name".into()));
        }
        let category = request.category.as_deref().filter(|c| !c.is_empty());
        let category_key = request.category_key();
        let started = Instant::now();

        // 1. Full-key cache. The returned copy accounts for THIS
        // invocation: one cache hit, zero AI calls.
        if let Some(mut hit) = self.cache.get_full(name, category_key) {
            hit.cache_hits += 1;
            hit.ai_calls = 0;
            debug!(item = name, code = %hit.final_code, "full cache hit");
            return Ok(hit);
        }

        // 2. Root-word cache.
        let root = self.keyword.extract_root_word(name);
        if let Some(mut hit) = self.cache.get_by_root(&root, category_key) {
            hit.cache_hits += 1;
            hit.ai_calls = 0;
            debug!(item = name, root = %root, code = %hit.final_code, "root cache hit");
            self.cache.put_full(name, category_key, hit.clone());
            return Ok(hit);
        }

        // 3. Keyword fast path.
        if let Some(mut result) = self.keyword.classify(name, category) {
            result.total_duration_ms = started.elapsed().as_millis() as u64;
            self.cache.put_full(name, category_key, result.clone());
            self.cache.put_by_root(&root, category_key, result.clone());
            debug!(item = name, code = %result.final_code, "keyword fast path");
            return Ok(result);
        }

        // 4. Object-type hint. Never fatal; unknown passes through.
        let detection = self.detector.detect(name, category);
        let object_type = detection.object_type;
        debug!(
            item = name,
            object_type = object_type.as_str(),
            confidence = detection.confidence,
            "object type detected"
        );

        // 5. The level loop. Level-cache writes are buffered so a
        // cancelled walk leaves no trace; a failed (non-cancelled) walk
        // still shares the levels it did decide.
        let mut walk = Walk::default();
        let walked = self
            .walk_levels(request, name, category, object_type, cancel, &mut walk)
            .await;
        if !matches!(walked, Err(ClassifyError::Cancelled)) {
            for (key, step) in walk.level_writes.drain(..) {
                self.cache.put_level(key, step);
            }
        }
        walked?;

        let mut result = ClassificationResult::from_steps(walk.steps);
        result.ai_calls = walk.ai_calls;
        result.cache_hits = walk.cache_hits;
        result.total_duration_ms = started.elapsed().as_millis() as u64;

        // 6. Validation.
        let result = self.validator.validate(name, category, result);

        // 7. Cache write-back and feedback.
        self.cache.put_full(name, category_key, result.clone());
        if result.final_confidence > self.config.root_cache_min_confidence && !root.is_empty() {
            self.cache.put_by_root(&root, category_key, result.clone());
            self.keyword.learn_from_successful(
                name,
                category,
                &result.final_code,
                result.final_confidence,
            );
        }

        info!(
            item = name,
            code = %result.final_code,
            confidence = result.final_confidence,
            steps = result.steps.len(),
            ai_calls = result.ai_calls,
            corrected = result.corrected,
            duration_ms = result.total_duration_ms,
            "classification finished"
        );
        Ok(result)
    }

    /// Walk the taxonomy level by level, appending one step per decided
    /// level into `walk`.
    async fn walk_levels(
        &self,
        request: &ClassificationRequest,
        name: &str,
        category: Option<&str>,
        object_type: rubric_types::ObjectType,
        cancel: &CancellationToken,
        walk: &mut Walk,
    ) -> Result<()> {
        let max_levels = request.options.max_levels.clamp(1, self.config.max_levels);
        let min_confidence = request.options.min_confidence;
        let category_key = request.category_key();
        let mut parent_code = String::new();

        for &level in &Level::ALL[..max_levels] {
            if cancel.is_cancelled() {
                return Err(ClassifyError::Cancelled);
            }

            let candidates = self.taxonomy.children_of(&parent_code, level)?;

            let key = LevelKey {
                name: name.to_lowercase(),
                category: category_key.to_string(),
                level,
                parent_code: parent_code.clone(),
                object_type,
            };

            // A verdict shared from an earlier walk that reached this
            // same decision point.
            if let Some(step) = self.cache.get_level(&key) {
                walk.cache_hits += 1;
                let below = step.confidence < min_confidence;
                parent_code = step.code.clone();
                walk.steps.push(step);
                if below {
                    break;
                }
                continue;
            }

            let prompt = prompt::build(name, category, level, &candidates, object_type);
            let level_started = Instant::now();

            let text = self.complete(&prompt.system, &prompt.user, cancel).await?;
            walk.ai_calls += 1;

            let (verdict, node) = match accept_verdict(&text, &candidates) {
                Ok(accepted) => accepted,
                Err(err) => {
                    // One retry with an instructional suffix; the second
                    // malformed answer fails the item.
                    warn!(item = name, level = %level, error = %err, "malformed verdict, retrying");
                    let retry_user = format!("{}{}", prompt.user, RETRY_SUFFIX);
                    let text = self.complete(&prompt.system, &retry_user, cancel).await?;
                    walk.ai_calls += 1;
                    accept_verdict(&text, &candidates)?
                }
            };

            let step = LevelStep {
                level,
                code: node.code.clone(),
                name: node.name.clone(),
                confidence: verdict.confidence,
                reasoning: verdict.reasoning,
                duration_ms: level_started.elapsed().as_millis() as u64,
            };
            walk.level_writes.push((key, step.clone()));

            // Threshold check happens AFTER the append so the step
            // records what the model said.
            let below = step.confidence < min_confidence;
            parent_code = step.code.clone();
            walk.steps.push(step);
            if below {
                debug!(
                    item = name,
                    level = %level,
                    confidence = verdict.confidence,
                    "confidence below threshold, stopping walk"
                );
                break;
            }
        }
        Ok(())
    }

    /// One gateway call with the engine's error mapping.
    async fn complete(
        &self,
        system: &str,
        user: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        match self.gateway.complete(system, user, cancel).await {
            Ok(text) => Ok(text),
            Err(GatewayError::CircuitOpen) => {
                Err(ClassifyError::AiUnavailable("circuit breaker open".into()))
            }
            Err(GatewayError::Cancelled) => Err(ClassifyError::Cancelled),
            Err(err) => Err(ClassifyError::AiUnavailable(err.to_string())),
        }
    }
}

/// Accumulated state of one level walk.
#[derive(Default)]
struct Walk {
    steps: Vec<LevelStep>,
    ai_calls: u32,
    cache_hits: u32,
    level_writes: Vec<(LevelKey, LevelStep)>,
}

/// Parse a verdict and resolve it against the offered candidates.
///
/// A code that is not a direct candidate — including a descendant the
/// model jumped to — is malformed.
fn accept_verdict<'a>(
    text: &str,
    candidates: &[&'a TaxonomyNode],
) -> Result<(AiVerdict, &'a TaxonomyNode)> {
    let verdict = parse_verdict(text)?;
    let node = candidates
        .iter()
        .find(|n| n.code == verdict.selected_code)
        .copied()
        .ok_or_else(|| {
            ClassifyError::AiMalformed(format!(
                "selected code '{}' is not among the offered candidates",
                verdict.selected_code
            ))
        })?;
    Ok((verdict, node))
}
