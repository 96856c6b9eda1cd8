//! Bulk catalog runner.
//!
//! Pulls items from the result store, fans them out to a
//! semaphore-bounded worker pool over the shared
//! [`HierarchicalClassifier`], writes verdicts back, and paces the run
//! so bursts stay inside the AI gateway's own rate limit. A failure on
//! one item is logged and counted but never aborts the run.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use rubric_types::{
    ClassificationRequest, ClassificationResult, ClassifyError, EngineConfig, Result,
};

use crate::pipeline::classifier::HierarchicalClassifier;
use crate::store::{CatalogItem, ItemFilter, LevelMap, ResultStore};

/// Strategy identifier recorded with every verdict this runner writes.
const STRATEGY_ID: &str = "hierarchical";

/// How often (in completed items) progress is reported.
const PROGRESS_EVERY: usize = 10;

/// Bulk run options.
#[derive(Debug, Clone)]
pub struct BulkOptions {
    /// Worker pool size.
    pub concurrency: usize,
    /// Pause after every this many completed items.
    pub throttle_every: usize,
    /// Pause duration in milliseconds.
    pub throttle_sleep_ms: u64,
    /// Skip items that already have a level-1 category.
    pub skip_if_classified: bool,
    /// Cap on the number of items pulled from the store.
    pub limit: Option<usize>,
}

impl BulkOptions {
    /// Derive options from the engine config.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            throttle_every: config.throttle_every,
            throttle_sleep_ms: config.throttle_sleep_ms,
            skip_if_classified: true,
            limit: None,
        }
    }
}

/// A progress report emitted to the caller's sink.
#[derive(Debug, Clone)]
pub struct BulkProgress {
    /// Items finished so far (ok + err + skipped).
    pub processed: usize,
    /// Successful classifications.
    pub ok: usize,
    /// Failed items.
    pub err: usize,
    /// Items skipped by the skip policy.
    pub skipped: usize,
    /// Throughput since the run started.
    pub items_per_sec: f64,
    /// Estimated seconds until the run completes.
    pub eta_sec: f64,
}

/// Where progress reports go.
pub trait ProgressSink: Send + Sync {
    /// Receive one progress report.
    fn report(&self, progress: &BulkProgress);
}

/// Final tally of a bulk run.
#[derive(Debug, Clone, Default)]
pub struct BulkSummary {
    /// Items pulled from the store.
    pub total: usize,
    /// Items finished (ok + err + skipped).
    pub processed: usize,
    /// Successful classifications.
    pub ok: usize,
    /// Failed items.
    pub err: usize,
    /// Items skipped by the skip policy.
    pub skipped: usize,
    /// Wall time of the whole run, milliseconds.
    pub duration_ms: u64,
}

/// Outcome of one worker.
enum ItemOutcome {
    Ok,
    Skipped,
    Failed,
}

/// The bulk runner.
pub struct BulkRunner {
    classifier: Arc<HierarchicalClassifier>,
    store: Arc<dyn ResultStore>,
    options: BulkOptions,
}

impl BulkRunner {
    /// Create a runner over a classifier and a store.
    pub fn new(
        classifier: Arc<HierarchicalClassifier>,
        store: Arc<dyn ResultStore>,
        options: BulkOptions,
    ) -> Self {
        Self {
            classifier,
            store,
            options,
        }
    }

    /// Run the pipeline over every item in scope.
    ///
    /// `scope` is the store-side selection (typically "unclassified
    /// only"); the skip policy still double-checks each item so a
    /// broader scope with `skip_if_classified` never reclassifies.
    /// Per-item failures are counted, not propagated; the returned
    /// error covers only run-level problems (the initial store listing,
    /// or cancellation before completion).
    pub async fn run(
        &self,
        scope: &ItemFilter,
        cancel: &CancellationToken,
        sink: Option<Arc<dyn ProgressSink>>,
    ) -> Result<BulkSummary> {
        let items = self
            .store
            .list_items_for_classification(scope, self.options.limit)
            .await?;

        let total = items.len();
        info!(
            total,
            concurrency = self.options.concurrency,
            "bulk classification started"
        );

        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency));
        let mut join_set: JoinSet<ItemOutcome> = JoinSet::new();

        for item in items {
            let permit = semaphore.clone();
            let classifier = self.classifier.clone();
            let store = self.store.clone();
            let skip_if_classified = self.options.skip_if_classified;
            let cancel = cancel.clone();

            join_set.spawn(async move {
                let Ok(_permit) = permit.acquire_owned().await else {
                    return ItemOutcome::Failed;
                };
                if cancel.is_cancelled() {
                    return ItemOutcome::Skipped;
                }
                classify_one(&classifier, &store, &item, skip_if_classified, &cancel).await
            });
        }

        let mut summary = BulkSummary {
            total,
            ..BulkSummary::default()
        };

        while let Some(joined) = join_set.join_next().await {
            if cancel.is_cancelled() {
                join_set.abort_all();
                summary.duration_ms = started.elapsed().as_millis() as u64;
                return Err(ClassifyError::Cancelled);
            }

            match joined {
                Ok(ItemOutcome::Ok) => summary.ok += 1,
                Ok(ItemOutcome::Skipped) => summary.skipped += 1,
                Ok(ItemOutcome::Failed) => summary.err += 1,
                Err(join_err) => {
                    warn!(error = %join_err, "bulk worker panicked");
                    summary.err += 1;
                }
            }
            summary.processed += 1;

            if summary.processed % PROGRESS_EVERY == 0 {
                if let Some(sink) = &sink {
                    sink.report(&progress_of(&summary, started, total));
                }
            }

            // Pacing: smooth bursts beyond the gateway's own limiter.
            if self.options.throttle_every > 0
                && summary.processed % self.options.throttle_every == 0
                && summary.processed < total
            {
                tokio::time::sleep(std::time::Duration::from_millis(
                    self.options.throttle_sleep_ms,
                ))
                .await;
            }
        }

        summary.duration_ms = started.elapsed().as_millis() as u64;
        if let Some(sink) = &sink {
            sink.report(&progress_of(&summary, started, total));
        }
        info!(
            processed = summary.processed,
            ok = summary.ok,
            err = summary.err,
            skipped = summary.skipped,
            duration_ms = summary.duration_ms,
            "bulk classification finished"
        );
        Ok(summary)
    }
}

/// Classify a single item and persist the verdict. All failures are
/// absorbed into [`ItemOutcome::Failed`].
async fn classify_one(
    classifier: &HierarchicalClassifier,
    store: &Arc<dyn ResultStore>,
    item: &CatalogItem,
    skip_if_classified: bool,
    cancel: &CancellationToken,
) -> ItemOutcome {
    if skip_if_classified {
        match store.get_classification(item.id).await {
            Ok(Some(stored)) if stored.levels.has_level1() => {
                return ItemOutcome::Skipped;
            }
            Ok(_) => {}
            Err(err) => {
                warn!(item_id = item.id, error = %err, "skip check failed");
                return ItemOutcome::Failed;
            }
        }
    }

    let request = ClassificationRequest::new(item.name.clone());
    let result = match classifier.classify(&request, cancel).await {
        Ok(result) => result,
        Err(err) => {
            warn!(item_id = item.id, item = %item.name, error = %err, "classification failed");
            return ItemOutcome::Failed;
        }
    };

    if let Err(err) = persist(store, item, &result).await {
        warn!(item_id = item.id, error = %err, "persisting classification failed");
        return ItemOutcome::Failed;
    }
    ItemOutcome::Ok
}

/// Write one verdict back through the store facade.
async fn persist(
    store: &Arc<dyn ResultStore>,
    item: &CatalogItem,
    result: &ClassificationResult,
) -> Result<()> {
    let category_original = serde_json::json!({
        "code": item.code,
        "name": item.name,
    });
    store
        .upsert_classification(
            item.id,
            category_original,
            LevelMap::from_steps(&result.steps),
            STRATEGY_ID,
            result.final_confidence,
        )
        .await
}

fn progress_of(summary: &BulkSummary, started: Instant, total: usize) -> BulkProgress {
    let elapsed = started.elapsed().as_secs_f64().max(1e-6);
    let items_per_sec = summary.processed as f64 / elapsed;
    let remaining = total.saturating_sub(summary.processed) as f64;
    let eta_sec = if items_per_sec > 0.0 {
        remaining / items_per_sec
    } else {
        0.0
    };
    BulkProgress {
        processed: summary.processed,
        ok: summary.ok,
        err: summary.err,
        skipped: summary.skipped,
        items_per_sec,
        eta_sec,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_from_config() {
        let config = EngineConfig::default();
        let options = BulkOptions::from_config(&config);
        assert_eq!(options.concurrency, 6);
        assert_eq!(options.throttle_every, 5);
        assert_eq!(options.throttle_sleep_ms, 200);
        assert!(options.skip_if_classified);
        assert!(options.limit.is_none());
    }

    #[test]
    fn concurrency_floor_is_one() {
        let config = EngineConfig {
            concurrency: 0,
            ..EngineConfig::default()
        };
        assert_eq!(BulkOptions::from_config(&config).concurrency, 1);
    }

    #[test]
    fn progress_math() {
        let summary = BulkSummary {
            total: 100,
            processed: 50,
            ok: 45,
            err: 2,
            skipped: 3,
            duration_ms: 0,
        };
        let progress = progress_of(&summary, Instant::now(), 100);
        assert_eq!(progress.processed, 50);
        assert_eq!(progress.ok, 45);
        assert!(progress.items_per_sec > 0.0);
        assert!(progress.eta_sec >= 0.0);
    }
}
