//! `rubric bulk` — classify a whole catalog file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use tokio_util::sync::CancellationToken;

use rubric_core::bulk::{BulkOptions, BulkProgress, BulkRunner, ProgressSink};
use rubric_core::store::{CatalogItem, ItemFilter, MemoryStore};

/// Arguments for `rubric bulk`.
#[derive(Args)]
pub struct BulkArgs {
    /// Path to the catalog file: a JSON array of {id, code, name}.
    pub items: PathBuf,

    /// Path to the taxonomy dump (JSON array of nodes).
    #[arg(short, long)]
    pub taxonomy: PathBuf,

    /// Engine config file (JSON). Defaults apply when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Cap the number of items processed.
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Reclassify items that already have a category.
    #[arg(long)]
    pub reclassify: bool,
}

/// Prints each progress report on one line.
struct PrintSink;

impl ProgressSink for PrintSink {
    fn report(&self, progress: &BulkProgress) {
        println!(
            "processed {} (ok {}, err {}, skipped {}) — {:.1} items/s, eta {:.0}s",
            progress.processed,
            progress.ok,
            progress.err,
            progress.skipped,
            progress.items_per_sec,
            progress.eta_sec
        );
    }
}

pub async fn run(args: BulkArgs) -> anyhow::Result<()> {
    let config = super::load_config(args.config.as_deref()).await?;
    let (_taxonomy, classifier) = super::build_classifier(&args.taxonomy, &config).await?;

    let raw = tokio::fs::read_to_string(&args.items)
        .await
        .with_context(|| format!("reading items {}", args.items.display()))?;
    let items: Vec<CatalogItem> =
        serde_json::from_str(&raw).with_context(|| format!("parsing items {}", args.items.display()))?;
    let store = Arc::new(MemoryStore::with_items(items));

    let mut options = BulkOptions::from_config(&config);
    options.limit = args.limit;
    options.skip_if_classified = !args.reclassify;

    let runner = BulkRunner::new(classifier, store.clone(), options);
    let cancel = CancellationToken::new();
    let summary = runner
        .run(&ItemFilter::default(), &cancel, Some(Arc::new(PrintSink)))
        .await?;

    println!(
        "done: {} items in {} ms — ok {}, err {}, skipped {}",
        summary.processed, summary.duration_ms, summary.ok, summary.err, summary.skipped
    );
    Ok(())
}
