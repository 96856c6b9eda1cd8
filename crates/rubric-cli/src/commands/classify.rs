//! `rubric classify` — classify one item name.

use std::path::PathBuf;

use clap::Args;
use tokio_util::sync::CancellationToken;

use rubric_types::ClassificationRequest;

/// Arguments for `rubric classify`.
#[derive(Args)]
pub struct ClassifyArgs {
    /// Item name to classify.
    pub name: String,

    /// Optional free-form category hint.
    #[arg(short = 'H', long)]
    pub hint: Option<String>,

    /// Path to the taxonomy dump (JSON array of nodes).
    #[arg(short, long)]
    pub taxonomy: PathBuf,

    /// Engine config file (JSON). Defaults apply when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub async fn run(args: ClassifyArgs) -> anyhow::Result<()> {
    let config = super::load_config(args.config.as_deref()).await?;
    let (_taxonomy, classifier) = super::build_classifier(&args.taxonomy, &config).await?;

    let mut request = ClassificationRequest::new(args.name);
    if let Some(hint) = args.hint {
        request = request.with_category(hint);
    }

    let cancel = CancellationToken::new();
    let result = classifier.classify(&request, &cancel).await?;

    println!("code:       {}", result.final_code);
    println!("name:       {}", result.final_name);
    println!("confidence: {:.2}", result.final_confidence);
    if result.corrected {
        println!("corrected:  yes");
    }
    if result.lowered {
        println!("lowered:    yes");
    }
    println!(
        "ai calls: {}, cache hits: {}, {} ms",
        result.ai_calls, result.cache_hits, result.total_duration_ms
    );
    println!("path:");
    for step in &result.steps {
        println!(
            "  [{}] {} — {} ({:.2})",
            step.level, step.code, step.name, step.confidence
        );
    }
    Ok(())
}
