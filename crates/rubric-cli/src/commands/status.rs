//! `rubric status` — resolved configuration and gateway diagnostics.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;

use rubric_llm::{AiGateway, OpenAiCompatBackend};

/// Arguments for `rubric status`.
#[derive(Args)]
pub struct StatusArgs {
    /// Engine config file (JSON). Defaults apply when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub async fn run(args: StatusArgs) -> anyhow::Result<()> {
    let config = super::load_config(args.config.as_deref()).await?;
    let backend_config = super::backend_config();
    let key_set = std::env::var(&backend_config.api_key_env).is_ok();

    println!("endpoint:   {}", backend_config.base_url);
    println!(
        "api key:    {} ({})",
        if key_set { "set" } else { "MISSING" },
        backend_config.api_key_env
    );

    let backend = Arc::new(OpenAiCompatBackend::new(backend_config));
    let gateway = AiGateway::new(backend, &config);
    let snapshot = gateway.snapshot();

    println!("model:      {}", gateway.model());
    println!(
        "rate limit: {}/s, burst {}",
        config.rate_limit_per_sec, config.rate_limit_burst
    );
    println!(
        "breaker:    {} (failures {}, successes {}, can proceed: {})",
        snapshot.state, snapshot.failure_count, snapshot.success_count, snapshot.can_proceed
    );
    println!(
        "thresholds: open after {}, close after {}, cooldown {}s",
        config.cb_failure_threshold, config.cb_success_threshold, config.cb_cooldown_secs
    );
    println!(
        "pipeline:   min confidence {}, max levels {}, concurrency {}",
        config.min_confidence, config.max_levels, config.concurrency
    );
    Ok(())
}
