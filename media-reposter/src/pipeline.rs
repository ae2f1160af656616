use crate::aggregator::CandidateAggregator;
use crate::config::{RunConfig, SourceEntry, SourcesConfig};
use crate::executor::ActionExecutor;
use crate::ledger::Ledger;
use crate::normalizer::resolve_source;
use crate::state::{RunContext, RunSummary};
use crate::types::{Result, SocialClient, Source, SourceKind};
use chrono::{DateTime, Utc};
use tracing::info;

/// Resolve every configured feed and list. Unresolvable ones are logged and
/// come back with no uri; they are never retried within the run.
pub async fn resolve_sources(client: &dyn SocialClient, sources: &SourcesConfig) -> Vec<Source> {
    let mut resolved = Vec::with_capacity(sources.feeds.len() + sources.lists.len());
    resolve_entries(client, SourceKind::Feed, &sources.feeds, &mut resolved).await;
    resolve_entries(client, SourceKind::List, &sources.lists, &mut resolved).await;
    resolved
}

async fn resolve_entries(client: &dyn SocialClient, kind: SourceKind, entries: &[SourceEntry], out: &mut Vec<Source>) {
    for entry in entries {
        let source = resolve_source(client, kind, &entry.key, entry.note.as_deref(), &entry.link).await;
        out.push(source);
    }

    if !out.iter().any(|s| s.kind == kind && s.uri.is_some()) {
        info!("No usable {} configured, skipping that block", kind.label());
    }
}

/// One full pass: resolve sources, aggregate candidates, act on them and
/// persist the ledger.
pub async fn run(client: &dyn SocialClient, config: &RunConfig, sources: &SourcesConfig) -> Result<RunSummary> {
    run_at(client, config, sources, Utc::now()).await
}

/// [`run`] with an explicit clock, so the eligibility window is reproducible.
pub async fn run_at(
    client: &dyn SocialClient,
    config: &RunConfig,
    sources: &SourcesConfig,
    now: DateTime<Utc>,
) -> Result<RunSummary> {
    let cutoff = config.cutoff(now);
    let mut ledger = Ledger::load(&config.ledger_path).await?;
    let resolved = resolve_sources(client, sources).await;

    let mut ctx = RunContext::new();

    let aggregator = CandidateAggregator::new(client, config.scan.clone(), cutoff, sources.exemption_set());
    let candidates = aggregator.collect(&resolved, &ledger, &mut ctx).await;

    let executor = ActionExecutor::new(client, config.executor.clone());
    executor.execute(&candidates, &mut ledger, &mut ctx).await;

    ledger.save().await?;

    let summary = ctx.summary();
    summary.log();
    Ok(summary)
}
