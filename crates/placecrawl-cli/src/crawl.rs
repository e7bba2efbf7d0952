use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Context;
use placecrawl_core::{load_targets, AppConfig, CrawlTarget};
use placecrawl_scraper::{
    orchestrator, ChromeFactory, CrawlSettings, RunSummary, SessionContext, StopSignal,
};
use placecrawl_store::{load_master_ids, PartialWriter, Storage};
use uuid::Uuid;

use crate::CrawlArgs;

pub(crate) async fn run(config: AppConfig, args: CrawlArgs) -> anyhow::Result<()> {
    let config = apply_overrides(config, &args)?;
    let targets = resolve_targets(&config, &args)?;

    if args.dry_run {
        println!("{} target(s), {} worker(s):", targets.len(), config.workers);
        for target in &targets {
            println!("  {target}");
        }
        return Ok(());
    }

    let storage = Storage::from_config(&config).context("opening output storage")?;
    let master_ids = Arc::new(load_master_ids(&storage, &config.master_prefix).await);
    let run_id = Uuid::new_v4();
    let writer = PartialWriter::new(storage, run_id);
    tracing::info!(
        %run_id,
        targets = targets.len(),
        workers = config.workers,
        known_ids = master_ids.len(),
        partials = %writer.run_location(),
        "crawl starting"
    );

    let stop = StopSignal::new();
    tokio::spawn(stop_on_ctrl_c(stop.clone()));

    let ctx = Arc::new(SessionContext {
        settings: CrawlSettings::from_config(&config),
        master_ids,
        sink: Arc::new(writer),
        secondary: None,
        stop,
    });
    let factory = Arc::new(ChromeFactory::from_config(&config));

    let summary = orchestrator::run(factory, ctx, targets, config.workers).await;
    println!("{}", format_summary(run_id, &summary));
    Ok(())
}

pub(crate) fn apply_overrides(config: AppConfig, args: &CrawlArgs) -> anyhow::Result<AppConfig> {
    let mut config = match args.workers {
        Some(workers) => config.with_workers(workers)?,
        None => config,
    };
    if args.show_browser {
        config.headless = false;
    }
    Ok(config)
}

pub(crate) fn resolve_targets(
    config: &AppConfig,
    args: &CrawlArgs,
) -> anyhow::Result<Vec<CrawlTarget>> {
    if let Some(query) = &args.query {
        let mut target = CrawlTarget::new(query, args.location.as_deref());
        if let Some(address) = &args.address {
            target = target.with_address(address);
        }
        anyhow::ensure!(!target.name.is_empty(), "--query must not be blank");
        return Ok(vec![target]);
    }

    let path = args.targets.as_ref().unwrap_or(&config.targets_path);
    let file = load_targets(path)
        .with_context(|| format!("loading targets from {}", path.display()))?;
    Ok(file.targets)
}

async fn stop_on_ctrl_c(stop: StopSignal) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::warn!("stop requested; finishing in-flight targets");
        stop.stop();
    }
}

pub(crate) fn format_summary(run_id: Uuid, summary: &RunSummary) -> String {
    let mut out = format!(
        "run {run_id}: {} record(s) from {} session(s)\n\
         skipped (already known): {}\n\
         duplicates dropped: {}\n\
         checkpoint flushes: {}",
        summary.records.len(),
        summary.sessions,
        summary.skipped_known,
        summary.duplicates_dropped,
        summary.flushes,
    );
    if summary.unflushed > 0 {
        let _ = write!(out, "\nNOT PERSISTED (checkpoint failures): {}", summary.unflushed);
    }
    if summary.not_attempted > 0 {
        let _ = write!(out, "\nnot attempted (stopped): {}", summary.not_attempted);
    }
    let by_reason = summary.failures_by_reason();
    if by_reason.is_empty() {
        out.push_str("\nfailures: 0");
    } else {
        let _ = write!(out, "\nfailures: {}", summary.failures.len());
        for (reason, count) in by_reason {
            let _ = write!(out, "\n  {reason}: {count}");
        }
    }
    out
}
