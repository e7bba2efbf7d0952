//! Fans a target list out over concurrent crawl sessions and merges what
//! they produce.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use placecrawl_core::{CrawlTarget, MasterIdSet, StoreRecord};

use crate::port::PortFactory;
use crate::session::{CrawlSession, FailureReason, SessionContext, SessionReport, TargetFailure};

/// Merged outcome of one run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub sessions: usize,
    /// Deduplicated records, in session-completion order.
    pub records: Vec<StoreRecord>,
    pub failures: Vec<TargetFailure>,
    pub skipped_known: usize,
    /// Records dropped at merge time because another session already
    /// produced the same entity.
    pub duplicates_dropped: usize,
    pub flushes: usize,
    pub unflushed: usize,
    pub not_attempted: usize,
}

impl RunSummary {
    #[must_use]
    pub fn failures_by_reason(&self) -> BTreeMap<FailureReason, usize> {
        let mut counts = BTreeMap::new();
        for failure in &self.failures {
            *counts.entry(failure.reason).or_insert(0) += 1;
        }
        counts
    }
}

/// Split `targets` into at most `workers` contiguous chunks whose sizes
/// differ by at most one. Input order is preserved.
#[must_use]
pub fn chunk_targets(targets: Vec<CrawlTarget>, workers: usize) -> Vec<Vec<CrawlTarget>> {
    if targets.is_empty() {
        return Vec::new();
    }
    let n = workers.clamp(1, targets.len());
    let base = targets.len() / n;
    let extra = targets.len() % n;

    let mut rest = targets.into_iter();
    (0..n)
        .map(|idx| {
            let size = base + usize::from(idx < extra);
            rest.by_ref().take(size).collect()
        })
        .collect()
}

/// Run one session per chunk concurrently and merge the results.
///
/// A session that cannot open its browser, or whose task dies, reports its
/// whole chunk as `SessionUnavailable`; sibling sessions are unaffected.
pub async fn run(
    factory: Arc<dyn PortFactory>,
    ctx: Arc<SessionContext>,
    targets: Vec<CrawlTarget>,
    workers: usize,
) -> RunSummary {
    let total = targets.len();
    let chunks = chunk_targets(targets, workers);
    let sessions = chunks.len();
    tracing::info!(targets = total, sessions, "starting crawl");

    let handles: Vec<_> = chunks
        .into_iter()
        .enumerate()
        .map(|(worker_id, chunk)| {
            let pending = chunk.clone();
            let handle = tokio::spawn(run_worker(
                worker_id,
                Arc::clone(&factory),
                Arc::clone(&ctx),
                chunk,
            ));
            (worker_id, pending, handle)
        })
        .collect();

    let reports: Vec<SessionReport> = stream::iter(handles)
        .map(|(worker_id, pending, handle)| async move {
            match handle.await {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!(worker_id, error = %e, "session task failed");
                    SessionReport::unavailable(worker_id, pending, &e.to_string())
                }
            }
        })
        .buffer_unordered(sessions.max(1))
        .collect()
        .await;

    let summary = merge(reports, &ctx.master_ids);
    tracing::info!(
        records = summary.records.len(),
        failures = summary.failures.len(),
        skipped_known = summary.skipped_known,
        duplicates_dropped = summary.duplicates_dropped,
        "crawl finished"
    );
    summary
}

async fn run_worker(
    worker_id: usize,
    factory: Arc<dyn PortFactory>,
    ctx: Arc<SessionContext>,
    chunk: Vec<CrawlTarget>,
) -> SessionReport {
    match factory.open(worker_id).await {
        Ok(port) => CrawlSession::new(worker_id, port, ctx).run(chunk).await,
        Err(e) => {
            tracing::error!(
                worker_id,
                targets = chunk.len(),
                error = %e,
                "could not open browser session"
            );
            SessionReport::unavailable(worker_id, chunk, &e.to_string())
        }
    }
}

/// Concatenate session reports, dropping records already in the master
/// snapshot and keeping the first record seen per entity.
fn merge(reports: Vec<SessionReport>, master_ids: &MasterIdSet) -> RunSummary {
    let mut summary = RunSummary {
        sessions: reports.len(),
        ..RunSummary::default()
    };
    let mut seen = HashSet::new();

    for report in reports {
        summary.failures.extend(report.failures);
        summary.skipped_known += report.skipped_known;
        summary.flushes += report.flushes;
        summary.unflushed += report.unflushed;
        summary.not_attempted += report.not_attempted;

        for record in report.records {
            if master_ids.contains(record.entity_id) {
                summary.skipped_known += 1;
            } else if seen.insert(record.entity_id) {
                summary.records.push(record);
            } else {
                summary.duplicates_dropped += 1;
            }
        }
    }
    summary
}
