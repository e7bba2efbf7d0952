//! One crawl session: a single browser working through its share of
//! targets, one at a time.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use placecrawl_core::{CrawlTarget, EntityId, MasterIdSet, StoreRecord};
use tracing::Instrument;

use crate::classifier::{self, FrameState};
use crate::enrich::{enrich, SecondarySource};
use crate::error::{PortError, ScraperError};
use crate::extract::{parse_entity_id, Extractor};
use crate::port::AutomationPort;
use crate::resolver::Resolver;
use crate::settings::CrawlSettings;

/// Durable destination for checkpoint batches.
#[async_trait]
pub trait CheckpointSink: Send + Sync {
    /// Persist `batch` as flush number `seq` of session `worker_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Checkpoint`] if the batch could not be
    /// persisted; the session keeps the batch and tries again later.
    async fn flush(
        &self,
        worker_id: usize,
        seq: usize,
        batch: &[StoreRecord],
    ) -> Result<(), ScraperError>;
}

/// Operator stop request. Sessions finish their current target and then
/// stop taking new ones.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Read-only inputs shared by every session of a run.
pub struct SessionContext {
    pub settings: CrawlSettings,
    pub master_ids: Arc<MasterIdSet>,
    pub sink: Arc<dyn CheckpointSink>,
    pub secondary: Option<Arc<dyn SecondarySource>>,
    pub stop: StopSignal,
}

/// Why a target produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureReason {
    NoResults,
    Unknown,
    Transport,
    Browser,
    NoCandidates,
    ResolutionFailed,
    IdentityMismatch,
    MissingEntityId,
    SessionUnavailable,
    Other,
}

impl FailureReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FailureReason::NoResults => "no_results",
            FailureReason::Unknown => "unknown_state",
            FailureReason::Transport => "transport",
            FailureReason::Browser => "browser",
            FailureReason::NoCandidates => "no_candidates",
            FailureReason::ResolutionFailed => "resolution_failed",
            FailureReason::IdentityMismatch => "identity_mismatch",
            FailureReason::MissingEntityId => "missing_entity_id",
            FailureReason::SessionUnavailable => "session_unavailable",
            FailureReason::Other => "other",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&ScraperError> for FailureReason {
    fn from(err: &ScraperError) -> Self {
        match err {
            ScraperError::Port(PortError::Transport(_)) => FailureReason::Transport,
            ScraperError::Port(_) => FailureReason::Browser,
            ScraperError::NoResults => FailureReason::NoResults,
            ScraperError::UnknownState => FailureReason::Unknown,
            ScraperError::NoCandidates => FailureReason::NoCandidates,
            ScraperError::ResolutionFailed { .. } => FailureReason::ResolutionFailed,
            ScraperError::IdentityMismatch { .. } => FailureReason::IdentityMismatch,
            ScraperError::MissingEntityId { .. } => FailureReason::MissingEntityId,
            ScraperError::Checkpoint { .. } | ScraperError::Secondary { .. } => {
                FailureReason::Other
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct TargetFailure {
    pub target: CrawlTarget,
    pub reason: FailureReason,
    pub message: String,
}

/// Everything one session produced.
#[derive(Debug, Default)]
pub struct SessionReport {
    pub worker_id: usize,
    /// Every collected record, flushed or not, in collection order.
    pub records: Vec<StoreRecord>,
    pub failures: Vec<TargetFailure>,
    /// Targets that resolved to an entity already in the master snapshot.
    pub skipped_known: usize,
    pub flushes: usize,
    /// Records still unflushed when the session ended.
    pub unflushed: usize,
    /// Targets left untouched because of a stop request.
    pub not_attempted: usize,
}

impl SessionReport {
    /// Report for a session whose browser never started: every target fails.
    #[must_use]
    pub fn unavailable(worker_id: usize, targets: Vec<CrawlTarget>, message: &str) -> Self {
        Self {
            worker_id,
            failures: targets
                .into_iter()
                .map(|target| TargetFailure {
                    target,
                    reason: FailureReason::SessionUnavailable,
                    message: message.to_string(),
                })
                .collect(),
            ..Self::default()
        }
    }
}

enum Outcome {
    Collected(Box<StoreRecord>),
    AlreadyKnown(EntityId),
}

pub struct CrawlSession {
    worker_id: usize,
    port: Box<dyn AutomationPort>,
    ctx: Arc<SessionContext>,
    batch: Vec<StoreRecord>,
    next_seq: usize,
}

impl CrawlSession {
    #[must_use]
    pub fn new(worker_id: usize, port: Box<dyn AutomationPort>, ctx: Arc<SessionContext>) -> Self {
        Self {
            worker_id,
            port,
            ctx,
            batch: Vec::new(),
            next_seq: 0,
        }
    }

    /// Process `targets` in order and release the browser. Per-target
    /// failures are recorded in the report; they never end the session.
    pub async fn run(self, targets: Vec<CrawlTarget>) -> SessionReport {
        let span = tracing::info_span!("session", worker_id = self.worker_id);
        self.run_inner(targets).instrument(span).await
    }

    async fn run_inner(mut self, targets: Vec<CrawlTarget>) -> SessionReport {
        let mut report = SessionReport {
            worker_id: self.worker_id,
            ..SessionReport::default()
        };
        let total = targets.len();
        tracing::info!(targets = total, "session started");

        for (idx, target) in targets.into_iter().enumerate() {
            if self.ctx.stop.is_stopped() {
                report.not_attempted = total - idx;
                tracing::info!(remaining = report.not_attempted, "stop requested, halting");
                break;
            }
            if idx > 0 {
                self.pause().await;
            }

            match self.process(&target).await {
                Ok(Outcome::Collected(record)) => {
                    tracing::info!(
                        query = %target,
                        entity_id = %record.entity_id,
                        name = %record.name,
                        "record collected"
                    );
                    report.records.push((*record).clone());
                    self.batch.push(*record);
                    let size = self.ctx.settings.checkpoint_size;
                    if size > 0 && self.batch.len() >= size {
                        self.flush(&mut report).await;
                    }
                }
                Ok(Outcome::AlreadyKnown(entity_id)) => {
                    tracing::info!(
                        query = %target,
                        entity_id = %entity_id,
                        "already collected, skipping"
                    );
                    report.skipped_known += 1;
                }
                Err(err) => {
                    let reason = FailureReason::from(&err);
                    tracing::warn!(
                        query = %target,
                        reason = %reason,
                        error = %err,
                        "target failed"
                    );
                    report.failures.push(TargetFailure {
                        target,
                        reason,
                        message: err.to_string(),
                    });
                }
            }
        }

        self.flush(&mut report).await;
        report.unflushed = self.batch.len();

        if let Err(e) = self.port.close().await {
            tracing::warn!(error = %e, "failed to close browser");
        }
        tracing::info!(
            records = report.records.len(),
            failures = report.failures.len(),
            skipped_known = report.skipped_known,
            "session finished"
        );
        report
    }

    async fn process(&self, target: &CrawlTarget) -> Result<Outcome, ScraperError> {
        let port = self.port.as_ref();
        let timings = &self.ctx.settings.timings;

        classifier::reset(port, timings).await?;
        classifier::submit_search(port, &target.name).await?;
        let detail_ref = match classifier::classify(port, timings).await {
            FrameState::SingleResult { detail_ref } => detail_ref,
            FrameState::CandidateList => {
                Resolver::new(port, timings).resolve(target).await?.detail_ref
            }
            FrameState::NoResults => return Err(ScraperError::NoResults),
            FrameState::Unknown => return Err(ScraperError::UnknownState),
            FrameState::TransportError(err) => return Err(err.into()),
        };

        let entity_id = parse_entity_id(&detail_ref)?;
        if self.ctx.master_ids.contains(entity_id) {
            return Ok(Outcome::AlreadyKnown(entity_id));
        }

        let mut record = Extractor::new(port, &self.ctx.settings, Utc::now())
            .extract(target, &detail_ref)
            .await?;
        if let Some(source) = &self.ctx.secondary {
            record.secondary = enrich(source.as_ref(), &record).await;
        }
        Ok(Outcome::Collected(Box::new(record)))
    }

    /// Hand the current batch to the sink. On failure the batch is kept and
    /// retried at the next flush point.
    async fn flush(&mut self, report: &mut SessionReport) {
        if self.batch.is_empty() {
            return;
        }
        match self.ctx.sink.flush(self.worker_id, self.next_seq, &self.batch).await {
            Ok(()) => {
                tracing::info!(
                    seq = self.next_seq,
                    records = self.batch.len(),
                    "checkpoint flushed"
                );
                self.batch.clear();
                self.next_seq += 1;
                report.flushes += 1;
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    retained = self.batch.len(),
                    "checkpoint flush failed, keeping batch"
                );
            }
        }
    }

    /// Random pause of up to one settle period between targets.
    async fn pause(&self) {
        let settle = self.ctx.settings.timings.settle;
        if settle.is_zero() {
            return;
        }
        // settle is a few seconds; the product stays well inside u64 millis
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let jitter_ms = (settle.as_millis() as f64 * rand::random::<f64>()) as u64;
        tokio::time::sleep(Duration::from_millis(jitter_ms)).await;
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
