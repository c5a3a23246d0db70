//! # Bulk Test Cycle
//!
//! One pass over every pending candidate in a [`CandidateStore`]:
//!
//! 1. Count pending rows, then read them in pages of `page_size`.
//! 2. For each row, take a semaphore slot and probe it under `probe_timeout`.
//! 3. Persist successes, record every completed test, release the slot.
//! 4. Return once every launched probe has finished.
//!
//! Pages are keyed by the last candidate of the previous page, not by offset,
//! so rows leaving the pending set mid-cycle never shift the next page. Each
//! page is probed as soon as it is read.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use ps_03_proxy_prober::{ProbeError, Prober};
use ps_05_reconciler::{Reconcile, ReconcileError};
use shared_types::Candidate;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::domain::config::BulkConfig;
use crate::domain::errors::CycleError;
use crate::domain::record::to_record;
use crate::ports::outbound::{CandidateStore, ResultStore};

/// Error recorded for a probe that exceeded `probe_timeout`.
const PROBE_TIMED_OUT: &str = "probe timed out";

/// Counts for one finished cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkCycleReport {
    pub pending: usize,
    /// Probes that completed and were recorded.
    pub probed: usize,
    pub succeeded: usize,
}

/// Bulk-mode driver; run it under a `Reconciler`.
pub struct BulkTestCycle {
    config: BulkConfig,
    candidates: Arc<dyn CandidateStore>,
    prober: Arc<dyn Prober>,
    results: Arc<dyn ResultStore>,
}

impl BulkTestCycle {
    pub fn new(
        config: BulkConfig,
        candidates: Arc<dyn CandidateStore>,
        prober: Arc<dyn Prober>,
        results: Arc<dyn ResultStore>,
    ) -> Self {
        Self {
            config,
            candidates,
            prober,
            results,
        }
    }

    /// Probe every pending candidate once.
    ///
    /// Stops launching new probes when `cancel` fires or a page cannot be
    /// read, but still waits for the ones already running.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<BulkCycleReport, CycleError> {
        let pending = self
            .candidates
            .count_pending()
            .await
            .map_err(CycleError::Count)?;
        debug!(pending, "bulk cycle starting");

        let page_size = self.config.page_size.max(1);
        let slots = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut cursor: Option<Candidate> = None;
        let mut list_error = None;

        'paging: while !cancel.is_cancelled() {
            let page = match self.candidates.list_pending(cursor.as_ref(), page_size).await {
                Ok(page) => page,
                Err(source) => {
                    list_error = Some(CycleError::List {
                        after: cursor.as_ref().map(Candidate::key),
                        source,
                    });
                    break;
                }
            };
            let last_page = page.len() < page_size;
            cursor = page.last().cloned();

            for candidate in page {
                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break 'paging,
                    permit = Arc::clone(&slots).acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break 'paging,
                    },
                };
                let job = ProbeJob {
                    candidate,
                    timeout: self.config.probe_timeout,
                    candidates: Arc::clone(&self.candidates),
                    prober: Arc::clone(&self.prober),
                    results: Arc::clone(&self.results),
                    cancel: cancel.clone(),
                };
                tasks.spawn(async move {
                    let outcome = job.run().await;
                    drop(permit);
                    outcome
                });
            }
            if last_page {
                break;
            }
        }

        let mut report = BulkCycleReport {
            pending,
            ..BulkCycleReport::default()
        };
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(JobOutcome::Succeeded) => {
                    report.probed += 1;
                    report.succeeded += 1;
                }
                Ok(JobOutcome::Failed) => report.probed += 1,
                Ok(JobOutcome::Cancelled) => {}
                Err(err) => error!(error = %err, "bulk probe task failed"),
            }
        }
        match list_error {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }
}

#[async_trait]
impl Reconcile for BulkTestCycle {
    fn name(&self) -> &str {
        "bulk-test"
    }

    async fn reconcile(&self, cancel: &CancellationToken) -> Result<(), ReconcileError> {
        let report = self.run_cycle(cancel).await.map_err(ReconcileError::failed)?;
        if cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled);
        }
        info!(
            pending = report.pending,
            probed = report.probed,
            succeeded = report.succeeded,
            "finished proxy reconciliation"
        );
        Ok(())
    }
}

enum JobOutcome {
    Succeeded,
    Failed,
    Cancelled,
}

struct ProbeJob {
    candidate: Candidate,
    timeout: Duration,
    candidates: Arc<dyn CandidateStore>,
    prober: Arc<dyn Prober>,
    results: Arc<dyn ResultStore>,
    cancel: CancellationToken,
}

impl ProbeJob {
    async fn run(self) -> JobOutcome {
        let probe = self.prober.probe(&self.candidate, &self.cancel);
        let outcome = tokio::time::timeout(self.timeout, probe).await;
        let tested_at = Utc::now();

        let (error, result) = match outcome {
            Err(_) => (Some(PROBE_TIMED_OUT.to_string()), JobOutcome::Failed),
            Ok(Err(ProbeError::Cancelled)) => return JobOutcome::Cancelled,
            Ok(Err(err)) => (Some(err.to_string()), JobOutcome::Failed),
            Ok(Ok(best)) if best.success() => {
                let record = to_record(&self.candidate, &best, tested_at);
                match self.results.upsert(&record).await {
                    Ok(()) => (None, JobOutcome::Succeeded),
                    Err(err) => {
                        error!(proxy = %self.candidate, error = %err, "failed to persist test result");
                        (Some(err.to_string()), JobOutcome::Succeeded)
                    }
                }
            }
            Ok(Ok(best)) => (best.result.error, JobOutcome::Failed),
        };

        if let Err(err) = self
            .candidates
            .record_tested(&self.candidate, tested_at, error)
            .await
        {
            error!(proxy = %self.candidate, error = %err, "failed to record test");
        }
        result
    }
}
