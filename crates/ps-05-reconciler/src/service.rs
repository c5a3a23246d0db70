//! # Reconciler Service
//!
//! The retry loop. One `Reconciler` per periodic task; loops never coordinate
//! with each other.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::backoff::{Backoff, ConstantBackoff, ExponentialBackoff};
use crate::domain::errors::ReconcileError;
use crate::domain::state::ReconcileCycleState;
use crate::ports::Reconcile;

/// Default steady-state interval between successful cycles.
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_secs(3600);

/// Sleep for `delay` unless `cancel` fires first.
///
/// Returns `true` if the full delay elapsed.
pub async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

/// Retry loop around one [`Reconcile`] task.
pub struct Reconciler {
    task: Arc<dyn Reconcile>,
    fail_backoff: Box<dyn Backoff>,
    wait_backoff: Box<dyn Backoff>,
}

impl Reconciler {
    /// Loop with exponential fail-backoff and an hourly wait-backoff.
    pub fn new(task: Arc<dyn Reconcile>) -> Self {
        Self {
            task,
            fail_backoff: Box::new(ExponentialBackoff::default()),
            wait_backoff: Box::new(ConstantBackoff::new(DEFAULT_WAIT_INTERVAL)),
        }
    }

    pub fn with_fail_backoff(mut self, backoff: impl Backoff + 'static) -> Self {
        self.fail_backoff = Box::new(backoff);
        self
    }

    pub fn with_wait_backoff(mut self, backoff: impl Backoff + 'static) -> Self {
        self.wait_backoff = Box::new(backoff);
        self
    }

    /// Run until `cancel` fires, the task reports cancellation, or a policy
    /// gives up. Returns the loop's final bookkeeping.
    pub async fn run(mut self, cancel: CancellationToken) -> ReconcileCycleState {
        let name = self.task.name().to_string();
        let mut state = ReconcileCycleState::default();
        info!(task = %name, "reconciler started");

        while !cancel.is_cancelled() {
            let delay = match self.task.reconcile(&cancel).await {
                Ok(()) => {
                    state.record_success();
                    self.fail_backoff.reset();
                    let delay = self.wait_backoff.next_delay();
                    self.wait_backoff.reset();
                    debug!(task = %name, ?delay, "cycle succeeded");
                    delay
                }
                Err(ReconcileError::Cancelled) => break,
                Err(err) => {
                    state.record_failure();
                    let delay = self.fail_backoff.next_delay();
                    warn!(
                        task = %name,
                        error = %err,
                        consecutive_failures = state.consecutive_failures,
                        ?delay,
                        "cycle failed"
                    );
                    delay
                }
            };

            state.last_delay = delay;
            let Some(delay) = delay else {
                warn!(task = %name, "backoff policy exhausted, stopping");
                break;
            };
            if !sleep_or_cancel(delay, &cancel).await {
                break;
            }
        }

        info!(
            task = %name,
            successes = state.total_successes,
            failures = state.total_failures,
            "reconciler stopped"
        );
        state
    }

    /// Run on its own tokio task.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<ReconcileCycleState> {
        tokio::spawn(self.run(cancel))
    }
}
