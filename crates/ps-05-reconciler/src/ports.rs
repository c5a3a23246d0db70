//! # Inbound Port
//!
//! Periodic work driven by a [`crate::Reconciler`].

use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::errors::ReconcileError;

/// One cycle of periodic work.
///
/// Implementations observe `cancel` themselves and return
/// [`ReconcileError::Cancelled`] when they stop early because of it.
#[async_trait]
pub trait Reconcile: Send + Sync {
    /// Label used in logs and metrics.
    fn name(&self) -> &str;

    /// Run one cycle.
    async fn reconcile(&self, cancel: &CancellationToken) -> Result<(), ReconcileError>;
}

/// Adapter turning an async closure into a [`Reconcile`] task.
pub struct ReconcileFn<F> {
    name: String,
    f: F,
}

/// Build a [`ReconcileFn`].
pub fn reconcile_fn<F, Fut>(name: impl Into<String>, f: F) -> ReconcileFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ReconcileError>> + Send,
{
    ReconcileFn {
        name: name.into(),
        f,
    }
}

#[async_trait]
impl<F, Fut> Reconcile for ReconcileFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ReconcileError>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn reconcile(&self, cancel: &CancellationToken) -> Result<(), ReconcileError> {
        (self.f)(cancel.clone()).await
    }
}
