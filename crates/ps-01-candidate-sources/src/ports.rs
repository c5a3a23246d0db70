//! # Outbound Port
//!
//! A feed of proxy candidates. One call to [`CandidateProvider::collect`]
//! polls the feed once; scheduling belongs to the reconciler.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::errors::SourceError;
use crate::emitter::PageEmitter;

#[async_trait]
pub trait CandidateProvider: Send + Sync {
    /// Label used in logs and metrics.
    fn name(&self) -> &str;

    /// Fetch the feed once, pushing each accepted candidate into `emitter`.
    ///
    /// Returns [`SourceError::Cancelled`] when `cancel` fires mid-poll.
    async fn collect(
        &self,
        emitter: &mut PageEmitter<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), SourceError>;
}
