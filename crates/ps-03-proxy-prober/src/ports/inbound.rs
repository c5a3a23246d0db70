use async_trait::async_trait;
use shared_types::Candidate;
use tokio_util::sync::CancellationToken;

use crate::domain::errors::ProbeError;
use crate::domain::result::BestResult;

/// Probe a candidate and decide its best protocol.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Fails only on cancellation or when every protocol hit the deadline.
    async fn probe(
        &self,
        candidate: &Candidate,
        cancel: &CancellationToken,
    ) -> Result<BestResult, ProbeError>;
}
