//! # Stream Utilities (ps-06)
//!
//! Reusable stages for shaping the candidate stream upstream of the sink.
//!
//! ```text
//! feeds ──Vec<T>──→ [WindowedBatcher] ──Vec<T>──→ [UniqueFilter] ──Vec<T>──→ [flatten] ──T──→ sink
//! ```
//!
//! Every stage owns its state exclusively and communicates only through
//! `mpsc` channels. A stage exits when its upstream closes, its downstream
//! is dropped, or the cancellation token fires; in all cases it drops its
//! sender so the next stage observes completion.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod batcher;
pub mod flatten;
pub mod unique;

pub use batcher::WindowedBatcher;
pub use flatten::flatten;
pub use unique::UniqueFilter;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Send `item` downstream unless cancellation fires first.
///
/// Returns `false` when the stage should stop: the receiver is gone or the
/// token was cancelled.
pub async fn send_or_cancel<T>(
    to: &mpsc::Sender<T>,
    item: T,
    cancel: &CancellationToken,
) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        res = to.send(item) => res.is_ok(),
    }
}
