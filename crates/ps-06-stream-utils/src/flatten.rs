use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::send_or_cancel;

/// Unpack batches into single items, preserving order.
///
/// Exits when upstream closes, downstream is dropped or `cancel` fires.
pub async fn flatten<T: Send>(
    cancel: CancellationToken,
    mut from: mpsc::Receiver<Vec<T>>,
    to: mpsc::Sender<T>,
) {
    let mut forwarded = 0usize;
    loop {
        let batch = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            batch = from.recv() => match batch {
                Some(batch) => batch,
                None => break,
            },
        };
        for item in batch {
            if !send_or_cancel(&to, item, &cancel).await {
                debug!(forwarded, "flatten stopped early");
                return;
            }
            forwarded += 1;
        }
    }
    debug!(forwarded, "flatten finished");
}
