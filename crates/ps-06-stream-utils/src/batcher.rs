//! # Windowed Batcher
//!
//! Re-chunks an inbound stream of variable-size pages into batches of at most
//! `capacity` items.
//!
//! - A batch is emitted as soon as the buffer reaches `capacity`.
//! - A partial batch is emitted when `flush_interval` elapses without new
//!   input. The timer restarts on every inbound page and is only armed while
//!   the buffer is non-empty, so the flush never emits an empty batch.
//! - When upstream closes, the remaining partial batch is flushed and the
//!   downstream sender is dropped.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::send_or_cancel;

/// Default batch capacity.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default idle flush interval.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(1000);

/// Windowed batching stage.
#[derive(Debug, Clone, Copy)]
pub struct WindowedBatcher {
    capacity: usize,
    flush_interval: Duration,
}

impl Default for WindowedBatcher {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL)
    }
}

impl WindowedBatcher {
    /// Create a batcher. A zero capacity is treated as one.
    pub fn new(capacity: usize, flush_interval: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            flush_interval,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Run the stage until upstream closes, downstream is dropped or `cancel`
    /// fires. Consumes `to`, so downstream sees the channel close on return.
    pub async fn run<T: Send>(
        self,
        cancel: CancellationToken,
        mut from: mpsc::Receiver<Vec<T>>,
        to: mpsc::Sender<Vec<T>>,
    ) {
        let mut buffer: Vec<T> = Vec::with_capacity(self.capacity);
        let flush = time::sleep(self.flush_interval);
        tokio::pin!(flush);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(pending = buffer.len(), "batcher cancelled");
                    return;
                }
                page = from.recv() => {
                    let Some(page) = page else {
                        if !buffer.is_empty() {
                            trace!(size = buffer.len(), "flushing final batch");
                            send_or_cancel(&to, buffer, &cancel).await;
                        }
                        return;
                    };
                    flush.as_mut().reset(Instant::now() + self.flush_interval);
                    for item in page {
                        buffer.push(item);
                        if buffer.len() == self.capacity {
                            let full = std::mem::replace(
                                &mut buffer,
                                Vec::with_capacity(self.capacity),
                            );
                            if !send_or_cancel(&to, full, &cancel).await {
                                return;
                            }
                        }
                    }
                }
                _ = &mut flush, if !buffer.is_empty() => {
                    trace!(size = buffer.len(), "flush interval elapsed");
                    let partial = std::mem::replace(
                        &mut buffer,
                        Vec::with_capacity(self.capacity),
                    );
                    if !send_or_cancel(&to, partial, &cancel).await {
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    async fn collect<T>(mut rx: mpsc::Receiver<Vec<T>>) -> Vec<Vec<T>> {
        let mut out = Vec::new();
        while let Some(batch) = rx.recv().await {
            out.push(batch);
        }
        out
    }

    // =========================================================================
    // TEST GROUP 1: Capacity and closure
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_emits_full_batches_and_flushes_on_close() {
        let (in_tx, in_rx) = mpsc::channel(8);
        let (out_tx, out_rx) = mpsc::channel(8);
        let task = tokio::spawn(
            WindowedBatcher::new(3, Duration::from_secs(60)).run(
                CancellationToken::new(),
                in_rx,
                out_tx,
            ),
        );

        in_tx.send(vec![1, 2]).await.unwrap();
        in_tx.send(vec![3, 4, 5, 6, 7]).await.unwrap();
        drop(in_tx);

        let batches = collect(out_rx).await;
        task.await.unwrap();
        assert_eq!(batches, vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closing_empty_stream_emits_nothing() {
        let (in_tx, in_rx) = mpsc::channel::<Vec<u8>>(1);
        let (out_tx, out_rx) = mpsc::channel(1);
        drop(in_tx);
        WindowedBatcher::new(4, Duration::from_millis(10))
            .run(CancellationToken::new(), in_rx, out_tx)
            .await;
        assert!(collect(out_rx).await.is_empty());
    }

    // =========================================================================
    // TEST GROUP 2: Flush timer
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_flush_timer_emits_partial_batch() {
        let (in_tx, in_rx) = mpsc::channel(8);
        let (out_tx, mut out_rx) = mpsc::channel(8);
        tokio::spawn(WindowedBatcher::new(10, Duration::from_millis(500)).run(
            CancellationToken::new(),
            in_rx,
            out_tx,
        ));

        in_tx.send(vec!["a", "b"]).await.unwrap();
        time::advance(Duration::from_millis(499)).await;
        assert!(out_rx.try_recv().is_err());

        let batch = out_rx.recv().await.unwrap();
        assert_eq!(batch, vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_restarts_flush_timer() {
        let (in_tx, in_rx) = mpsc::channel(8);
        let (out_tx, mut out_rx) = mpsc::channel(8);
        tokio::spawn(WindowedBatcher::new(10, Duration::from_millis(500)).run(
            CancellationToken::new(),
            in_rx,
            out_tx,
        ));

        in_tx.send(vec![1]).await.unwrap();
        time::sleep(Duration::from_millis(400)).await;
        in_tx.send(vec![2]).await.unwrap();
        time::sleep(Duration::from_millis(400)).await;
        assert!(out_rx.try_recv().is_err());

        let started = Instant::now();
        assert_eq!(out_rx.recv().await.unwrap(), vec![1, 2]);
        assert!(started.elapsed() <= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_timer_never_emits_empty_batch() {
        let (in_tx, in_rx) = mpsc::channel::<Vec<u8>>(8);
        let (out_tx, mut out_rx) = mpsc::channel(8);
        tokio::spawn(WindowedBatcher::new(2, Duration::from_millis(50)).run(
            CancellationToken::new(),
            in_rx,
            out_tx,
        ));

        in_tx.send(vec![1, 2]).await.unwrap();
        assert_eq!(out_rx.recv().await.unwrap(), vec![1, 2]);
        time::sleep(Duration::from_secs(5)).await;
        assert!(out_rx.try_recv().is_err());
        drop(in_tx);
        assert!(out_rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_stage_and_closes_downstream() {
        let (_in_tx, in_rx) = mpsc::channel::<Vec<u8>>(8);
        let (out_tx, mut out_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(WindowedBatcher::default().run(cancel.clone(), in_rx, out_tx));

        cancel.cancel();
        task.await.unwrap();
        assert!(out_rx.recv().await.is_none());
    }

    // =========================================================================
    // TEST GROUP 3: Order and size property
    // =========================================================================

    proptest! {
        #[test]
        fn prop_batches_preserve_order_and_respect_capacity(
            pages in proptest::collection::vec(proptest::collection::vec(any::<u16>(), 0..20), 0..20),
            capacity in 1usize..12,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            let expected: Vec<u16> = pages.iter().flatten().copied().collect();

            let batches = rt.block_on(async {
                let (in_tx, in_rx) = mpsc::channel(pages.len().max(1));
                let (out_tx, out_rx) = mpsc::channel(expected.len().max(1));
                let stage = tokio::spawn(
                    WindowedBatcher::new(capacity, Duration::from_secs(3600))
                        .run(CancellationToken::new(), in_rx, out_tx),
                );
                for page in pages {
                    in_tx.send(page).await.unwrap();
                }
                drop(in_tx);
                let out = collect(out_rx).await;
                stage.await.unwrap();
                out
            });

            let flattened: Vec<u16> = batches.iter().flatten().copied().collect();
            prop_assert_eq!(flattened, expected);
            for batch in &batches {
                prop_assert!(!batch.is_empty());
                prop_assert!(batch.len() <= capacity);
            }
        }
    }
}
