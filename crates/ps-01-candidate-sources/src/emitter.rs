use shared_types::Candidate;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use ps_06_stream_utils::send_or_cancel;

use crate::domain::errors::SourceError;

/// Default number of candidates per emitted page.
pub const DEFAULT_PAGE_SIZE: usize = 256;

/// Groups candidates into fixed-size pages and sends them downstream.
///
/// A partial page stays buffered until [`PageEmitter::flush`].
pub struct PageEmitter<'a> {
    to: &'a mpsc::Sender<Vec<Candidate>>,
    cancel: &'a CancellationToken,
    page: Vec<Candidate>,
    page_size: usize,
    emitted: usize,
}

impl<'a> PageEmitter<'a> {
    pub fn new(
        to: &'a mpsc::Sender<Vec<Candidate>>,
        cancel: &'a CancellationToken,
        page_size: usize,
    ) -> Self {
        let page_size = page_size.max(1);
        Self {
            to,
            cancel,
            page: Vec::with_capacity(page_size),
            page_size,
            emitted: 0,
        }
    }

    pub async fn push(&mut self, candidate: Candidate) -> Result<(), SourceError> {
        self.page.push(candidate);
        if self.page.len() >= self.page_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Send the buffered partial page, if any.
    pub async fn flush(&mut self) -> Result<(), SourceError> {
        if self.page.is_empty() {
            return Ok(());
        }
        let page = std::mem::replace(&mut self.page, Vec::with_capacity(self.page_size));
        let len = page.len();
        if send_or_cancel(self.to, page, self.cancel).await {
            self.emitted += len;
            Ok(())
        } else if self.cancel.is_cancelled() {
            Err(SourceError::Cancelled)
        } else {
            Err(SourceError::SinkClosed)
        }
    }

    /// Candidates sent downstream so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn buffered(&self) -> usize {
        self.page.len()
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    fn candidate(n: u8) -> Candidate {
        Candidate::new(Ipv4Addr::new(192, 0, 2, n), 8080, "test")
    }

    #[tokio::test]
    async fn test_pages_are_chunked() {
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let mut emitter = PageEmitter::new(&tx, &cancel, 2);

        for n in 1..=5 {
            emitter.push(candidate(n)).await.unwrap();
        }
        assert_eq!(emitter.emitted(), 4);
        assert_eq!(emitter.buffered(), 1);
        emitter.flush().await.unwrap();
        assert_eq!(emitter.emitted(), 5);

        let sizes: Vec<usize> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|page| page.len())
            .collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_flush_empty_sends_nothing() {
        let (tx, mut rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let mut emitter = PageEmitter::new(&tx, &cancel, 4);
        emitter.flush().await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_sink_vs_cancel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let cancel = CancellationToken::new();
        let mut emitter = PageEmitter::new(&tx, &cancel, 1);
        assert_eq!(emitter.push(candidate(1)).await, Err(SourceError::SinkClosed));

        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut emitter = PageEmitter::new(&tx, &cancel, 1);
        assert_eq!(emitter.push(candidate(2)).await, Err(SourceError::Cancelled));
    }
}
