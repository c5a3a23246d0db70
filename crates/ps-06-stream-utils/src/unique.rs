//! # Uniqueness Filter
//!
//! Drops items whose key was already seen within a sliding window.
//!
//! The key → expiry map is owned by the single task running [`UniqueFilter::run`];
//! it is never shared, so no locking is involved. A cleanup tick every `window`
//! sweeps expired keys to bound memory.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::send_or_cancel;

/// Default time a key is remembered.
pub const DEFAULT_UNIQUE_WINDOW: Duration = Duration::from_secs(600);

/// Time-bounded set of recently seen keys.
#[derive(Debug)]
pub struct UniqueFilter<K> {
    window: Duration,
    expiries: HashMap<K, Instant>,
}

impl<K: Eq + Hash> UniqueFilter<K> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            expiries: HashMap::new(),
        }
    }

    /// Keep only items whose key is unseen or expired at `now`, and arm
    /// `now + window` for every retained key.
    ///
    /// A key that occurs several times in one batch is retained once.
    pub fn retain_fresh<T, F>(&mut self, batch: Vec<T>, now: Instant, key_of: F) -> Vec<T>
    where
        F: Fn(&T) -> K,
    {
        let expiry = now + self.window;
        let mut fresh = Vec::with_capacity(batch.len());
        for item in batch {
            let key = key_of(&item);
            let accept = match self.expiries.get(&key) {
                Some(&expires_at) => now > expires_at,
                None => true,
            };
            if accept {
                self.expiries.insert(key, expiry);
                fresh.push(item);
            }
        }
        fresh
    }

    /// Remove keys that expired before `now`. Returns how many were removed.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let before = self.expiries.len();
        self.expiries.retain(|_, expires_at| *expires_at >= now);
        before - self.expiries.len()
    }

    /// Number of keys currently remembered.
    pub fn len(&self) -> usize {
        self.expiries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expiries.is_empty()
    }

    /// Run the stage until upstream closes, downstream is dropped or `cancel`
    /// fires. Empty batches are never forwarded.
    pub async fn run<T, F>(
        mut self,
        cancel: CancellationToken,
        mut from: mpsc::Receiver<Vec<T>>,
        to: mpsc::Sender<Vec<T>>,
        key_of: F,
    ) where
        K: Send,
        T: Send,
        F: Fn(&T) -> K + Send,
    {
        let period = self.window.max(Duration::from_millis(1));
        let mut cleanup = time::interval_at(Instant::now() + period, period);
        cleanup.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(remembered = self.len(), "unique filter cancelled");
                    return;
                }
                batch = from.recv() => {
                    let Some(batch) = batch else {
                        return;
                    };
                    let received = batch.len();
                    let fresh = self.retain_fresh(batch, Instant::now(), &key_of);
                    trace!(received, forwarded = fresh.len(), "filtered batch");
                    if !fresh.is_empty() && !send_or_cancel(&to, fresh, &cancel).await {
                        return;
                    }
                }
                _ = cleanup.tick() => {
                    let removed = self.sweep(Instant::now());
                    if removed > 0 {
                        debug!(removed, remembered = self.len(), "swept expired keys");
                    }
                }
            }
        }
    }
}
