//! # Backoff Policies
//!
//! A policy is a small stateful strategy: [`Backoff::next_delay`] yields the
//! delay before the next attempt and advances the sequence, [`Backoff::reset`]
//! rewinds it. `None` means the policy gives up.
//!
//! ## Built-in policies
//!
//! | Policy | Sequence |
//! |--------|----------|
//! | [`ConstantBackoff`] | `d, d, d, ...` |
//! | [`ExponentialBackoff`] | `initial * multiplier^n`, capped, with random jitter |
//! | [`LimitedBackoff`] | any policy, `None` after `max_retries` delays |

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Delay strategy consulted by the scheduler and the retrying fetcher.
pub trait Backoff: Send {
    /// Delay before the next attempt, advancing the sequence.
    fn next_delay(&mut self) -> Option<Duration>;

    /// Rewind to the initial state.
    fn reset(&mut self);
}

impl<B: Backoff + ?Sized> Backoff for Box<B> {
    fn next_delay(&mut self) -> Option<Duration> {
        (**self).next_delay()
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

// =============================================================================
// CONSTANT
// =============================================================================

/// Same delay every time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantBackoff {
    interval: Duration,
}

impl ConstantBackoff {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Backoff for ConstantBackoff {
    fn next_delay(&mut self) -> Option<Duration> {
        Some(self.interval)
    }

    fn reset(&mut self) {}
}

// =============================================================================
// EXPONENTIAL WITH JITTER
// =============================================================================

/// Parameters of an [`ExponentialBackoff`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoffConfig {
    pub initial_interval: Duration,
    /// Jitter spread as a fraction of the current interval, in `[0, 1]`.
    pub randomization_factor: f64,
    pub multiplier: f64,
    pub max_interval: Duration,
}

impl Default for ExponentialBackoffConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            randomization_factor: 0.5,
            multiplier: 1.5,
            max_interval: Duration::from_secs(60),
        }
    }
}

/// Exponentially growing delay with multiplicative jitter.
///
/// Each call returns a value drawn uniformly from
/// `[current * (1 - factor), current * (1 + factor)]`, then grows `current`
/// by `multiplier` up to `max_interval`. Never gives up.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    config: ExponentialBackoffConfig,
    current: Duration,
    rng: StdRng,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(ExponentialBackoffConfig::default())
    }
}

impl ExponentialBackoff {
    pub fn new(config: ExponentialBackoffConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Reproducible jitter for tests.
    pub fn with_seed(config: ExponentialBackoffConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: ExponentialBackoffConfig, rng: StdRng) -> Self {
        let config = ExponentialBackoffConfig {
            randomization_factor: config.randomization_factor.clamp(0.0, 1.0),
            multiplier: config.multiplier.max(1.0),
            ..config
        };
        Self {
            current: config.initial_interval,
            config,
            rng,
        }
    }

    /// Un-jittered interval the next call is centred on.
    pub fn current_interval(&self) -> Duration {
        self.current
    }

    fn advance(&mut self) {
        let max = self.config.max_interval;
        let grown = (self.current.as_nanos() as f64 * self.config.multiplier).round();
        self.current = if grown >= max.as_nanos() as f64 {
            max
        } else {
            Duration::from_nanos(grown as u64)
        };
    }
}

impl Backoff for ExponentialBackoff {
    fn next_delay(&mut self) -> Option<Duration> {
        let current = self.current;
        let centre = current.as_secs_f64();
        let delta = centre * self.config.randomization_factor;
        self.advance();
        if delta <= 0.0 {
            return Some(current);
        }
        let jittered = self.rng.gen_range((centre - delta)..=(centre + delta));
        Some(Duration::from_secs_f64(jittered.max(0.0)))
    }

    fn reset(&mut self) {
        self.current = self.config.initial_interval;
    }
}

// =============================================================================
// LIMITED
// =============================================================================

/// Wraps a policy and gives up after `max_retries` delays.
#[derive(Debug, Clone)]
pub struct LimitedBackoff<B> {
    inner: B,
    max_retries: u32,
    used: u32,
}

impl<B: Backoff> LimitedBackoff<B> {
    pub fn new(inner: B, max_retries: u32) -> Self {
        Self {
            inner,
            max_retries,
            used: 0,
        }
    }
}

impl<B: Backoff> Backoff for LimitedBackoff<B> {
    fn next_delay(&mut self) -> Option<Duration> {
        if self.used >= self.max_retries {
            return None;
        }
        self.used += 1;
        self.inner.next_delay()
    }

    fn reset(&mut self) {
        self.used = 0;
        self.inner.reset();
    }
}
