//! # Reconciliation Scheduler (ps-05)
//!
//! Drives any periodic operation (a feed poll, a bulk test cycle) in a retry
//! loop paced by two independent backoff policies.
//!
//! ```text
//!            ┌──────── Ok ────────→ wait-backoff.next ─→ sleep ─┐
//! reconcile ─┤                      (fail-backoff reset)        ├─→ reconcile
//!            └──────── Err ───────→ fail-backoff.next ─→ sleep ─┘
//! ```
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Fail reset | Fail-backoff returns to its initial state after a success |
//! | 2 | Wait reset | Wait-backoff is reset after every use |
//! | 3 | Interruptible | Every sleep races the cancellation token |
//! | 4 | Never escalates | A failing cycle is retried indefinitely |
//!
//! ## Crate Structure
//!
//! - `domain/` - Backoff policies, cycle state, errors
//! - `ports.rs` - The [`Reconcile`] trait implemented by periodic work
//! - `service.rs` - The [`Reconciler`] loop

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::backoff::{
    Backoff, ConstantBackoff, ExponentialBackoff, ExponentialBackoffConfig, LimitedBackoff,
};
pub use domain::errors::ReconcileError;
pub use domain::state::ReconcileCycleState;
pub use ports::{reconcile_fn, Reconcile, ReconcileFn};
pub use service::{sleep_or_cancel, Reconciler};
