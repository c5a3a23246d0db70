//! Pure scheduler domain: backoff policies and loop bookkeeping.

pub mod backoff;
pub mod errors;
pub mod state;
