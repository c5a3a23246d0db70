//! Pure prober domain: results, selection, anonymity rules, configuration.

pub mod anonymity;
pub mod config;
pub mod errors;
pub mod result;
pub mod selection;
