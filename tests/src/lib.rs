//! # Proxy-Scout Test Suite
//!
//! Cross-crate flows that no single subsystem crate can test on its own.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── mod.rs        # Shared fixtures (static feeds, one-shot feed server)
//!     ├── flows.rs      # Stream mode: feed -> stages -> sink -> result file
//!     └── bulk.rs       # Bulk mode: candidate store -> bulk cycle -> results
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p scout-tests
//! cargo test -p scout-tests integration::bulk::
//! ```

pub mod integration;
