use std::io;

use thiserror::Error;

/// Failure of a result or candidate store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A bulk cycle could not read its candidate set.
///
/// Probe failures never surface here; they are recorded per candidate.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("count pending candidates: {0}")]
    Count(#[source] StoreError),

    #[error(
        "list pending candidates after {}: {source}",
        .after.as_deref().unwrap_or("start")
    )]
    List {
        /// Key of the last candidate already listed.
        after: Option<String>,
        #[source]
        source: StoreError,
    },
}
