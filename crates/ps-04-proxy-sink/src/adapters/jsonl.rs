//! # JSON-Lines Result Store
//!
//! Appends one serialized [`TestRecord`] per line. The file is an upsert log:
//! when a key repeats, the last line wins. [`read_records`] applies that rule.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use shared_types::{RecordKey, TestRecord};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use crate::domain::errors::StoreError;
use crate::ports::outbound::ResultStore;

/// Append-only result file shared by every worker.
#[derive(Debug)]
pub struct JsonLinesResultStore {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesResultStore {
    /// Open `path` for appending, creating it and its parent directory.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        info!(path = %path.display(), "result file opened");
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ResultStore for JsonLinesResultStore {
    async fn upsert(&self, record: &TestRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Load a result file, keeping the last record written for each key.
pub async fn read_records(path: impl AsRef<Path>) -> Result<Vec<TestRecord>, StoreError> {
    let content = tokio::fs::read_to_string(path).await?;
    let mut latest: BTreeMap<RecordKey, TestRecord> = BTreeMap::new();
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        let record: TestRecord = serde_json::from_str(line)?;
        latest.insert(record.record_key(), record);
    }
    Ok(latest.into_values().collect())
}
