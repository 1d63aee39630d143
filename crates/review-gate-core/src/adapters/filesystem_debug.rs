//! # Filesystem Debug Sink
//!
//! Writes debug snapshots and error records as JSON files partitioned by the
//! hour they were recorded:
//!
//! ```text
//! {base}/snapshots/year=2024/month=01/day=15/hour=10/{record_id}.json
//! {base}/errors/year=2024/month=01/day=15/hour=10/{record_id}.json
//! ```

use crate::debug_sink::{DebugErrorRecord, DebugSink, DebugSinkError, DebugSnapshot};
use crate::Timestamp;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use ulid::Ulid;

/// Debug sink storing one JSON file per record.
///
/// # Examples
///
/// ```no_run
/// use review_gate_core::adapters::FilesystemDebugSink;
/// use std::path::PathBuf;
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let sink = FilesystemDebugSink::new(PathBuf::from("./data/debug")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FilesystemDebugSink {
    base_path: PathBuf,
}

impl FilesystemDebugSink {
    /// # Errors
    ///
    /// Returns [`DebugSinkError::Io`] if the base directory cannot be created.
    pub async fn new(base_path: PathBuf) -> Result<Self, DebugSinkError> {
        fs::create_dir_all(&base_path)
            .await
            .map_err(|e| DebugSinkError::Io {
                message: format!("Failed to create base directory: {}", e),
            })?;

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn record_path(&self, kind: &str, recorded_at: &Timestamp, record_id: &Ulid) -> PathBuf {
        self.base_path
            .join(kind)
            .join(format!("year={:04}", recorded_at.year()))
            .join(format!("month={:02}", recorded_at.month()))
            .join(format!("day={:02}", recorded_at.day()))
            .join(format!("hour={:02}", recorded_at.hour()))
            .join(format!("{}.json", record_id))
    }

    async fn write_json<T: Serialize + Sync>(
        &self,
        path: &Path,
        record: &T,
    ) -> Result<(), DebugSinkError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DebugSinkError::Io {
                    message: format!("Failed to create directory structure: {}", e),
                })?;
        }

        let json =
            serde_json::to_vec_pretty(record).map_err(|e| DebugSinkError::Serialization {
                message: e.to_string(),
            })?;

        // Write to a temporary file and rename so readers never see partial records
        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| DebugSinkError::Io {
                message: format!("Failed to create temp file: {}", e),
            })?;
        file.write_all(&json).await.map_err(|e| DebugSinkError::Io {
            message: format!("Failed to write record: {}", e),
        })?;
        file.flush().await.map_err(|e| DebugSinkError::Io {
            message: format!("Failed to flush file: {}", e),
        })?;

        fs::rename(&temp_path, path)
            .await
            .map_err(|e| DebugSinkError::Io {
                message: format!("Failed to rename temp file: {}", e),
            })?;

        debug!(path = %path.display(), "Debug record written");
        Ok(())
    }
}

#[async_trait]
impl DebugSink for FilesystemDebugSink {
    async fn persist_snapshot(&self, snapshot: &DebugSnapshot) -> Result<(), DebugSinkError> {
        let path = self.record_path("snapshots", &snapshot.recorded_at, &snapshot.record_id);
        self.write_json(&path, snapshot).await
    }

    async fn persist_error(&self, record: &DebugErrorRecord) -> Result<(), DebugSinkError> {
        let path = self.record_path("errors", &record.recorded_at, &record.record_id);
        self.write_json(&path, record).await
    }
}

#[cfg(test)]
#[path = "filesystem_debug_tests.rs"]
mod tests;
