//! Storage handoff for completed sessions.
//!
//! The service only needs to hand a finished session's tally somewhere
//! durable; [`SummaryStore`] is that seam. [`FileStore`] is the default
//! backend: an append-only file with one JSON object per line.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::{Result, TelemetryError};

/// What gets persisted for a closed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Remote address of the casting client, when the transport knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer: Option<String>,
    pub num_states: u64,
    /// Milliseconds since the Unix epoch at which the session closed.
    pub completed_at_ms: u64,
}

impl SessionRecord {
    /// Stamp a record with the current time.
    pub fn now(peer: Option<SocketAddr>, num_states: u64) -> Self {
        let completed_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self {
            peer: peer.map(|addr| addr.to_string()),
            num_states,
            completed_at_ms,
        }
    }
}

/// Destination for completed session summaries.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    async fn record(&self, entry: &SessionRecord) -> Result<()>;
}

/// Append-only JSON-lines store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileStore {
    /// Open `path` for appending, creating it if needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| TelemetryError::Storage(format!("failed to open {path:?}: {e}")))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record from a store file, oldest first.
    pub async fn read_all(path: impl AsRef<Path>) -> Result<Vec<SessionRecord>> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(TelemetryError::from))
            .collect()
    }
}

#[async_trait]
impl SummaryStore for FileStore {
    async fn record(&self, entry: &SessionRecord) -> Result<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        // Whole lines only: concurrent sessions must not interleave bytes.
        let mut file = self.file.lock().await;
        file.write_all(&line)
            .await
            .map_err(|e| TelemetryError::Storage(format!("write to {:?}: {e}", self.path)))?;
        file.flush()
            .await
            .map_err(|e| TelemetryError::Storage(format!("flush {:?}: {e}", self.path)))?;
        Ok(())
    }
}
