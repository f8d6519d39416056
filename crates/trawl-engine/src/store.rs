//! Durable batch log.
//!
//! The log is an ordered list of batches. While a page is still being scraped its
//! in-progress batch is kept as a provisional tail entry ([`BatchStore::checkpoint`]);
//! flushing the batch ([`BatchStore::append_batch`]) replaces that tail with the
//! committed copy, so once a session ends the log holds exactly the flushed history.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use trawl_common::model::Batch;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access batch log: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode batch log: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait BatchStore: Send + Sync {
    /// Commit a finished batch, replacing any provisional tail.
    async fn append_batch(&self, batch: &Batch) -> Result<(), StoreError>;

    /// Persist the in-progress batch as a provisional tail entry.
    async fn checkpoint(&self, batch: &Batch) -> Result<(), StoreError>;

    /// Remove any prior log.
    async fn clear(&self) -> Result<(), StoreError>;

    async fn read_all(&self) -> Result<Vec<Batch>, StoreError>;
}

#[derive(Default)]
struct LogState {
    batches: Vec<Batch>,
    provisional: bool,
}

impl LogState {
    fn write_tail(&mut self, batch: &Batch, provisional: bool) {
        if self.provisional {
            self.batches.pop();
        }
        self.batches.push(batch.clone());
        self.provisional = provisional;
    }
}

/// In-memory log, handy for embedding and tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<LogState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut LogState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }
}

#[async_trait]
impl BatchStore for MemoryStore {
    async fn append_batch(&self, batch: &Batch) -> Result<(), StoreError> {
        self.with_state(|s| s.write_tail(batch, false));
        Ok(())
    }

    async fn checkpoint(&self, batch: &Batch) -> Result<(), StoreError> {
        self.with_state(|s| s.write_tail(batch, true));
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.with_state(|s| *s = LogState::default());
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<Batch>, StoreError> {
        Ok(self.with_state(|s| s.batches.clone()))
    }
}

/// Pretty-printed JSON array on disk, rewritten atomically on every change.
pub struct JsonFileStore {
    path: PathBuf,
    provisional: tokio::sync::Mutex<bool>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            provisional: tokio::sync::Mutex::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<Batch>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, batches: &[Batch]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(batches)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn write_tail(&self, batch: &Batch, provisional: bool) -> Result<(), StoreError> {
        let mut pending = self.provisional.lock().await;
        let result = self.replace_tail(batch, *pending).await;
        match &result {
            Ok(()) => *pending = provisional,
            // A failed commit leaves the last checkpoint as the page's entry.
            Err(_) if !provisional => *pending = false,
            Err(_) => {}
        }
        result
    }

    async fn replace_tail(&self, batch: &Batch, drop_tail: bool) -> Result<(), StoreError> {
        let mut batches = self.load().await?;
        if drop_tail {
            batches.pop();
        }
        batches.push(batch.clone());
        self.save(&batches).await
    }
}

#[async_trait]
impl BatchStore for JsonFileStore {
    async fn append_batch(&self, batch: &Batch) -> Result<(), StoreError> {
        self.write_tail(batch, false).await
    }

    async fn checkpoint(&self, batch: &Batch) -> Result<(), StoreError> {
        self.write_tail(batch, true).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut pending = self.provisional.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        *pending = false;
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<Batch>, StoreError> {
        let _guard = self.provisional.lock().await;
        self.load().await
    }
}
