//! Flat on-disk blob cache with a freshness window.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::cache::key::{CacheKey, CacheKeyError, MAX_KEY_LEN};
use crate::cache::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::observability::metrics;

/// Failure to persist a cache entry.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Key(#[from] CacheKeyError),
    #[error("cache I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Raw source bytes cached by URL.
///
/// Entries are never deleted; a stale entry is simply overwritten by the next
/// successful fetch.
#[derive(Clone)]
pub struct DiskCache {
    dir: PathBuf,
    ttl: Duration,
    max_key_len: usize,
    clock: Arc<dyn Clock>,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
            max_key_len: MAX_KEY_LEN,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.directory.clone(), config.ttl()).with_max_key_len(config.max_key_len)
    }

    pub fn with_max_key_len(mut self, max_key_len: usize) -> Self {
        self.max_key_len = max_key_len;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read a fresh entry. Every failure is a miss.
    pub async fn try_read(&self, key: &CacheKey) -> Option<Vec<u8>> {
        let path = match key.resolve(&self.dir, self.max_key_len) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Refusing unsafe cache key");
                metrics::record_cache_lookup("rejected");
                return None;
            }
        };

        let modified = match tokio::fs::metadata(&path).await.and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                metrics::record_cache_lookup("miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to stat cache entry");
                metrics::record_cache_lookup("error");
                return None;
            }
        };

        // An mtime in the future counts as fresh.
        let age = self.clock.now().duration_since(modified).unwrap_or_default();
        if age > self.ttl {
            tracing::debug!(path = %path.display(), age_secs = age.as_secs(), "Cache entry is stale");
            metrics::record_cache_lookup("stale");
            return None;
        }

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                tracing::info!(path = %path.display(), "Hit image cache");
                metrics::record_cache_lookup("hit");
                Some(bytes)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read cache entry");
                metrics::record_cache_lookup("error");
                None
            }
        }
    }

    /// Store `bytes` under `key`, replacing any previous entry atomically.
    pub async fn write(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError> {
        let path = key.resolve(&self.dir, self.max_key_len)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| CacheError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let tmp = self.dir.join(format!(".{}.part", uuid::Uuid::new_v4().simple()));
        if let Err(source) = tokio::fs::write(&tmp, bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CacheError::Io { path: tmp, source });
        }
        if let Err(source) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CacheError::Io { path, source });
        }

        tracing::info!(path = %path.display(), bytes = bytes.len(), "Saved image cache");
        Ok(())
    }
}
