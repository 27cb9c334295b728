//! Session cache for fetched account records
//!
//! `BlobCache` is a durable key/value store of raw bytes shared by every
//! host session. `HostCache` scopes keys by host and layers typed JSON
//! objects (with a `stored_at` timestamp) on top.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.cache/hubauth/            # Linux
//! ~/Library/Caches/...hubauth/ # macOS
//! └── session/
//!     └── {host}_{key}.json
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::host_address::HostAddress;
use crate::error::{HubAuthError, Result};

/// Raw key/value cache
#[async_trait]
pub trait BlobCache: Send + Sync {
    /// Bytes stored under `key`; `HubAuthError::CacheMiss` when absent
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Store bytes under `key`, replacing any previous value
    async fn insert(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Remove `key`; removing a missing key is not an error
    async fn invalidate(&self, key: &str) -> Result<()>;
}

/// In-memory cache
#[derive(Default)]
pub struct MemoryBlobCache {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobCache for MemoryBlobCache {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| HubAuthError::Config(format!("Cache lock poisoned: {}", e)))?;
        entries
            .get(key)
            .cloned()
            .ok_or_else(|| HubAuthError::CacheMiss(key.to_string()))
    }

    async fn insert(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| HubAuthError::Config(format!("Cache lock poisoned: {}", e)))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| HubAuthError::Config(format!("Cache lock poisoned: {}", e)))?;
        entries.remove(key);
        Ok(())
    }
}

/// File-backed cache, one file per key
pub struct FileBlobCache {
    dir: PathBuf,
}

impl FileBlobCache {
    /// Create a cache rooted at `dir` (created on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the cache files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }
}

#[async_trait]
impl BlobCache for FileBlobCache {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(HubAuthError::CacheMiss(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn insert(&self, key: &str, value: Vec<u8>) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        // Write to a temp file then rename so readers never see a partial entry
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &value).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(path = %path.display(), "Wrote cache entry");
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Cached object with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedObject<T> {
    pub value: T,
    /// When the object was cached
    pub stored_at: DateTime<Utc>,
}

/// Typed view of a shared `BlobCache`, scoped to one host
#[derive(Clone)]
pub struct HostCache {
    inner: Arc<dyn BlobCache>,
    scope: String,
}

impl HostCache {
    pub fn new(inner: Arc<dyn BlobCache>, host: &HostAddress) -> Self {
        Self {
            inner,
            scope: host.credential_key(),
        }
    }

    /// Prefix shared by every key of this host
    pub fn scope(&self) -> &str {
        &self.scope
    }

    fn scoped_key(&self, key: &str) -> String {
        format!("{}/{}", self.scope, key)
    }

    /// Fetch and decode an object; `CacheMiss` when absent
    ///
    /// An entry that no longer decodes is dropped and reported as a miss.
    pub async fn get_object<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        Ok(self.get_entry(key).await?.value)
    }

    /// Fetch an object together with its `stored_at` timestamp
    pub async fn get_entry<T: DeserializeOwned>(&self, key: &str) -> Result<CachedObject<T>> {
        let scoped = self.scoped_key(key);
        let bytes = match self.inner.get(&scoped).await {
            Ok(bytes) => bytes,
            Err(HubAuthError::CacheMiss(_)) => return Err(HubAuthError::CacheMiss(key.to_string())),
            Err(e) => return Err(e),
        };

        match serde_json::from_slice::<CachedObject<T>>(&bytes) {
            Ok(entry) => Ok(entry),
            Err(e) => {
                warn!(key = %scoped, error = %e, "Dropping undecodable cache entry");
                self.inner.invalidate(&scoped).await?;
                Err(HubAuthError::CacheMiss(key.to_string()))
            }
        }
    }

    /// Encode and store an object under `key`
    pub async fn insert_object<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let entry = CachedObject {
            value,
            stored_at: Utc::now(),
        };
        let bytes = serde_json::to_vec(&entry)?;
        self.inner.insert(&self.scoped_key(key), bytes).await
    }

    /// Remove `key` for this host
    pub async fn invalidate_object(&self, key: &str) -> Result<()> {
        self.inner.invalidate(&self.scoped_key(key)).await
    }
}
