//! Token Cache
//!
//! Key/value persistence contract for token records, with in-memory, file and
//! mock implementations. Implementations serialize their own operations.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime};
use tracing::debug;

use crate::error::{RestResult, StorageError};

/// Token cache interface.
#[async_trait]
pub trait TokenCache: Send + Sync {
    /// Value stored under `key`.
    async fn get(&self, key: &str) -> RestResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: &str) -> RestResult<()>;

    /// Remove `key`. Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> RestResult<()>;

    /// Remove entries of `category` older than `max_age`. Returns the count.
    async fn garbage_collect(&self, category: &str, max_age: Duration) -> RestResult<usize>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn in_category(key: &str, category: &str) -> bool {
    key.strip_prefix(category)
        .map(|rest| rest.starts_with('_'))
        .unwrap_or(false)
}

/// In-memory token cache.
#[derive(Default)]
pub struct InMemoryTokenCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl InMemoryTokenCache {
    /// Create new in-memory token cache.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

#[async_trait]
impl TokenCache for InMemoryTokenCache {
    async fn get(&self, key: &str) -> RestResult<Option<String>> {
        Ok(lock(&self.entries).get(key).map(|(v, _)| v.clone()))
    }

    async fn put(&self, key: &str, value: &str) -> RestResult<()> {
        lock(&self.entries).insert(key.to_string(), (value.to_string(), Instant::now()));
        Ok(())
    }

    async fn delete(&self, key: &str) -> RestResult<()> {
        lock(&self.entries).remove(key);
        Ok(())
    }

    async fn garbage_collect(&self, category: &str, max_age: Duration) -> RestResult<usize> {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|key, (_, stored)| {
            !(in_category(key, category) && stored.elapsed() > max_age)
        });
        Ok(before - entries.len())
    }
}

/// File-per-key token cache.
///
/// Each value lives in `<dir>/<key>.json`; entry age is the file modification
/// time. Writes go through a temporary file renamed into place.
pub struct FileTokenCache {
    dir: PathBuf,
    guard: tokio::sync::Mutex<()>,
}

impl FileTokenCache {
    /// Create a cache rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            guard: tokio::sync::Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

#[async_trait]
impl TokenCache for FileTokenCache {
    async fn get(&self, key: &str) -> RestResult<Option<String>> {
        let _guard = self.guard.lock().await;
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed {
                message: e.to_string(),
            }
            .into()),
        }
    }

    async fn put(&self, key: &str, value: &str) -> RestResult<()> {
        let _guard = self.guard.lock().await;
        let write_failed = |e: std::io::Error| StorageError::WriteFailed {
            message: e.to_string(),
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(write_failed)?;
        let path = self.path_for(key);
        let temp = path.with_extension("json.tmp");
        tokio::fs::write(&temp, value).await.map_err(write_failed)?;
        tokio::fs::rename(&temp, &path).await.map_err(write_failed)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> RestResult<()> {
        let _guard = self.guard.lock().await;
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed {
                message: e.to_string(),
            }
            .into()),
        }
    }

    async fn garbage_collect(&self, category: &str, max_age: Duration) -> RestResult<usize> {
        let _guard = self.guard.lock().await;
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(StorageError::ReadFailed {
                    message: e.to_string(),
                }
                .into())
            }
        };

        let mut removed = 0;
        while let Some(entry) = dir.next_entry().await.map_err(|e| StorageError::ReadFailed {
            message: e.to_string(),
        })? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(key) = name.strip_suffix(".json") else {
                continue;
            };
            if !in_category(key, category) {
                continue;
            }
            let age = entry
                .metadata()
                .await
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| SystemTime::now().duration_since(modified).ok());
            if age.map(|age| age > max_age).unwrap_or(false) {
                tokio::fs::remove_file(entry.path())
                    .await
                    .map_err(|e| StorageError::DeleteFailed {
                        message: e.to_string(),
                    })?;
                removed += 1;
            }
        }

        if removed > 0 {
            debug!(dir = %self.dir.display(), removed, "Purged stale token cache files");
        }
        Ok(removed)
    }
}

/// Mock token cache for testing.
#[derive(Default)]
pub struct MockTokenCache {
    inner: InMemoryTokenCache,
    history: Mutex<Vec<String>>,
    next_error: Mutex<Option<StorageError>>,
}

impl MockTokenCache {
    /// Create new mock token cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next operation.
    pub fn set_next_error(&self, error: StorageError) -> &Self {
        *lock(&self.next_error) = Some(error);
        self
    }

    /// Operations performed, e.g. `"put token_ab12"`.
    pub fn get_history(&self) -> Vec<String> {
        lock(&self.history).clone()
    }

    fn record(&self, operation: &str, key: &str) -> RestResult<()> {
        lock(&self.history).push(format!("{} {}", operation, key));
        match lock(&self.next_error).take() {
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TokenCache for MockTokenCache {
    async fn get(&self, key: &str) -> RestResult<Option<String>> {
        self.record("get", key)?;
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &str) -> RestResult<()> {
        self.record("put", key)?;
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> RestResult<()> {
        self.record("delete", key)?;
        self.inner.delete(key).await
    }

    async fn garbage_collect(&self, category: &str, max_age: Duration) -> RestResult<usize> {
        self.record("gc", category)?;
        self.inner.garbage_collect(category, max_age).await
    }
}
