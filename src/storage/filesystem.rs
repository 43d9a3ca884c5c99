//! File System Conversation Storage
//!
//! Information Hiding:
//! - Index artifact and per-conversation JSON files hidden from users
//! - Path derivation and escaping hidden behind ConversationKey
//! - Locking discipline (per-key writer lock, index RwLock) internal
//!
//! Layout under the root:
//! - `index.json`: `{ user_id: { thread_name: relative_path } }`
//! - `<escaped user>/<escaped thread>.json`: array of messages

use super::atomic::write_atomic;
use super::index::ConversationIndex;
use super::locks::KeyLocks;
use super::ConversationStorage;
use crate::core::{ConversationKey, Message};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;

/// Why a conversation could not be read. Never leaves this module: the
/// public read path reports all of these as an empty conversation.
#[derive(Error, Debug)]
enum ReadError {
    #[error("not indexed")]
    NotIndexed,

    #[error("content file {0:?} is missing")]
    Missing(PathBuf),

    #[error("content file {path:?} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("indexed path '{0}' escapes the storage root")]
    UnsafePath(String),
}

/// Indexed file system storage
///
/// Files are stored as `{root}/{user}/{thread}.json` with both components
/// escaped, and located through the index at `{root}/{index_file}`.
pub struct FileSystemStorage {
    root: PathBuf,
    index: RwLock<ConversationIndex>,
    locks: KeyLocks,
}

impl FileSystemStorage {
    pub const DEFAULT_INDEX_FILE: &'static str = "index.json";

    pub async fn new(root: PathBuf) -> StoreResult<Self> {
        Self::with_index_file(root, Self::DEFAULT_INDEX_FILE).await
    }

    /// Open (or initialize) a store rooted at `root`.
    ///
    /// Idempotent: reopening an existing root never touches content files.
    pub async fn with_index_file(root: PathBuf, index_file: &str) -> StoreResult<Self> {
        if !is_plain_file_name(index_file) {
            return Err(StoreError::io(
                root.join(index_file),
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "index file must be a plain file name containing a '.'",
                ),
            ));
        }

        fs::create_dir_all(&root)
            .await
            .map_err(|e| StoreError::io(&root, e))?;

        let index = ConversationIndex::load(root.join(index_file)).await?;
        tracing::info!(
            "[FileSystemStorage] Opened store at {:?} with {} conversations",
            root,
            index.len()
        );

        Ok(Self {
            root,
            index: RwLock::new(index),
            locks: KeyLocks::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an indexed relative path onto the root, refusing anything that
    /// could leave it (absolute paths, `..`, prefixes).
    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let relative = Path::new(relative);
        let mut saw_normal = false;
        for component in relative.components() {
            match component {
                Component::Normal(_) => saw_normal = true,
                Component::CurDir => {}
                _ => return None,
            }
        }
        saw_normal.then(|| self.root.join(relative))
    }

    async fn lookup(&self, key: &ConversationKey) -> Option<String> {
        let index = self.index.read().await;
        index.lookup(key).map(str::to_owned)
    }

    async fn read_messages(&self, key: &ConversationKey) -> Result<Vec<Message>, ReadError> {
        let relative = self.lookup(key).await.ok_or(ReadError::NotIndexed)?;
        let path = self
            .resolve(&relative)
            .ok_or_else(|| ReadError::UnsafePath(relative.clone()))?;

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ReadError::Missing(path))
            }
            Err(source) => return Err(ReadError::Io { path, source }),
        };

        serde_json::from_slice(&bytes).map_err(|source| ReadError::Corrupt { path, source })
    }

    /// Content path for `key`, indexing the key first when it is new.
    /// Caller must hold the key lock.
    async fn ensure_indexed(&self, key: &ConversationKey) -> StoreResult<PathBuf> {
        if let Some(relative) = self.lookup(key).await {
            match self.resolve(&relative) {
                Some(path) => return Ok(path),
                None => tracing::warn!(
                    "[FileSystemStorage] Re-indexing '{}', stored path '{}' escapes the root",
                    key,
                    relative
                ),
            }
        }

        let relative = key.relative_path();
        let mut index = self.index.write().await;
        index.put(key, relative.clone()).await?;

        Ok(self.root.join(relative))
    }

    /// Index (if new) then replace the content file. Caller must hold the key lock.
    async fn write_locked(&self, key: &ConversationKey, messages: &[Message]) -> StoreResult<()> {
        let path = self.ensure_indexed(key).await?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }

        let json = serde_json::to_vec_pretty(messages)?;
        write_atomic(&path, &json).await?;

        tracing::debug!(
            "[FileSystemStorage] Saved {} messages for '{}' to {:?}",
            messages.len(),
            key,
            path
        );
        Ok(())
    }
}

#[async_trait]
impl ConversationStorage for FileSystemStorage {
    async fn get(&self, key: &ConversationKey) -> Vec<Message> {
        match self.read_messages(key).await {
            Ok(messages) => {
                tracing::debug!(
                    "[FileSystemStorage] Loaded {} messages for '{}'",
                    messages.len(),
                    key
                );
                messages
            }
            Err(e @ (ReadError::NotIndexed | ReadError::Missing(_))) => {
                tracing::debug!("[FileSystemStorage] Conversation '{}' {}", key, e);
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("[FileSystemStorage] Treating '{}' as empty: {}", key, e);
                Vec::new()
            }
        }
    }

    async fn save(&self, key: &ConversationKey, messages: &[Message]) -> StoreResult<()> {
        let _guard = self.locks.acquire(key).await;
        self.write_locked(key, messages).await
    }

    async fn append(&self, key: &ConversationKey, message: Message) -> StoreResult<usize> {
        let _guard = self.locks.acquire(key).await;

        let mut messages = match self.read_messages(key).await {
            Ok(messages) => messages,
            Err(e @ (ReadError::NotIndexed | ReadError::Missing(_))) => {
                tracing::debug!("[FileSystemStorage] Starting '{}', {}", key, e);
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(
                    "[FileSystemStorage] Appending to '{}' over unreadable content: {}",
                    key,
                    e
                );
                Vec::new()
            }
        };

        messages.push(message);
        self.write_locked(key, &messages).await?;
        Ok(messages.len())
    }

    async fn list_threads(&self, user_id: &str) -> Vec<String> {
        let threads = self.index.read().await.list_threads(user_id);
        tracing::debug!(
            "[FileSystemStorage] Listed {} threads for user '{}'",
            threads.len(),
            user_id
        );
        threads
    }

    async fn list_users(&self) -> Vec<String> {
        self.index.read().await.list_users()
    }

    async fn delete(&self, key: &ConversationKey) -> StoreResult<bool> {
        let _guard = self.locks.acquire(key).await;

        let Some(relative) = self.lookup(key).await else {
            tracing::debug!("[FileSystemStorage] Conversation '{}' does not exist, nothing to delete", key);
            return Ok(false);
        };

        let mut file_removed = false;
        if let Some(path) = self.resolve(&relative) {
            match fs::remove_file(&path).await {
                // User directories are left in place; a concurrent save of
                // another thread may be about to write into them.
                Ok(()) => file_removed = true,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::io(path, e)),
            }
        }

        let entry_removed = self.index.write().await.remove(key).await?;

        tracing::debug!(
            "[FileSystemStorage] Deleted '{}' (file: {}, index entry: {})",
            key,
            file_removed,
            entry_removed
        );
        Ok(file_removed || entry_removed)
    }

    async fn exists(&self, key: &ConversationKey) -> bool {
        let Some(path) = self.lookup(key).await.and_then(|r| self.resolve(&r)) else {
            return false;
        };
        fs::try_exists(&path).await.unwrap_or(false)
    }
}

/// A single path component containing a `.`. Escaped user directories
/// never contain one, so the index can't shadow a user's directory.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    single && name.contains('.')
}
