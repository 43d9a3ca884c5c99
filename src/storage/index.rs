//! Conversation Index
//!
//! Information Hiding:
//! - On-disk layout of the index artifact hidden behind lookup/put/remove
//! - Write-through persistence: every mutation is flushed before it returns
//! - Recovery from a missing or corrupt artifact handled at load time

use super::atomic::write_atomic;
use crate::core::ConversationKey;
use crate::error::{StoreError, StoreResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;

/// `user_id -> thread_name -> relative content path`
type IndexMap = BTreeMap<String, BTreeMap<String, String>>;

/// Persistent mapping from conversation keys to content file locations.
///
/// The index owns no lock; the owning store wraps it in one and holds the
/// write side across every `put`/`remove`, which include the flush.
#[derive(Debug)]
pub struct ConversationIndex {
    path: PathBuf,
    entries: IndexMap,
}

impl ConversationIndex {
    /// Load the index artifact at `path`.
    ///
    /// A missing artifact yields an empty index that is persisted right away.
    /// An artifact that fails to parse is renamed to
    /// `<name>.corrupt-<unix secs>` and replaced by an empty index.
    pub async fn load(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("[ConversationIndex] No index at {:?}, creating an empty one", path);
                let index = Self::empty(path);
                index.persist().await?;
                return Ok(index);
            }
            Err(e) => return Err(StoreError::io(path, e)),
        };

        match serde_json::from_slice::<IndexMap>(&bytes) {
            Ok(entries) => {
                let index = Self { path, entries };
                tracing::debug!(
                    "[ConversationIndex] Loaded {} conversations for {} users from {:?}",
                    index.len(),
                    index.entries.len(),
                    index.path
                );
                Ok(index)
            }
            Err(e) => {
                tracing::warn!("[ConversationIndex] Index at {:?} is corrupt: {}", path, e);
                quarantine(&path).await;
                let index = Self::empty(path);
                index.persist().await?;
                Ok(index)
            }
        }
    }

    fn empty(path: PathBuf) -> Self {
        Self {
            path,
            entries: IndexMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Relative path recorded for `key`, no I/O
    pub fn lookup(&self, key: &ConversationKey) -> Option<&str> {
        self.entries
            .get(key.user_id())
            .and_then(|threads| threads.get(key.thread_name()))
            .map(String::as_str)
    }

    /// Insert or overwrite the entry for `key`, then persist the whole index.
    ///
    /// If the flush fails the in-memory entry is rolled back, so memory and
    /// disk agree whenever this returns.
    pub async fn put(&mut self, key: &ConversationKey, relative_path: impl Into<String>) -> StoreResult<()> {
        let previous = self
            .entries
            .entry(key.user_id().to_string())
            .or_default()
            .insert(key.thread_name().to_string(), relative_path.into());

        if let Err(e) = self.persist().await {
            match previous {
                Some(old) => {
                    self.insert_raw(key, old);
                }
                None => {
                    self.remove_raw(key);
                }
            }
            return Err(e);
        }

        tracing::debug!("[ConversationIndex] Indexed '{}'", key);
        Ok(())
    }

    /// Drop the entry for `key`; persists only when something was removed
    pub async fn remove(&mut self, key: &ConversationKey) -> StoreResult<bool> {
        let Some(old) = self.remove_raw(key) else {
            return Ok(false);
        };

        if let Err(e) = self.persist().await {
            self.insert_raw(key, old);
            return Err(e);
        }

        tracing::debug!("[ConversationIndex] Removed '{}'", key);
        Ok(true)
    }

    /// Thread names of `user_id`, sorted. Unknown users have none.
    pub fn list_threads(&self, user_id: &str) -> Vec<String> {
        self.entries
            .get(user_id)
            .map(|threads| threads.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Users owning at least one conversation, sorted
    pub fn list_users(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Total number of indexed conversations
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rewrite the whole artifact as indented JSON
    pub async fn persist(&self) -> StoreResult<()> {
        let json = serde_json::to_vec_pretty(&self.entries)?;
        write_atomic(&self.path, &json).await
    }

    fn insert_raw(&mut self, key: &ConversationKey, relative_path: String) {
        self.entries
            .entry(key.user_id().to_string())
            .or_default()
            .insert(key.thread_name().to_string(), relative_path);
    }

    fn remove_raw(&mut self, key: &ConversationKey) -> Option<String> {
        let threads = self.entries.get_mut(key.user_id())?;
        let removed = threads.remove(key.thread_name());
        if threads.is_empty() {
            self.entries.remove(key.user_id());
        }
        removed
    }
}

/// Move a corrupt artifact out of the way, keeping it for inspection.
/// Never replaces an earlier quarantined copy.
async fn quarantine(path: &Path) {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let Some(aside) = free_quarantine_path(path, secs).await else {
        tracing::warn!("[ConversationIndex] No free name to move corrupt index aside, it will be overwritten");
        return;
    };

    match fs::rename(path, &aside).await {
        Ok(()) => tracing::warn!("[ConversationIndex] Moved corrupt index to {:?}", aside),
        Err(e) => tracing::warn!(
            "[ConversationIndex] Could not move corrupt index aside ({}), it will be overwritten",
            e
        ),
    }
}

/// `<name>.corrupt-<secs>`, or `<name>.corrupt-<secs>-<n>` when taken
async fn free_quarantine_path(path: &Path, secs: u64) -> Option<PathBuf> {
    let base = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

    for attempt in 0..1000u32 {
        let name = match attempt {
            0 => format!("{}.corrupt-{}", base, secs),
            n => format!("{}.corrupt-{}-{}", base, secs, n),
        };
        let candidate = path.with_file_name(name);
        if !fs::try_exists(&candidate).await.unwrap_or(true) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key(user: &str, thread: &str) -> ConversationKey {
        ConversationKey::new(user, thread).unwrap()
    }

    #[tokio::test]
    async fn test_load_missing_creates_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("index.json");

        let index = ConversationIndex::load(&path).await.unwrap();

        assert!(index.is_empty());
        assert!(path.exists());
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw.trim(), "{}");
    }

    #[tokio::test]
    async fn test_put_lookup_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("index.json");

        {
            let mut index = ConversationIndex::load(&path).await.unwrap();
            index.put(&key("alice", "trip"), "alice/trip.json").await.unwrap();
            index.put(&key("alice", "work"), "alice/work.json").await.unwrap();
            index.put(&key("bob", "trip"), "bob/trip.json").await.unwrap();
        }

        let index = ConversationIndex::load(&path).await.unwrap();
        assert_eq!(index.lookup(&key("alice", "trip")), Some("alice/trip.json"));
        assert_eq!(index.lookup(&key("bob", "work")), None);
        assert_eq!(index.list_threads("alice"), vec!["trip", "work"]);
        assert_eq!(index.list_users(), vec!["alice", "bob"]);
        assert_eq!(index.len(), 3);
    }

    #[tokio::test]
    async fn test_persisted_form_is_nested_and_indented() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("index.json");

        let mut index = ConversationIndex::load(&path).await.unwrap();
        index.put(&key("alice", "trip"), "alice/trip.json").await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["alice"]["trip"], "alice/trip.json");
    }

    #[tokio::test]
    async fn test_unknown_user_lists_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let index = ConversationIndex::load(temp_dir.path().join("index.json"))
            .await
            .unwrap();

        assert!(index.list_threads("nobody").is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_index_is_quarantined() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("index.json");
        std::fs::write(&path, b"{not json at all").unwrap();

        let mut index = ConversationIndex::load(&path).await.unwrap();
        assert!(index.is_empty());

        let aside: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| name.starts_with("index.json.corrupt-"))
            .collect();
        assert_eq!(aside.len(), 1);
        let preserved = std::fs::read(temp_dir.path().join(&aside[0])).unwrap();
        assert_eq!(preserved, b"{not json at all");

        index.put(&key("alice", "trip"), "alice/trip.json").await.unwrap();
        let reloaded = ConversationIndex::load(&path).await.unwrap();
        assert_eq!(reloaded.lookup(&key("alice", "trip")), Some("alice/trip.json"));
    }

    #[tokio::test]
    async fn test_remove_drops_empty_user() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("index.json");

        let mut index = ConversationIndex::load(&path).await.unwrap();
        index.put(&key("alice", "trip"), "alice/trip.json").await.unwrap();

        assert!(index.remove(&key("alice", "trip")).await.unwrap());
        assert!(!index.remove(&key("alice", "trip")).await.unwrap());
        assert!(index.list_users().is_empty());

        let reloaded = ConversationIndex::load(&path).await.unwrap();
        assert!(reloaded.is_empty());
    }

    #[tokio::test]
    async fn test_failed_persist_rolls_back() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("root");
        std::fs::create_dir(&root).unwrap();

        let mut index = ConversationIndex::load(root.join("index.json")).await.unwrap();
        std::fs::remove_dir_all(&root).unwrap();

        let err = index.put(&key("alice", "trip"), "alice/trip.json").await;
        assert!(matches!(err, Err(StoreError::Io { .. })));
        assert_eq!(index.lookup(&key("alice", "trip")), None);
    }

    #[tokio::test]
    async fn test_repeated_corruption_keeps_every_copy() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("index.json");

        for garbage in [&b"first garbage"[..], &b"second garbage"[..], &b"third garbage"[..]] {
            std::fs::write(&path, garbage).unwrap();
            let index = ConversationIndex::load(&path).await.unwrap();
            assert!(index.is_empty());
        }

        let mut preserved: Vec<Vec<u8>> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("index.json.corrupt-"))
            .map(|e| std::fs::read(e.path()).unwrap())
            .collect();
        preserved.sort();

        assert_eq!(
            preserved,
            vec![b"first garbage".to_vec(), b"second garbage".to_vec(), b"third garbage".to_vec()]
        );
    }
}
