//! Conversation Storage Abstraction
//!
//! Information Hiding:
//! - Storage backend implementation details hidden behind trait
//! - Allows swapping between memory, filesystem or a networked engine without API changes
//! - Each storage implementation encapsulates its own data structures and locking
//!
//! Read-path failures (unknown key, missing or corrupt content) never reach
//! callers: `get` reports them as an empty conversation. Write-path failures
//! always propagate.

use crate::core::{ConversationKey, Message};
use crate::error::StoreResult;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

mod atomic;
pub mod filesystem;
pub mod index;
pub mod locks;
pub mod memory;
pub mod store;

pub use filesystem::FileSystemStorage;
pub use index::ConversationIndex;
pub use memory::InMemoryStorage;
pub use store::ConversationStore;

/// Trait defining conversation storage interface
/// Implementations can use different backends (memory, file, database)
#[async_trait]
pub trait ConversationStorage: Send + Sync {
    /// Load the messages of a conversation, in order.
    /// Returns empty vector if the conversation doesn't exist or can't be read
    async fn get(&self, key: &ConversationKey) -> Vec<Message>;

    /// Replace the whole conversation with `messages`
    async fn save(&self, key: &ConversationKey, messages: &[Message]) -> StoreResult<()>;

    /// Append one message, creating the conversation if needed.
    /// Returns the new number of messages
    async fn append(&self, key: &ConversationKey, message: Message) -> StoreResult<usize>;

    /// Thread names of a user, sorted; empty for unknown users
    async fn list_threads(&self, user_id: &str) -> Vec<String>;

    /// Users with at least one conversation, sorted
    async fn list_users(&self) -> Vec<String>;

    /// Delete a conversation. Returns whether anything was removed
    async fn delete(&self, key: &ConversationKey) -> StoreResult<bool>;

    /// Check if a conversation exists
    async fn exists(&self, key: &ConversationKey) -> bool {
        !self.get(key).await.is_empty()
    }
}

/// Storage backend type
#[derive(Debug, Clone)]
pub enum StorageType {
    /// In-memory storage (lost on process termination)
    Memory,
    /// File system storage rooted at the given directory
    FileSystem(PathBuf),
}

/// Build a storage backend behind the shared interface
pub async fn open_storage(storage_type: StorageType) -> StoreResult<Arc<dyn ConversationStorage>> {
    let storage: Arc<dyn ConversationStorage> = match storage_type {
        StorageType::Memory => Arc::new(InMemoryStorage::new()),
        StorageType::FileSystem(root) => Arc::new(FileSystemStorage::new(root).await?),
    };
    Ok(storage)
}
