//! String-keyed facade over any [`ConversationStorage`]
//!
//! Shells and other callers hand over raw identifiers; this layer turns them
//! into validated [`ConversationKey`]s. An invalid key on the read path reads
//! as an empty conversation, on the write path it is an error.

use super::{ConversationStorage, FileSystemStorage, InMemoryStorage};
use crate::config::StorageConfig;
use crate::core::{ConversationKey, Message};
use crate::error::StoreResult;
use std::sync::Arc;

/// Cheap to clone; clones share the same backend
#[derive(Clone)]
pub struct ConversationStore {
    storage: Arc<dyn ConversationStorage>,
}

impl ConversationStore {
    pub fn new(storage: Arc<dyn ConversationStorage>) -> Self {
        Self { storage }
    }

    /// File-backed store as described by configuration
    pub async fn open(config: &StorageConfig) -> StoreResult<Self> {
        let storage =
            FileSystemStorage::with_index_file(config.root.clone(), &config.index_file).await?;
        Ok(Self::new(Arc::new(storage)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStorage::new()))
    }

    pub fn storage(&self) -> &Arc<dyn ConversationStorage> {
        &self.storage
    }

    pub async fn get_conversation(&self, user_id: &str, thread_name: &str) -> Vec<Message> {
        match ConversationKey::new(user_id, thread_name) {
            Ok(key) => self.storage.get(&key).await,
            Err(e) => {
                tracing::warn!("Reading invalid key as empty conversation: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn save_conversation(
        &self,
        user_id: &str,
        thread_name: &str,
        messages: &[Message],
    ) -> StoreResult<()> {
        let key = ConversationKey::new(user_id, thread_name)?;
        self.storage.save(&key, messages).await
    }

    pub async fn append_message(
        &self,
        user_id: &str,
        thread_name: &str,
        message: Message,
    ) -> StoreResult<usize> {
        let key = ConversationKey::new(user_id, thread_name)?;
        self.storage.append(&key, message).await
    }

    pub async fn list_threads(&self, user_id: &str) -> Vec<String> {
        self.storage.list_threads(user_id).await
    }

    pub async fn list_users(&self) -> Vec<String> {
        self.storage.list_users().await
    }

    pub async fn delete_conversation(&self, user_id: &str, thread_name: &str) -> StoreResult<bool> {
        let key = ConversationKey::new(user_id, thread_name)?;
        self.storage.delete(&key).await
    }
}
