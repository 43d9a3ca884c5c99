//! In-Memory Conversation Storage
//!
//! Information Hiding:
//! - Nested map storage structure hidden from users
//! - Thread-safe access via RwLock hidden behind async interface
//! - Suitable for testing and ephemeral sessions

use super::ConversationStorage;
use crate::core::{ConversationKey, Message};
use crate::error::StoreResult;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

type Conversations = BTreeMap<String, BTreeMap<String, Vec<Message>>>;

/// In-memory storage keyed by user then thread.
/// Data is lost when process terminates
pub struct InMemoryStorage {
    conversations: RwLock<Conversations>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            conversations: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStorage for InMemoryStorage {
    async fn get(&self, key: &ConversationKey) -> Vec<Message> {
        let conversations = self.conversations.read().await;
        let history = conversations
            .get(key.user_id())
            .and_then(|threads| threads.get(key.thread_name()))
            .cloned()
            .unwrap_or_default();
        tracing::debug!(
            "[InMemoryStorage] Loaded {} messages for '{}'",
            history.len(),
            key
        );
        history
    }

    async fn save(&self, key: &ConversationKey, messages: &[Message]) -> StoreResult<()> {
        let mut conversations = self.conversations.write().await;
        conversations
            .entry(key.user_id().to_string())
            .or_default()
            .insert(key.thread_name().to_string(), messages.to_vec());
        tracing::debug!(
            "[InMemoryStorage] Saved {} messages for '{}'",
            messages.len(),
            key
        );
        Ok(())
    }

    async fn append(&self, key: &ConversationKey, message: Message) -> StoreResult<usize> {
        let mut conversations = self.conversations.write().await;
        let history = conversations
            .entry(key.user_id().to_string())
            .or_default()
            .entry(key.thread_name().to_string())
            .or_default();
        history.push(message);
        Ok(history.len())
    }

    async fn list_threads(&self, user_id: &str) -> Vec<String> {
        let conversations = self.conversations.read().await;
        conversations
            .get(user_id)
            .map(|threads| threads.keys().cloned().collect())
            .unwrap_or_default()
    }

    async fn list_users(&self) -> Vec<String> {
        self.conversations.read().await.keys().cloned().collect()
    }

    async fn delete(&self, key: &ConversationKey) -> StoreResult<bool> {
        let mut conversations = self.conversations.write().await;
        let Some(threads) = conversations.get_mut(key.user_id()) else {
            return Ok(false);
        };
        let removed = threads.remove(key.thread_name()).is_some();
        if threads.is_empty() {
            conversations.remove(key.user_id());
        }
        tracing::debug!("[InMemoryStorage] Deleted '{}': {}", key, removed);
        Ok(removed)
    }

    async fn exists(&self, key: &ConversationKey) -> bool {
        let conversations = self.conversations.read().await;
        conversations
            .get(key.user_id())
            .is_some_and(|threads| threads.contains_key(key.thread_name()))
    }
}
