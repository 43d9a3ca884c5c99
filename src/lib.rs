//! Threadlog - indexed, file-backed conversation store
//!
//! Maps `(user_id, thread_name)` pairs to ordered message logs. A JSON index
//! at the storage root locates each conversation's content file; both are
//! written through on every change.

pub mod cli;
mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod utils;

pub use crate::config::{LoggingConfig, Settings, StorageConfig};
pub use crate::core::{ConversationKey, Message, Role};
pub use crate::error::{StoreError, StoreResult};
pub use crate::storage::{
    open_storage, ConversationStorage, ConversationStore, FileSystemStorage, InMemoryStorage,
    StorageType,
};
