//! Domain types shared by every storage backend

pub mod key;
pub mod message;

pub use key::ConversationKey;
pub use message::{Message, Role};
