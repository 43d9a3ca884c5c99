//! Conversation identity and its mapping onto storage paths.

use crate::error::{StoreError, StoreResult};
use std::fmt;

/// Escaped components longer than this are rejected so file names stay
/// below the common 255-byte limit once the extension is added.
pub const MAX_ESCAPED_COMPONENT_LEN: usize = 240;

/// Extension used for conversation content files
pub const CONTENT_EXTENSION: &str = "json";

/// `(user_id, thread_name)` pair identifying one conversation.
///
/// Equality is byte-exact on both components. Construction validates the
/// key, so every value of this type maps to a well-formed relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationKey {
    user_id: String,
    thread_name: String,
}

impl ConversationKey {
    pub fn new(user_id: impl Into<String>, thread_name: impl Into<String>) -> StoreResult<Self> {
        let user_id = user_id.into();
        let thread_name = thread_name.into();

        validate_component("user_id", &user_id)?;
        validate_component("thread_name", &thread_name)?;

        Ok(Self {
            user_id,
            thread_name,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// Relative content path for this key, always `/`-separated:
    /// `<escaped user>/<escaped thread>.json`.
    ///
    /// Injective over all valid keys: [`escape_component`] is injective and
    /// never emits `/`, so the pair can be recovered from the path.
    pub fn relative_path(&self) -> String {
        format!(
            "{}/{}.{}",
            escape_component(&self.user_id),
            escape_component(&self.thread_name),
            CONTENT_EXTENSION
        )
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user_id, self.thread_name)
    }
}

/// Percent-escape everything except ASCII alphanumerics, `-` and `_`.
///
/// `%` itself is escaped, which keeps the encoding injective. Dots and path
/// separators never survive, so an escaped component can't be `.` or `..`.
pub fn escape_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

fn validate_component(field: &str, value: &str) -> StoreResult<()> {
    if value.is_empty() {
        return Err(StoreError::invalid_key(format!("{} must not be empty", field)));
    }

    if value.chars().any(char::is_control) {
        return Err(StoreError::invalid_key(format!(
            "{} must not contain control characters",
            field
        )));
    }

    let escaped_len = escape_component(value).len();
    if escaped_len > MAX_ESCAPED_COMPONENT_LEN {
        return Err(StoreError::invalid_key(format!(
            "{} is too long ({} bytes once escaped, max {})",
            field, escaped_len, MAX_ESCAPED_COMPONENT_LEN
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_plain_key_path() {
        let key = ConversationKey::new("alice", "trip").unwrap();
        assert_eq!(key.relative_path(), "alice/trip.json");
    }

    #[test]
    fn test_escape_separators_and_dots() {
        assert_eq!(escape_component("../etc"), "%2E%2E%2Fetc");
        assert_eq!(escape_component("a\\b"), "a%5Cb");
        assert_eq!(escape_component("50%"), "50%25");
        assert_eq!(escape_component("é"), "%C3%A9");
    }

    #[test]
    fn test_adversarial_keys_are_injective() {
        let pairs = [
            ("a", "b_c"),
            ("a_b", "c"),
            ("a/b", "c"),
            ("a", "b/c"),
            ("a%2Fb", "c"),
            ("a", "b.json"),
            ("a", "b%2Ejson"),
            ("..", ".."),
            (".", ".."),
            ("...", "."),
            ("Alice", "trip"),
            ("alice", "trip"),
            ("alice", "trip "),
            ("a b", "c"),
            ("a+b", "c"),
        ];

        let mut seen = HashSet::new();
        for (user, thread) in pairs {
            let key = ConversationKey::new(user, thread).unwrap();
            let path = key.relative_path();
            assert!(seen.insert(path.clone()), "collision on {}", path);

            let components: Vec<&str> = path.split('/').collect();
            assert_eq!(components.len(), 2, "unexpected separator in {}", path);
            assert!(components.iter().all(|c| *c != "." && *c != ".."));
        }
    }

    #[test]
    fn test_rejects_empty_and_control() {
        assert!(matches!(
            ConversationKey::new("", "trip"),
            Err(StoreError::InvalidKey { .. })
        ));
        assert!(matches!(
            ConversationKey::new("alice", ""),
            Err(StoreError::InvalidKey { .. })
        ));
        assert!(ConversationKey::new("al\0ice", "trip").is_err());
        assert!(ConversationKey::new("alice", "tr\nip").is_err());
    }

    #[test]
    fn test_rejects_overlong_component() {
        let ok = "a".repeat(MAX_ESCAPED_COMPONENT_LEN);
        assert!(ConversationKey::new(ok.as_str(), "t").is_ok());

        let too_long = "/".repeat(MAX_ESCAPED_COMPONENT_LEN / 3 + 1);
        assert!(ConversationKey::new("u", too_long).is_err());
    }

    #[test]
    fn test_equality_is_case_sensitive() {
        let a = ConversationKey::new("alice", "trip").unwrap();
        let b = ConversationKey::new("Alice", "trip").unwrap();
        assert_ne!(a, b);
        assert_eq!(a, ConversationKey::new("alice", "trip").unwrap());
    }
}
