use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => Err(format!(
                "unknown role '{}', expected user, assistant or system",
                other
            )),
        }
    }
}

/// One entry of a conversation log.
///
/// Serialized as `{"role": "...", "content": "...", "timestamp": "..."}` with
/// the timestamp omitted when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Stamp the message with the current UTC time (RFC 3339)
    pub fn stamped(self) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        self.with_timestamp(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_json_shape() {
        let msg = Message::user("hi");
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn test_message_with_timestamp_parses() {
        let raw = r#"{"role": "assistant", "content": "hello", "timestamp": "2024-01-01T00:00:00Z"}"#;
        let msg: Message = serde_json::from_str(raw).unwrap();

        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.timestamp.as_deref(), Some("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_unknown_role_rejected() {
        let raw = r#"{"role": "tool", "content": "x"}"#;
        assert!(serde_json::from_str::<Message>(raw).is_err());
        assert!("tool".parse::<Role>().is_err());
        assert_eq!("System".parse::<Role>().unwrap(), Role::System);
    }

    #[test]
    fn test_stamped_sets_rfc3339() {
        let msg = Message::system("be brief").stamped();
        let ts = msg.timestamp.unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
