//! Conversation message types.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix of locally generated message ids.
pub const TEMP_ID_PREFIX: &str = "temp-id-";

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// Identifier of a message.
///
/// Durable ids are assigned by the server. Temporary ids exist only while an
/// optimistic message waits for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Durable(i64),
    Temporary(String),
}

impl MessageId {
    /// Generates a fresh temporary id derived from the current time.
    pub fn temporary() -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        MessageId::Temporary(format!(
            "{}{}-{}",
            TEMP_ID_PREFIX,
            Utc::now().timestamp_millis(),
            &suffix[..8]
        ))
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, MessageId::Temporary(_))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Durable(id) => write!(f, "{}", id),
            MessageId::Temporary(id) => write!(f, "{}", id),
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    #[serde(default)]
    pub conversation_id: Option<i64>,
    pub message_body: String,
    pub sender: Sender,
    /// Creation time (ISO 8601).
    pub timestamp: String,
}

impl Message {
    /// Builds the client-side stand-in for a user message that has not been
    /// acknowledged yet.
    pub fn optimistic(conversation_id: Option<i64>, message_body: impl Into<String>) -> Self {
        Self {
            id: MessageId::temporary(),
            conversation_id,
            message_body: message_body.into(),
            sender: Sender::User,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimistic_message_has_temporary_id() {
        let message = Message::optimistic(Some(1), "hi");

        assert!(message.id.is_temporary());
        assert!(message.id.to_string().starts_with(TEMP_ID_PREFIX));
        assert_eq!(message.sender, Sender::User);
        assert_eq!(message.conversation_id, Some(1));
    }

    #[test]
    fn test_temporary_ids_are_unique() {
        assert_ne!(MessageId::temporary(), MessageId::temporary());
    }

    #[test]
    fn test_deserialize_server_message() {
        let json = r#"{
            "id": 10,
            "conversation_id": 1,
            "message_body": "hello",
            "sender": "assistant",
            "timestamp": "2024-05-01T10:00:00Z"
        }"#;

        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.id, MessageId::Durable(10));
        assert_eq!(message.sender, Sender::Assistant);
    }
}
