use serde::{Deserialize, Serialize};

use super::message::{Message, MessageId};

/// A conversation with its messages in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Conversation {
    /// Drops the message with the given id, keeping the order of the rest.
    pub fn remove_message(&mut self, id: &MessageId) {
        self.messages.retain(|m| &m.id != id);
    }
}

/// Response of `GET /chatbot/conversations`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationList {
    #[serde(default)]
    pub results: Vec<Conversation>,
}

impl ConversationList {
    pub fn get(&self, id: i64) -> Option<&Conversation> {
        self.results.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: i64) -> Option<&mut Conversation> {
        self.results.iter_mut().find(|c| c.id == id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.get(id).is_some()
    }
}

/// Body of `POST /chatbot/send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub message_body: String,
    /// `None` asks the server to start a new conversation.
    pub conversation_id: Option<i64>,
}

/// Response of `POST /chatbot/send`: the durable user message and the reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub user_message: Message,
    pub ai_message: Message,
}

impl SendMessageResponse {
    /// Conversation the server filed the exchange under.
    pub fn conversation_id(&self) -> Option<i64> {
        self.user_message
            .conversation_id
            .or(self.ai_message.conversation_id)
    }
}

/// Body of `PATCH /chatbot/conversations/{id}/rename/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameConversationRequest {
    pub new_title: String,
}
