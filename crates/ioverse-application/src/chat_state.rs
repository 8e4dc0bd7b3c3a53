//! Chat view state shared between the send flow and the presentation layer.

use std::sync::Arc;
use tokio::sync::RwLock;

use ioverse_core::chat::Message;

/// Point-in-time copy of the chat view state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatViewState {
    /// True while a send waits for the assistant reply.
    pub typing: bool,
    /// Optimistic message of a send that will create a new conversation.
    pub pending_first_message: Option<Message>,
    pub active_conversation: Option<i64>,
    /// Last user-facing error, shown once by the presentation layer.
    pub last_error: Option<String>,
}

#[derive(Clone, Default)]
pub struct ChatState {
    inner: Arc<RwLock<ChatViewState>>,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> ChatViewState {
        self.inner.read().await.clone()
    }

    pub async fn set_typing(&self, typing: bool) {
        self.inner.write().await.typing = typing;
    }

    pub async fn set_pending_first_message(&self, message: Option<Message>) {
        self.inner.write().await.pending_first_message = message;
    }

    pub async fn pending_first_message(&self) -> Option<Message> {
        self.inner.read().await.pending_first_message.clone()
    }

    pub async fn set_active_conversation(&self, id: Option<i64>) {
        self.inner.write().await.active_conversation = id;
    }

    pub async fn active_conversation(&self) -> Option<i64> {
        self.inner.read().await.active_conversation
    }

    pub async fn record_error(&self, message: impl Into<String>) {
        self.inner.write().await.last_error = Some(message.into());
    }

    /// Returns and clears the last error.
    pub async fn take_error(&self) -> Option<String> {
        self.inner.write().await.last_error.take()
    }

    /// Back to the logged-out state.
    pub async fn reset(&self) {
        *self.inner.write().await = ChatViewState::default();
    }
}
