//! Chat service seam.

use super::model::{ConversationList, SendMessageRequest, SendMessageResponse};
use super::Conversation;
use crate::error::Result;

/// Remote operations on conversations.
///
/// The HTTP implementation lives in the interaction layer; the mutation
/// coordinators only depend on this trait.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Fetches all conversations of the current user.
    async fn list_conversations(&self) -> Result<ConversationList>;

    /// Fetches a single conversation with its messages.
    async fn get_conversation(&self, id: i64) -> Result<Conversation>;

    /// Sends a user message and returns the durable user/assistant pair.
    async fn send_message(&self, request: &SendMessageRequest) -> Result<SendMessageResponse>;

    async fn rename_conversation(&self, id: i64, new_title: &str) -> Result<()>;

    async fn delete_conversation(&self, id: i64) -> Result<()>;
}
