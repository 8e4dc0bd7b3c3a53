//! Chat domain module.
//!
//! Conversations, messages, and the payloads of the chat endpoints.

mod backend;
mod message;
mod model;

pub use backend::ChatBackend;
pub use message::{Message, MessageId, Sender, TEMP_ID_PREFIX};
pub use model::{
    Conversation, ConversationList, RenameConversationRequest, SendMessageRequest,
    SendMessageResponse,
};
