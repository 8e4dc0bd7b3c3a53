//! Application layer of the ioverse client.
//!
//! Coordinates the interaction layer with the client-side query cache:
//! optimistic chat sends, conversation list maintenance, the assistant
//! workspace, and the login lifecycle, all reachable through one
//! [`SessionContext`].

pub mod assistants;
pub mod auth_session;
pub mod chat_send;
pub mod chat_state;
pub mod conversations;
pub mod query_cache;
pub mod session_context;

pub use assistants::{
    ASSISTANTS_KEY, AssistantWorkspace, THREADS_KEY, VECTOR_STORES_KEY, file_batch_stream_target,
    messages_key,
};
pub use auth_session::{AuthSession, AuthStatus};
pub use chat_send::ChatSendCoordinator;
pub use chat_state::{ChatState, ChatViewState};
pub use conversations::ConversationService;
pub use query_cache::{CONVERSATIONS_KEY, CacheEntry, QueryCache};
pub use session_context::SessionContext;
