//! Optimistic chat send.
//!
//! Each send runs one instance of the following state machine:
//!
//! - **Applied**: an optimistic user message is appended to the cached
//!   conversation (or parked in the pending-first-message slot when no
//!   cached conversation exists) and the typing indicator is raised.
//! - **Committed**: the optimistic message is removed by id and the durable
//!   user/assistant pair is appended in that order. For a new conversation
//!   the list is refetched instead and the new conversation becomes active.
//! - **RolledBack**: the messages of the touched conversation (or the pending
//!   slot) are restored to the snapshot taken before the optimistic write and
//!   a user-facing error is recorded.
//!
//! Sends to the same conversation are serialized; the next one starts only
//! after the previous one reached a terminal state. Sends to different
//! conversations run concurrently and never touch each other's messages.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use ioverse_core::account::ValidationErrors;
use ioverse_core::chat::{
    ChatBackend, ConversationList, Message, MessageId, SendMessageRequest, SendMessageResponse,
};
use ioverse_core::{IoverseError, Result};

use crate::chat_state::ChatState;
use crate::query_cache::{CONVERSATIONS_KEY, QueryCache};

/// Where the optimistic message was put, with what it replaced.
#[derive(Debug)]
enum Placement {
    Conversation { id: i64, previous: Vec<Message> },
    PendingFirst { previous: Option<Message> },
}

pub struct ChatSendCoordinator {
    backend: Arc<dyn ChatBackend>,
    cache: QueryCache,
    state: ChatState,
    send_locks: Mutex<HashMap<Option<i64>, Arc<Mutex<()>>>>,
}

impl ChatSendCoordinator {
    pub fn new(backend: Arc<dyn ChatBackend>, cache: QueryCache, state: ChatState) -> Self {
        Self {
            backend,
            cache,
            state,
            send_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Sends `body` to `conversation_id` (`None` starts a new conversation).
    ///
    /// On failure the cache is already rolled back and the user-facing
    /// message is recorded in [`ChatState`] when this returns.
    pub async fn send(
        &self,
        conversation_id: Option<i64>,
        body: &str,
    ) -> Result<SendMessageResponse> {
        let body = body.trim();
        if body.is_empty() {
            let mut errors = ValidationErrors::new();
            errors.add("message_body", "This field may not be blank.");
            return Err(IoverseError::Validation(errors));
        }

        let lock = self.lock_for(conversation_id).await;
        let outcome = {
            let _guard = lock.lock().await;
            self.send_exclusive(conversation_id, body).await
        };
        drop(lock);
        self.release_lock(conversation_id).await;
        outcome
    }

    async fn send_exclusive(
        &self,
        conversation_id: Option<i64>,
        body: &str,
    ) -> Result<SendMessageResponse> {
        let optimistic = Message::optimistic(conversation_id, body);
        let placement = self.apply(conversation_id, &optimistic).await;
        self.state.set_typing(true).await;

        let request = SendMessageRequest {
            message_body: body.to_string(),
            conversation_id,
        };
        let outcome = match self.backend.send_message(&request).await {
            Ok(response) => {
                self.commit(placement, &optimistic.id, &response).await;
                Ok(response)
            }
            Err(e) => {
                tracing::error!("[ChatSend] Send failed, rolling back: {}", e);
                self.rollback(placement).await;
                self.state.record_error(e.user_message()).await;
                Err(e)
            }
        };

        self.state.set_typing(false).await;
        outcome
    }

    async fn lock_for(&self, conversation_id: Option<i64>) -> Arc<Mutex<()>> {
        let mut locks = self.send_locks.lock().await;
        locks.entry(conversation_id).or_default().clone()
    }

    /// Drops the lock entry once no other send holds or awaits it.
    async fn release_lock(&self, conversation_id: Option<i64>) {
        let mut locks = self.send_locks.lock().await;
        if locks
            .get(&conversation_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&conversation_id);
        }
    }

    #[cfg(test)]
    async fn tracked_locks(&self) -> usize {
        self.send_locks.lock().await.len()
    }

    async fn apply(&self, conversation_id: Option<i64>, optimistic: &Message) -> Placement {
        if let Some(id) = conversation_id {
            let mut previous = None;
            let result = self
                .cache
                .update(CONVERSATIONS_KEY, |list: &mut ConversationList| {
                    if let Some(conversation) = list.get_mut(id) {
                        previous = Some(conversation.messages.clone());
                        conversation.messages.push(optimistic.clone());
                    }
                })
                .await;

            match (result, previous) {
                (Ok(_), Some(previous)) => return Placement::Conversation { id, previous },
                (Ok(_), None) => {}
                (Err(e), _) => {
                    tracing::warn!("[ChatSend] Cached conversation list unreadable: {}", e)
                }
            }
        }

        let previous = self.state.pending_first_message().await;
        self.state
            .set_pending_first_message(Some(optimistic.clone()))
            .await;
        Placement::PendingFirst { previous }
    }

    async fn rollback(&self, placement: Placement) {
        match placement {
            Placement::Conversation { id, previous } => {
                let result = self
                    .cache
                    .update(CONVERSATIONS_KEY, |list: &mut ConversationList| {
                        if let Some(conversation) = list.get_mut(id) {
                            conversation.messages = previous;
                        }
                    })
                    .await;

                if let Err(e) = result {
                    tracing::warn!("[ChatSend] Failed to roll back conversation {}: {}", id, e);
                    self.cache.invalidate(CONVERSATIONS_KEY).await;
                }
            }
            Placement::PendingFirst { previous } => {
                self.state.set_pending_first_message(previous).await;
            }
        }
    }

    async fn commit(
        &self,
        placement: Placement,
        optimistic_id: &MessageId,
        response: &SendMessageResponse,
    ) {
        match placement {
            Placement::Conversation { id, .. } => {
                let mut patched = false;
                let result = self
                    .cache
                    .update(CONVERSATIONS_KEY, |list: &mut ConversationList| {
                        if let Some(conversation) = list.get_mut(id) {
                            conversation.remove_message(optimistic_id);
                            conversation.messages.push(response.user_message.clone());
                            conversation.messages.push(response.ai_message.clone());
                            patched = true;
                        }
                    })
                    .await;

                match result {
                    Ok(_) if patched => {}
                    Ok(_) => tracing::debug!(
                        "[ChatSend] Conversation {} left the cache before the reply arrived",
                        id
                    ),
                    Err(e) => {
                        tracing::warn!("[ChatSend] Failed to patch conversation {}: {}", id, e);
                        self.cache.invalidate(CONVERSATIONS_KEY).await;
                    }
                }
            }
            Placement::PendingFirst { .. } => {
                self.state.set_pending_first_message(None).await;
                self.cache.invalidate(CONVERSATIONS_KEY).await;
                self.refetch_conversations().await;

                let created = response.conversation_id();
                if created.is_some() {
                    self.state.set_active_conversation(created).await;
                }
                tracing::info!("[ChatSend] Started conversation {:?}", created);
            }
        }
    }

    /// Reloads the conversation list. On failure the entry stays stale.
    async fn refetch_conversations(&self) {
        match self.backend.list_conversations().await {
            Ok(list) => {
                if let Err(e) = self.cache.set(CONVERSATIONS_KEY, &list).await {
                    tracing::warn!("[ChatSend] Failed to cache conversations: {}", e);
                }
            }
            Err(e) => tracing::warn!("[ChatSend] Failed to refetch conversations: {}", e),
        }
    }
}
