//! Conversation list queries and the mutations that patch the cached list.

use std::sync::Arc;

use ioverse_core::Result;
use ioverse_core::account::ValidationErrors;
use ioverse_core::chat::{ChatBackend, Conversation, ConversationList};

use crate::chat_state::ChatState;
use crate::query_cache::{CONVERSATIONS_KEY, QueryCache};

pub struct ConversationService {
    backend: Arc<dyn ChatBackend>,
    cache: QueryCache,
    state: ChatState,
}

impl ConversationService {
    pub fn new(backend: Arc<dyn ChatBackend>, cache: QueryCache, state: ChatState) -> Self {
        Self {
            backend,
            cache,
            state,
        }
    }

    /// Returns the conversation list, fetching it when the cache is empty or
    /// stale.
    pub async fn conversations(&self) -> Result<ConversationList> {
        if !self.cache.needs_refetch(CONVERSATIONS_KEY).await
            && let Some(list) = self.cache.get(CONVERSATIONS_KEY).await?
        {
            return Ok(list);
        }
        self.reload().await
    }

    /// Fetches the list from the backend and replaces the cached copy.
    pub async fn reload(&self) -> Result<ConversationList> {
        let list = self.backend.list_conversations().await?;
        self.cache.set(CONVERSATIONS_KEY, &list).await?;
        tracing::debug!(
            "[Conversations] Loaded {} conversations",
            list.results.len()
        );
        Ok(list)
    }

    /// Loads one conversation, stores it in the cached list and makes it the
    /// active one.
    pub async fn open(&self, id: i64) -> Result<Conversation> {
        let conversation = self.backend.get_conversation(id).await?;

        let fresh = conversation.clone();
        let updated = self
            .cache
            .update(CONVERSATIONS_KEY, |list: &mut ConversationList| {
                match list.get_mut(id) {
                    Some(cached) => *cached = fresh,
                    None => list.results.insert(0, fresh),
                }
            })
            .await?;
        if !updated {
            self.cache
                .set(
                    CONVERSATIONS_KEY,
                    &ConversationList {
                        results: vec![conversation.clone()],
                    },
                )
                .await?;
            // A single conversation is not the whole list.
            self.cache.invalidate(CONVERSATIONS_KEY).await;
        }

        self.state.set_active_conversation(Some(id)).await;
        Ok(conversation)
    }

    /// Renames a conversation and patches its cached title in place.
    pub async fn rename(&self, id: i64, new_title: &str) -> Result<()> {
        let new_title = new_title.trim();
        if new_title.is_empty() {
            let mut errors = ValidationErrors::new();
            errors.add("new_title", "This field may not be blank.");
            return Err(errors.into());
        }

        self.backend.rename_conversation(id, new_title).await?;
        self.cache
            .update(CONVERSATIONS_KEY, |list: &mut ConversationList| {
                if let Some(conversation) = list.get_mut(id) {
                    conversation.title = Some(new_title.to_string());
                }
            })
            .await?;
        tracing::info!("[Conversations] Renamed conversation {}", id);
        Ok(())
    }

    /// Deletes a conversation and filters it out of the cached list.
    ///
    /// Clears the active selection when it pointed at the deleted one.
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.backend.delete_conversation(id).await?;
        self.cache
            .update(CONVERSATIONS_KEY, |list: &mut ConversationList| {
                list.results.retain(|c| c.id != id);
            })
            .await?;

        if self.state.active_conversation().await == Some(id) {
            self.state.set_active_conversation(None).await;
        }
        tracing::info!("[Conversations] Deleted conversation {}", id);
        Ok(())
    }
}
