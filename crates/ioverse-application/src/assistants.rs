//! Assistant workspace: cached assistant, thread and vector store lists,
//! optimistic thread messages, and vector store ingestion streams.

use chrono::Utc;
use serde_json::Map;
use std::sync::Arc;

use ioverse_core::Result;
use ioverse_core::assistant::{
    Assistant, AssistantParams, FileBatch, FileBatchRequest, GenerateResponse, GenerationKind,
    NewThreadMessage, Thread, ThreadMessage, VectorStore, VectorStoreCreated, VectorStoreParams,
};
use ioverse_core::chat::MessageId;
use ioverse_interaction::{
    AssistantApi, EventStreamHandler, StreamOutcome, StreamingEventConsumer,
    api::file_batch_status_path,
};

use crate::query_cache::QueryCache;

pub const ASSISTANTS_KEY: &str = "assistants";
pub const THREADS_KEY: &str = "threads";
pub const VECTOR_STORES_KEY: &str = "vector_stores";

/// Cache key of one thread's messages.
pub fn messages_key(thread_id: &str) -> String {
    format!("messages:{}", thread_id)
}

pub struct AssistantWorkspace {
    api: AssistantApi,
    events: Arc<StreamingEventConsumer>,
    cache: QueryCache,
}

impl AssistantWorkspace {
    pub fn new(api: AssistantApi, events: Arc<StreamingEventConsumer>, cache: QueryCache) -> Self {
        Self { api, events, cache }
    }

    pub fn api(&self) -> &AssistantApi {
        &self.api
    }

    /// Returns the cached value under `key` unless it is missing or stale.
    async fn cached<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        if self.cache.needs_refetch(key).await {
            return Ok(None);
        }
        self.cache.get(key).await
    }

    // ============================================================================
    // Assistants
    // ============================================================================

    pub async fn assistants(&self) -> Result<Vec<Assistant>> {
        if let Some(list) = self.cached(ASSISTANTS_KEY).await? {
            return Ok(list);
        }
        let list = self.api.list_assistants().await?;
        self.cache.set(ASSISTANTS_KEY, &list).await?;
        tracing::debug!("[Assistants] Loaded {} assistants", list.len());
        Ok(list)
    }

    pub async fn create_assistant(&self, params: &AssistantParams) -> Result<Assistant> {
        let created = self.api.create_assistant(params).await?;
        let appended = created.clone();
        self.cache
            .update(ASSISTANTS_KEY, |list: &mut Vec<Assistant>| list.push(appended))
            .await?;
        tracing::info!("[Assistants] Created assistant {}", created.id);
        Ok(created)
    }

    pub async fn update_assistant(&self, id: &str, params: &AssistantParams) -> Result<Assistant> {
        let updated = self.api.update_assistant(id, params).await?;
        let fresh = updated.clone();
        self.cache
            .update(ASSISTANTS_KEY, |list: &mut Vec<Assistant>| {
                if let Some(cached) = list.iter_mut().find(|a| a.id == fresh.id) {
                    *cached = fresh;
                }
            })
            .await?;
        Ok(updated)
    }

    pub async fn delete_assistant(&self, id: &str) -> Result<()> {
        self.api.delete_assistant(id).await?;
        self.cache
            .update(ASSISTANTS_KEY, |list: &mut Vec<Assistant>| {
                list.retain(|a| a.id != id)
            })
            .await?;
        tracing::info!("[Assistants] Deleted assistant {}", id);
        Ok(())
    }

    // ============================================================================
    // Threads and messages
    // ============================================================================

    pub async fn threads(&self) -> Result<Vec<Thread>> {
        if let Some(list) = self.cached(THREADS_KEY).await? {
            return Ok(list);
        }
        let list = self.api.list_threads().await?;
        self.cache.set(THREADS_KEY, &list).await?;
        Ok(list)
    }

    pub async fn create_thread(&self) -> Result<Thread> {
        let thread = self.api.create_thread().await?;
        let appended = thread.clone();
        let updated = self
            .cache
            .update(THREADS_KEY, |list: &mut Vec<Thread>| list.push(appended))
            .await?;
        if !updated {
            self.cache.set(THREADS_KEY, &vec![thread.clone()]).await?;
            self.cache.invalidate(THREADS_KEY).await;
        }
        Ok(thread)
    }

    pub async fn delete_thread(&self, id: &str) -> Result<()> {
        self.api.delete_thread(id).await?;
        self.cache
            .update(THREADS_KEY, |list: &mut Vec<Thread>| list.retain(|t| t.id != id))
            .await?;
        self.cache.remove(&messages_key(id)).await;
        Ok(())
    }

    pub async fn messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        let key = messages_key(thread_id);
        if let Some(list) = self.cached(&key).await? {
            return Ok(list);
        }
        let list = self.api.list_messages(thread_id).await?;
        self.cache.set(&key, &list).await?;
        Ok(list)
    }

    /// Posts a user message to a thread.
    ///
    /// A placeholder with a temporary id is shown in the cached thread while
    /// the request is in flight. On success it is replaced by the stored
    /// message; on failure it is removed again. Other messages in the thread,
    /// including placeholders of concurrent posts, are left alone.
    pub async fn post_message(&self, thread_id: &str, text: &str) -> Result<ThreadMessage> {
        let key = messages_key(thread_id);
        let body = NewThreadMessage::user_text(thread_id, text);
        let placeholder = ThreadMessage {
            id: MessageId::temporary().to_string(),
            thread_id: Some(thread_id.to_string()),
            role: body.role.clone(),
            content: body.content.clone(),
            created_at: Some(Utc::now().timestamp()),
            extra: Map::new(),
        };
        let placeholder_id = placeholder.id.clone();

        let shown = placeholder.clone();
        let was_cached = self
            .cache
            .update(&key, |list: &mut Vec<ThreadMessage>| list.push(shown))
            .await?;
        if !was_cached {
            // Only the placeholder is known; refetch the thread on next read.
            self.cache.set(&key, &vec![placeholder]).await?;
            self.cache.invalidate(&key).await;
        }

        let outcome = self.api.create_message(&body).await;
        let stored = outcome.as_ref().ok().cloned();
        self.cache
            .update(&key, |list: &mut Vec<ThreadMessage>| {
                list.retain(|m| m.id != placeholder_id);
                if let Some(stored) = stored {
                    list.push(stored);
                }
            })
            .await?;

        if let Err(e) = &outcome {
            tracing::error!("[Assistants] Message to thread {} failed: {}", thread_id, e);
        }
        outcome
    }

    // ============================================================================
    // Vector stores
    // ============================================================================

    pub async fn vector_stores(&self) -> Result<Vec<VectorStore>> {
        if let Some(list) = self.cached(VECTOR_STORES_KEY).await? {
            return Ok(list);
        }
        let list = self.api.list_vector_stores().await?;
        self.cache.set(VECTOR_STORES_KEY, &list).await?;
        Ok(list)
    }

    pub async fn create_vector_store(&self, params: &VectorStoreParams) -> Result<VectorStoreCreated> {
        let created = self.api.create_vector_store(params).await?;
        self.cache.invalidate(VECTOR_STORES_KEY).await;
        Ok(created)
    }

    pub async fn delete_vector_store(&self, id: &str) -> Result<()> {
        self.api.delete_vector_store(id).await?;
        self.cache
            .update(VECTOR_STORES_KEY, |list: &mut Vec<VectorStore>| {
                list.retain(|v| v.id != id)
            })
            .await?;
        Ok(())
    }

    /// Starts adding files to a vector store.
    pub async fn add_files(&self, vector_store_id: &str, file_ids: Vec<String>) -> Result<FileBatch> {
        let request = FileBatchRequest {
            vector_store_id: vector_store_id.to_string(),
            file_ids,
        };
        self.api.create_file_batch(&request).await
    }

    /// Follows an ingestion status stream until the server reports
    /// completion or the stream fails.
    ///
    /// The cached vector store list is marked stale once the stream ends
    /// either way, since file counts and status have moved on.
    pub async fn follow_ingestion<H>(&self, target: &str, handler: &mut H) -> Result<StreamOutcome>
    where
        H: EventStreamHandler,
    {
        let outcome = self.events.connect(target, handler).await?;
        self.cache.invalidate(VECTOR_STORES_KEY).await;
        Ok(outcome)
    }

    pub async fn generate(&self, kind: GenerationKind, prompt: &str) -> Result<GenerateResponse> {
        self.api.generate(kind, prompt).await
    }
}

/// Stream target of a file batch: the server's URL, or the known path.
pub fn file_batch_stream_target(batch: &FileBatch) -> String {
    batch
        .sse_url
        .clone()
        .unwrap_or_else(|| file_batch_status_path(&batch.vector_store_id, &batch.id))
}
