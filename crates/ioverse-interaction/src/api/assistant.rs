use ioverse_core::Result;
use ioverse_core::assistant::{
    Assistant, AssistantFile, AssistantParams, FileBatch, FileBatchRequest, GenerateRequest,
    GenerateResponse, GenerationKind, NewThreadMessage, Thread, ThreadMessage, ThreadParams,
    VectorStore, VectorStoreCreated, VectorStoreFile, VectorStoreParams,
};

use crate::pipeline::AuthenticatedClient;
use crate::transport::{ApiRequest, HttpMethod};

/// Messages are listed oldest first, one page of the server maximum.
const MESSAGE_LIST_QUERY: &str = "limit=100&order=asc";

/// Assistant workspace endpoints under `/assistant`.
#[derive(Clone)]
pub struct AssistantApi {
    client: AuthenticatedClient,
}

impl AssistantApi {
    pub fn new(client: AuthenticatedClient) -> Self {
        Self { client }
    }

    // ============================================================================
    // Assistants
    // ============================================================================

    pub async fn list_assistants(&self) -> Result<Vec<Assistant>> {
        self.client.get_json("/assistant/list/").await
    }

    pub async fn create_assistant(&self, params: &AssistantParams) -> Result<Assistant> {
        tracing::debug!("[AssistantApi] Creating assistant {:?}", params.name);
        self.client.post_json("/assistant/create/", params).await
    }

    pub async fn update_assistant(&self, id: &str, params: &AssistantParams) -> Result<Assistant> {
        let path = format!("/assistant/{}/update/", id);
        self.client.put_json(&path, params).await
    }

    pub async fn delete_assistant(&self, id: &str) -> Result<()> {
        self.client.delete(&format!("/assistant/{}/delete/", id)).await
    }

    // ============================================================================
    // Threads and messages
    // ============================================================================

    pub async fn list_threads(&self) -> Result<Vec<Thread>> {
        self.client.get_json("/assistant/thread/list/").await
    }

    /// Creates an empty thread. The request carries no body.
    pub async fn create_thread(&self) -> Result<Thread> {
        self.client
            .execute(ApiRequest::new(HttpMethod::Post, "/assistant/thread/create/"))
            .await?
            .json()
    }

    pub async fn update_thread(&self, id: &str, params: &ThreadParams) -> Result<Thread> {
        let path = format!("/assistant/thread/{}/update/", id);
        self.client.put_json(&path, params).await
    }

    pub async fn delete_thread(&self, id: &str) -> Result<()> {
        self.client
            .delete(&format!("/assistant/thread/{}/delete/", id))
            .await
    }

    pub async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        let path = format!("/assistant/message/{}/list/?{}", thread_id, MESSAGE_LIST_QUERY);
        self.client.get_json(&path).await
    }

    pub async fn create_message(&self, message: &NewThreadMessage) -> Result<ThreadMessage> {
        let path = format!("/assistant/message/{}/create/", message.thread_id);
        self.client.post_json(&path, message).await
    }

    // ============================================================================
    // Files and vector stores
    // ============================================================================

    pub async fn list_files(&self) -> Result<Vec<AssistantFile>> {
        self.client.get_json("/assistant/file/list/").await
    }

    pub async fn delete_file(&self, id: &str) -> Result<()> {
        self.client
            .delete(&format!("/assistant/file/{}/delete/", id))
            .await
    }

    pub async fn list_vector_stores(&self) -> Result<Vec<VectorStore>> {
        self.client.get_json("/assistant/vector_store/list/").await
    }

    pub async fn retrieve_vector_store(&self, id: &str) -> Result<VectorStore> {
        self.client
            .get_json(&format!("/assistant/vector_store/{}/retrieve/", id))
            .await
    }

    pub async fn create_vector_store(&self, params: &VectorStoreParams) -> Result<VectorStoreCreated> {
        self.client
            .post_json("/assistant/vector_store/create/", params)
            .await
    }

    pub async fn update_vector_store(
        &self,
        id: &str,
        params: &VectorStoreParams,
    ) -> Result<VectorStore> {
        let path = format!("/assistant/vector_store/{}/update/", id);
        self.client.put_json(&path, params).await
    }

    pub async fn delete_vector_store(&self, id: &str) -> Result<()> {
        self.client
            .delete(&format!("/assistant/vector_store/{}/delete/", id))
            .await
    }

    pub async fn list_vector_store_files(&self, vector_store_id: &str) -> Result<Vec<VectorStoreFile>> {
        let path = format!("/assistant/vector_store_file/{}/list/", vector_store_id);
        self.client.get_json(&path).await
    }

    /// Starts adding `file_ids` to a vector store. Follow the returned
    /// batch's status stream to learn when ingestion finishes.
    pub async fn create_file_batch(&self, request: &FileBatchRequest) -> Result<FileBatch> {
        tracing::debug!(
            "[AssistantApi] Adding {} files to vector store {}",
            request.file_ids.len(),
            request.vector_store_id
        );
        self.client
            .post_json("/assistant/vector_store_batch/create/", request)
            .await
    }

    // ============================================================================
    // Generation
    // ============================================================================

    /// Drafts instructions, a function tool or a response schema from `prompt`.
    pub async fn generate(&self, kind: GenerationKind, prompt: &str) -> Result<GenerateResponse> {
        let body = GenerateRequest {
            prompt: prompt.to_string(),
        };
        self.client.post_json(kind.path(), &body).await
    }
}

/// Status stream of a vector store that is ingesting files.
pub fn vector_store_status_path(vector_store_id: &str) -> String {
    format!("/assistant/vector_store/{}/status/", vector_store_id)
}

/// Status stream of a file batch; used when the server omits `sse_url`.
pub fn file_batch_status_path(vector_store_id: &str, batch_id: &str) -> String {
    format!(
        "/assistant/vector_store_batch/{}/{}/status/",
        vector_store_id, batch_id
    )
}
