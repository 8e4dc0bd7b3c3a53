use async_trait::async_trait;

use ioverse_core::Result;
use ioverse_core::chat::{
    ChatBackend, Conversation, ConversationList, RenameConversationRequest, SendMessageRequest,
    SendMessageResponse,
};

use crate::pipeline::AuthenticatedClient;
use crate::transport::ApiRequest;

const CONVERSATIONS_PATH: &str = "/chatbot/conversations";
const SEND_PATH: &str = "/chatbot/send";

/// Chat endpoints under `/chatbot`.
#[derive(Clone)]
pub struct ChatApi {
    client: AuthenticatedClient,
}

impl ChatApi {
    pub fn new(client: AuthenticatedClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &AuthenticatedClient {
        &self.client
    }

    /// Fetches a conversation published through a share link.
    ///
    /// Public endpoint; no bearer token is attached.
    pub async fn shared_conversation(&self, share_token: &str) -> Result<Conversation> {
        let path = format!("/chatbot/shared/{}", share_token);
        self.client
            .execute_public(ApiRequest::get(path))
            .await?
            .json()
    }
}

#[async_trait]
impl ChatBackend for ChatApi {
    async fn list_conversations(&self) -> Result<ConversationList> {
        self.client.get_json(CONVERSATIONS_PATH).await
    }

    async fn get_conversation(&self, id: i64) -> Result<Conversation> {
        let path = format!("{}/{}", CONVERSATIONS_PATH, id);
        self.client.get_json(&path).await
    }

    async fn send_message(&self, request: &SendMessageRequest) -> Result<SendMessageResponse> {
        tracing::debug!(
            "[ChatApi] Sending message (conversation: {:?})",
            request.conversation_id
        );
        self.client.post_json(SEND_PATH, request).await
    }

    async fn rename_conversation(&self, id: i64, new_title: &str) -> Result<()> {
        let path = format!("{}/{}/rename/", CONVERSATIONS_PATH, id);
        let body = RenameConversationRequest {
            new_title: new_title.to_string(),
        };
        self.client.patch(&path, &body).await
    }

    async fn delete_conversation(&self, id: i64) -> Result<()> {
        let path = format!("{}/{}/", CONVERSATIONS_PATH, id);
        self.client.delete(&path).await
    }
}
