//! Explicitly constructed per-session object graph.
//!
//! One `SessionContext` owns the credential store, the request pipeline, the
//! query cache and the coordinators that write to it. Nothing here is global;
//! two contexts never share state.

use std::sync::Arc;

use ioverse_core::Result;
use ioverse_core::auth::CredentialStore;
use ioverse_core::chat::ChatBackend;
use ioverse_core::config::ClientConfig;
use ioverse_infrastructure::{DualCredentialStore, IoversePaths, ThemePreferenceStore};
use ioverse_interaction::{
    AccountApi, AssistantApi, AuthenticatedClient, ChatApi, HttpTransport, ReqwestTransport,
    StreamingEventConsumer, TokenManager,
};

use crate::assistants::AssistantWorkspace;
use crate::auth_session::AuthSession;
use crate::chat_send::ChatSendCoordinator;
use crate::chat_state::ChatState;
use crate::conversations::ConversationService;
use crate::query_cache::QueryCache;

pub struct SessionContext {
    config: ClientConfig,
    tokens: Arc<TokenManager>,
    chat_api: ChatApi,
    account: AccountApi,
    events: Arc<StreamingEventConsumer>,
    cache: QueryCache,
    state: ChatState,
    chat_send: ChatSendCoordinator,
    conversations: ConversationService,
    assistants: AssistantWorkspace,
    auth: AuthSession,
    theme: ThemePreferenceStore,
}

impl SessionContext {
    /// Wires a context talking to the configured backend over HTTP.
    pub fn new(config: ClientConfig, paths: &IoversePaths) -> Result<Self> {
        let state_file = paths.state_file()?;
        let store = Arc::new(DualCredentialStore::new(state_file.clone(), config.storage));
        let api = Arc::new(ReqwestTransport::new(
            config.api_base_url.clone(),
            config.request_timeout(),
        )?);
        let domain = Arc::new(ReqwestTransport::new(
            config.domain_base_url.clone(),
            config.request_timeout(),
        )?);

        Ok(Self::with_parts(
            config,
            store,
            api,
            domain,
            ThemePreferenceStore::new(state_file),
        ))
    }

    /// Wires a context from explicit collaborators.
    pub fn with_parts(
        config: ClientConfig,
        store: Arc<dyn CredentialStore>,
        api: Arc<dyn HttpTransport>,
        domain: Arc<dyn HttpTransport>,
        theme: ThemePreferenceStore,
    ) -> Self {
        let tokens = Arc::new(TokenManager::new(store, api.clone()));
        let client = AuthenticatedClient::new(tokens.clone(), api);
        let chat_api = ChatApi::new(client.clone());
        let assistant_api = AssistantApi::new(client.clone());
        let account = AccountApi::new(client, domain);
        let events = Arc::new(StreamingEventConsumer::new(
            tokens.clone(),
            config.api_base_url.clone(),
        ));

        let cache = QueryCache::new();
        let state = ChatState::new();
        let backend: Arc<dyn ChatBackend> = Arc::new(chat_api.clone());
        let chat_send = ChatSendCoordinator::new(backend.clone(), cache.clone(), state.clone());
        let conversations = ConversationService::new(backend, cache.clone(), state.clone());
        let assistants = AssistantWorkspace::new(assistant_api, events.clone(), cache.clone());
        let auth = AuthSession::new(tokens.clone(), account.clone(), cache.clone(), state.clone());

        Self {
            config,
            tokens,
            chat_api,
            account,
            events,
            cache,
            state,
            chat_send,
            conversations,
            assistants,
            auth,
            theme,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    pub fn chat_api(&self) -> &ChatApi {
        &self.chat_api
    }

    pub fn account(&self) -> &AccountApi {
        &self.account
    }

    pub fn events(&self) -> &StreamingEventConsumer {
        &self.events
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn chat_state(&self) -> &ChatState {
        &self.state
    }

    pub fn chat_send(&self) -> &ChatSendCoordinator {
        &self.chat_send
    }

    pub fn conversations(&self) -> &ConversationService {
        &self.conversations
    }

    pub fn assistants(&self) -> &AssistantWorkspace {
        &self.assistants
    }

    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    pub fn theme(&self) -> &ThemePreferenceStore {
        &self.theme
    }
}
