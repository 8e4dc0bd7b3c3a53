//! Optimistic send and conversation list patching against a gated fake
//! backend, so the cache can be inspected while a send is in flight.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, Semaphore, mpsc};

use ioverse_application::{
    CONVERSATIONS_KEY, ChatSendCoordinator, ChatState, ConversationService, QueryCache,
};
use ioverse_core::chat::{
    ChatBackend, Conversation, ConversationList, Message, MessageId, SendMessageRequest,
    SendMessageResponse, Sender,
};
use ioverse_core::{ErrorKind, IoverseError, Result};

struct FakeChat {
    replies: Mutex<VecDeque<Result<SendMessageResponse>>>,
    listing: Mutex<ConversationList>,
    /// Sends wait here for a permit; zero permits means "in flight".
    gate: Semaphore,
    sent: mpsc::UnboundedSender<SendMessageRequest>,
    list_calls: AtomicUsize,
    renamed: Mutex<Vec<(i64, String)>>,
    deleted: Mutex<Vec<i64>>,
}

impl FakeChat {
    fn new(gated: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<SendMessageRequest>) {
        let (sent, rx) = mpsc::unbounded_channel();
        let permits = if gated { 0 } else { Semaphore::MAX_PERMITS };
        let fake = Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            listing: Mutex::new(ConversationList::default()),
            gate: Semaphore::new(permits),
            sent,
            list_calls: AtomicUsize::new(0),
            renamed: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        });
        (fake, rx)
    }

    async fn reply(&self, reply: Result<SendMessageResponse>) {
        self.replies.lock().await.push_back(reply);
    }

    async fn set_listing(&self, listing: ConversationList) {
        *self.listing.lock().await = listing;
    }

    fn release(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl ChatBackend for FakeChat {
    async fn list_conversations(&self) -> Result<ConversationList> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.listing.lock().await.clone())
    }

    async fn get_conversation(&self, id: i64) -> Result<Conversation> {
        self.listing
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| IoverseError::not_found("Conversation", id.to_string()))
    }

    async fn send_message(&self, request: &SendMessageRequest) -> Result<SendMessageResponse> {
        let _ = self.sent.send(request.clone());
        self.gate
            .acquire()
            .await
            .map_err(|e| IoverseError::internal(e.to_string()))?
            .forget();
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(IoverseError::network("no scripted reply")))
    }

    async fn rename_conversation(&self, id: i64, new_title: &str) -> Result<()> {
        self.renamed.lock().await.push((id, new_title.to_string()));
        Ok(())
    }

    async fn delete_conversation(&self, id: i64) -> Result<()> {
        self.deleted.lock().await.push(id);
        Ok(())
    }
}

fn message(id: i64, conversation_id: i64, body: &str, sender: Sender) -> Message {
    Message {
        id: MessageId::Durable(id),
        conversation_id: Some(conversation_id),
        message_body: body.to_string(),
        sender,
        timestamp: "2024-05-01T10:00:00Z".to_string(),
    }
}

fn pair(user_id: i64, conversation_id: i64, body: &str) -> SendMessageResponse {
    SendMessageResponse {
        user_message: message(user_id, conversation_id, body, Sender::User),
        ai_message: message(user_id + 1, conversation_id, "reply", Sender::Assistant),
    }
}

fn conversation(id: i64, messages: Vec<Message>) -> Conversation {
    Conversation {
        id,
        title: Some(format!("Conversation {}", id)),
        messages,
        created_at: None,
        updated_at: None,
    }
}

struct Fixture {
    backend: Arc<FakeChat>,
    sent: mpsc::UnboundedReceiver<SendMessageRequest>,
    cache: QueryCache,
    state: ChatState,
    coordinator: Arc<ChatSendCoordinator>,
}

async fn fixture(gated: bool, cached: Option<ConversationList>) -> Fixture {
    let (backend, sent) = FakeChat::new(gated);
    let cache = QueryCache::new();
    if let Some(list) = cached {
        cache.set(CONVERSATIONS_KEY, &list).await.unwrap();
    }
    let state = ChatState::new();
    let coordinator = Arc::new(ChatSendCoordinator::new(
        backend.clone(),
        cache.clone(),
        state.clone(),
    ));
    Fixture {
        backend,
        sent,
        cache,
        state,
        coordinator,
    }
}

async fn cached_messages(cache: &QueryCache, id: i64) -> Vec<Message> {
    let list: ConversationList = cache.get(CONVERSATIONS_KEY).await.unwrap().unwrap();
    list.get(id).unwrap().messages.clone()
}

#[tokio::test]
async fn test_send_applies_optimistic_message_then_commits_durable_pair() {
    let mut f = fixture(
        true,
        Some(ConversationList {
            results: vec![conversation(1, vec![])],
        }),
    )
    .await;
    f.backend.reply(Ok(pair(10, 1, "hi"))).await;

    let coordinator = f.coordinator.clone();
    let task = tokio::spawn(async move { coordinator.send(Some(1), "hi").await });

    let request = f.sent.recv().await.unwrap();
    assert_eq!(request.message_body, "hi");
    assert_eq!(request.conversation_id, Some(1));

    // Applied
    let in_flight = cached_messages(&f.cache, 1).await;
    assert_eq!(in_flight.len(), 1);
    assert!(in_flight[0].id.is_temporary());
    assert_eq!(in_flight[0].sender, Sender::User);
    assert_eq!(in_flight[0].message_body, "hi");
    assert!(f.state.snapshot().await.typing);

    // Committed
    f.backend.release();
    task.await.unwrap().unwrap();

    let committed = cached_messages(&f.cache, 1).await;
    let ids: Vec<_> = committed.iter().map(|m| m.id.clone()).collect();
    assert_eq!(ids, vec![MessageId::Durable(10), MessageId::Durable(11)]);
    assert_eq!(committed[0].sender, Sender::User);
    assert_eq!(committed[1].sender, Sender::Assistant);

    let view = f.state.snapshot().await;
    assert!(!view.typing);
    assert_eq!(view.last_error, None);
}

#[tokio::test]
async fn test_failed_send_restores_snapshot_and_records_error() {
    let f = fixture(
        false,
        Some(ConversationList {
            results: vec![conversation(1, vec![])],
        }),
    )
    .await;
    let before = f.cache.snapshot(CONVERSATIONS_KEY).await;
    f.backend
        .reply(Err(IoverseError::http(503, "Model is overloaded")))
        .await;

    let err = f.coordinator.send(Some(1), "hi").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Http);
    assert_eq!(f.cache.snapshot(CONVERSATIONS_KEY).await, before);
    assert!(cached_messages(&f.cache, 1).await.is_empty());

    let view = f.state.snapshot().await;
    assert!(!view.typing);
    assert_eq!(view.last_error.as_deref(), Some("Model is overloaded"));
}

#[tokio::test]
async fn test_first_message_uses_pending_slot_and_refetches_list() {
    let mut f = fixture(true, Some(ConversationList::default())).await;
    f.backend.reply(Ok(pair(20, 5, "hello"))).await;
    f.backend
        .set_listing(ConversationList {
            results: vec![conversation(
                5,
                vec![
                    message(20, 5, "hello", Sender::User),
                    message(21, 5, "reply", Sender::Assistant),
                ],
            )],
        })
        .await;

    let coordinator = f.coordinator.clone();
    let task = tokio::spawn(async move { coordinator.send(None, "hello").await });
    f.sent.recv().await.unwrap();

    let pending = f.state.pending_first_message().await.unwrap();
    assert!(pending.id.is_temporary());
    assert_eq!(pending.message_body, "hello");
    let list: ConversationList = f.cache.get(CONVERSATIONS_KEY).await.unwrap().unwrap();
    assert!(list.results.is_empty());

    f.backend.release();
    let response = task.await.unwrap().unwrap();
    assert_eq!(response.conversation_id(), Some(5));

    let view = f.state.snapshot().await;
    assert_eq!(view.pending_first_message, None);
    assert_eq!(view.active_conversation, Some(5));
    assert!(!view.typing);
    assert_eq!(f.backend.list_calls.load(Ordering::SeqCst), 1);
    assert!(!f.cache.needs_refetch(CONVERSATIONS_KEY).await);
    assert_eq!(cached_messages(&f.cache, 5).await.len(), 2);
}

#[tokio::test]
async fn test_failed_first_message_clears_pending_slot() {
    let f = fixture(false, None).await;
    f.backend
        .reply(Err(IoverseError::network("connection reset")))
        .await;

    let err = f.coordinator.send(None, "hello").await.unwrap_err();

    assert!(err.is_retryable());
    let view = f.state.snapshot().await;
    assert_eq!(view.pending_first_message, None);
    assert_eq!(
        view.last_error.as_deref(),
        Some("Could not reach the server. Please try again.")
    );
    assert!(f.cache.snapshot(CONVERSATIONS_KEY).await.is_none());
}

#[tokio::test]
async fn test_sends_to_one_conversation_are_serialized() {
    let mut f = fixture(
        true,
        Some(ConversationList {
            results: vec![conversation(1, vec![])],
        }),
    )
    .await;
    f.backend.reply(Ok(pair(10, 1, "first"))).await;
    f.backend.reply(Ok(pair(12, 1, "second"))).await;

    let first = {
        let coordinator = f.coordinator.clone();
        tokio::spawn(async move { coordinator.send(Some(1), "first").await })
    };
    let second = {
        let coordinator = f.coordinator.clone();
        tokio::spawn(async move { coordinator.send(Some(1), "second").await })
    };

    f.sent.recv().await.unwrap();
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    // Only the send holding the conversation has applied its message.
    assert_eq!(cached_messages(&f.cache, 1).await.len(), 1);
    assert!(f.sent.try_recv().is_err());

    f.backend.release();
    f.sent.recv().await.unwrap();
    let in_flight = cached_messages(&f.cache, 1).await;
    assert_eq!(in_flight.len(), 3);
    assert!(in_flight[2].id.is_temporary());

    f.backend.release();
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    let ids: Vec<_> = cached_messages(&f.cache, 1)
        .await
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(
        ids,
        vec![
            MessageId::Durable(10),
            MessageId::Durable(11),
            MessageId::Durable(12),
            MessageId::Durable(13)
        ]
    );
}

fn two_conversations() -> Option<ConversationList> {
    Some(ConversationList {
        results: vec![conversation(1, vec![]), conversation(2, vec![])],
    })
}

fn spawn_send(
    coordinator: &Arc<ChatSendCoordinator>,
    conversation_id: i64,
    body: &'static str,
) -> tokio::task::JoinHandle<Result<SendMessageResponse>> {
    let coordinator = coordinator.clone();
    tokio::spawn(async move { coordinator.send(Some(conversation_id), body).await })
}

#[tokio::test]
async fn test_sends_to_different_conversations_run_concurrently() {
    let mut f = fixture(true, two_conversations()).await;
    f.backend.reply(Ok(pair(20, 2, "to two"))).await;
    f.backend.reply(Ok(pair(10, 1, "to one"))).await;

    let to_two = spawn_send(&f.coordinator, 2, "to two");
    f.sent.recv().await.unwrap();
    let to_one = spawn_send(&f.coordinator, 1, "to one");
    f.sent.recv().await.unwrap();

    // Both are in flight at once.
    assert!(cached_messages(&f.cache, 1).await[0].id.is_temporary());
    assert!(cached_messages(&f.cache, 2).await[0].id.is_temporary());

    f.backend.release();
    f.backend.release();
    to_two.await.unwrap().unwrap();
    to_one.await.unwrap().unwrap();

    let ids = |messages: Vec<Message>| messages.into_iter().map(|m| m.id).collect::<Vec<_>>();
    assert_eq!(
        ids(cached_messages(&f.cache, 1).await),
        vec![MessageId::Durable(10), MessageId::Durable(11)]
    );
    assert_eq!(
        ids(cached_messages(&f.cache, 2).await),
        vec![MessageId::Durable(20), MessageId::Durable(21)]
    );
}

#[tokio::test]
async fn test_rollback_leaves_other_conversation_commits_intact() {
    let mut f = fixture(true, two_conversations()).await;
    f.backend.reply(Ok(pair(20, 2, "to two"))).await;
    f.backend
        .reply(Err(IoverseError::http(503, "Model is overloaded")))
        .await;

    let to_two = spawn_send(&f.coordinator, 2, "to two");
    f.sent.recv().await.unwrap();
    let to_one = spawn_send(&f.coordinator, 1, "to one");
    f.sent.recv().await.unwrap();

    // Conversation 2 commits while the send to conversation 1 is in flight.
    f.backend.release();
    to_two.await.unwrap().unwrap();
    assert!(cached_messages(&f.cache, 1).await[0].id.is_temporary());

    f.backend.release();
    to_one.await.unwrap().unwrap_err();

    assert!(cached_messages(&f.cache, 1).await.is_empty());
    let committed: Vec<_> = cached_messages(&f.cache, 2)
        .await
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(
        committed,
        vec![MessageId::Durable(20), MessageId::Durable(21)]
    );
    assert_eq!(
        f.state.snapshot().await.last_error.as_deref(),
        Some("Model is overloaded")
    );
}

#[tokio::test]
async fn test_blank_message_is_rejected_without_dispatch() {
    let mut f = fixture(false, None).await;

    let err = f.coordinator.send(Some(1), "   ").await.unwrap_err();

    assert_eq!(
        err.validation_errors().unwrap().field("message_body"),
        ["This field may not be blank."]
    );
    assert!(f.sent.try_recv().is_err());
    assert!(!f.state.snapshot().await.typing);
}

#[tokio::test]
async fn test_delete_filters_cached_list_and_clears_active() {
    let f = fixture(
        false,
        Some(ConversationList {
            results: vec![conversation(1, vec![]), conversation(2, vec![])],
        }),
    )
    .await;
    let service = ConversationService::new(f.backend.clone(), f.cache.clone(), f.state.clone());
    f.state.set_active_conversation(Some(2)).await;

    service.delete(2).await.unwrap();

    let list = service.conversations().await.unwrap();
    assert_eq!(list.results.len(), 1);
    assert!(list.contains(1));
    assert_eq!(f.state.active_conversation().await, None);
    assert_eq!(*f.backend.deleted.lock().await, vec![2]);
    assert_eq!(f.backend.list_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rename_patches_cached_title() {
    let f = fixture(
        false,
        Some(ConversationList {
            results: vec![conversation(1, vec![])],
        }),
    )
    .await;
    let service = ConversationService::new(f.backend.clone(), f.cache.clone(), f.state.clone());

    service.rename(1, "  Trip planning ").await.unwrap();

    let list = service.conversations().await.unwrap();
    assert_eq!(list.get(1).unwrap().title.as_deref(), Some("Trip planning"));
    assert_eq!(
        *f.backend.renamed.lock().await,
        vec![(1, "Trip planning".to_string())]
    );
}

#[tokio::test]
async fn test_stale_list_is_refetched() {
    let f = fixture(false, None).await;
    f.backend
        .set_listing(ConversationList {
            results: vec![conversation(3, vec![])],
        })
        .await;
    let service = ConversationService::new(f.backend.clone(), f.cache.clone(), f.state.clone());

    service.conversations().await.unwrap();
    service.conversations().await.unwrap();
    assert_eq!(f.backend.list_calls.load(Ordering::SeqCst), 1);

    f.cache.invalidate(CONVERSATIONS_KEY).await;
    let list = service.conversations().await.unwrap();
    assert!(list.contains(3));
    assert_eq!(f.backend.list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_open_replaces_cached_conversation_and_activates_it() {
    let f = fixture(
        false,
        Some(ConversationList {
            results: vec![conversation(1, vec![])],
        }),
    )
    .await;
    f.backend
        .set_listing(ConversationList {
            results: vec![conversation(1, vec![message(10, 1, "hi", Sender::User)])],
        })
        .await;
    let service = ConversationService::new(f.backend.clone(), f.cache.clone(), f.state.clone());

    let opened = service.open(1).await.unwrap();

    assert_eq!(opened.messages.len(), 1);
    assert_eq!(cached_messages(&f.cache, 1).await.len(), 1);
    assert_eq!(f.state.active_conversation().await, Some(1));
}
