//! Login lifecycle through a fully wired `SessionContext` with a scripted
//! HTTP transport.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use ioverse_application::{AuthStatus, CONVERSATIONS_KEY, SessionContext};
use ioverse_core::chat::ConversationList;
use ioverse_core::config::ClientConfig;
use ioverse_core::{IoverseError, Result};
use ioverse_infrastructure::{SessionCredentialStore, ThemePreferenceStore};
use ioverse_interaction::{ApiRequest, ApiResponse, HttpTransport};

fn jwt_expiring_in(seconds: i64) -> String {
    format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(format!(
            r#"{{"exp":{},"user_id":1}}"#,
            Utc::now().timestamp() + seconds
        ))
    )
}

/// Replies per request path, in order.
#[derive(Default)]
struct ScriptedHttp {
    replies: Mutex<HashMap<String, VecDeque<ApiResponse>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedHttp {
    fn on(&self, path: &str, status: u16, body: &str) {
        self.replies
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(ApiResponse::new(status, body));
    }

    fn calls_to(&self, path: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|p| *p == path).count()
    }
}

#[async_trait]
impl HttpTransport for ScriptedHttp {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.calls.lock().unwrap().push(request.path.clone());
        self.replies
            .lock()
            .unwrap()
            .get_mut(&request.path)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| IoverseError::network("connection refused"))
    }
}

struct Harness {
    _dir: TempDir,
    http: Arc<ScriptedHttp>,
    context: SessionContext,
}

fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let http = Arc::new(ScriptedHttp::default());
    let context = SessionContext::with_parts(
        ClientConfig::default(),
        Arc::new(SessionCredentialStore::new()),
        http.clone(),
        http.clone(),
        ThemePreferenceStore::new(dir.path().join("state.toml")),
    );
    Harness {
        _dir: dir,
        http,
        context,
    }
}

#[tokio::test]
async fn test_initialize_without_credentials_is_unauthenticated() {
    let h = harness();

    assert_eq!(h.context.auth().initialize().await, AuthStatus::Unauthenticated);
    assert!(h.context.tokens().credential().is_empty());
}

#[tokio::test]
async fn test_initialize_with_valid_access_token_is_authenticated() {
    let h = harness();
    let tokens = h.context.tokens();
    tokens.set_refresh_token(&jwt_expiring_in(86_400)).unwrap();
    tokens.set_access_token(&jwt_expiring_in(300)).unwrap();

    assert_eq!(h.context.auth().initialize().await, AuthStatus::Authenticated);
    assert_eq!(h.http.calls_to("/token/refresh/"), 0);
}

#[tokio::test]
async fn test_initialize_refreshes_expired_access_token() {
    let h = harness();
    let tokens = h.context.tokens();
    tokens.set_refresh_token(&jwt_expiring_in(86_400)).unwrap();
    tokens.set_access_token(&jwt_expiring_in(-10)).unwrap();
    let fresh = jwt_expiring_in(300);
    h.http
        .on("/token/refresh/", 200, &format!(r#"{{"access": "{}"}}"#, fresh));

    assert_eq!(h.context.auth().initialize().await, AuthStatus::Authenticated);
    assert_eq!(tokens.access_token(), Some(fresh));
}

#[tokio::test]
async fn test_initialize_with_failed_refresh_clears_credentials() {
    let h = harness();
    let tokens = h.context.tokens();
    tokens.set_refresh_token(&jwt_expiring_in(86_400)).unwrap();
    tokens.set_access_token(&jwt_expiring_in(-10)).unwrap();
    h.http.on("/token/refresh/", 401, r#"{"detail": "Token is blacklisted"}"#);

    assert_eq!(h.context.auth().initialize().await, AuthStatus::Unauthenticated);
    assert!(tokens.credential().is_empty());
}

#[tokio::test]
async fn test_logout_clears_tokens_cache_and_view_state() {
    let h = harness();
    h.http.on(
        "/token/",
        200,
        &format!(
            r#"{{"access": "{}", "refresh": "{}"}}"#,
            jwt_expiring_in(300),
            jwt_expiring_in(86_400)
        ),
    );
    let auth = h.context.auth();
    auth.login("alice", "secret", Some(true)).await.unwrap();
    assert_eq!(auth.status(), AuthStatus::Authenticated);

    h.context
        .cache()
        .set(CONVERSATIONS_KEY, &ConversationList::default())
        .await
        .unwrap();
    h.context.chat_state().set_active_conversation(Some(3)).await;

    auth.logout().await;

    assert_eq!(auth.status(), AuthStatus::Unauthenticated);
    assert!(h.context.tokens().credential().is_empty());
    assert!(h.context.cache().snapshot(CONVERSATIONS_KEY).await.is_none());
    assert_eq!(h.context.chat_state().active_conversation().await, None);
}

#[tokio::test]
async fn test_login_with_missing_refresh_token_fails() {
    let h = harness();
    h.http.on(
        "/token/",
        200,
        &format!(r#"{{"access": "{}"}}"#, jwt_expiring_in(300)),
    );

    let err = h
        .context
        .auth()
        .login("alice", "secret", None)
        .await
        .unwrap_err();

    assert!(err.is_authentication());
    assert_eq!(h.context.auth().status(), AuthStatus::Unauthenticated);
    assert!(h.context.tokens().credential().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_session_ends_when_refresh_token_expires() {
    let h = harness();
    h.http.on(
        "/token/",
        200,
        &format!(
            r#"{{"access": "{}", "refresh": "{}"}}"#,
            jwt_expiring_in(60),
            jwt_expiring_in(120)
        ),
    );
    let auth = h.context.auth();
    let mut status = auth.subscribe();
    auth.login("alice", "secret", None).await.unwrap();

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(auth.status(), AuthStatus::Authenticated);

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(auth.status(), AuthStatus::Unauthenticated);
    assert_eq!(*status.borrow_and_update(), AuthStatus::Unauthenticated);
    assert!(h.context.tokens().credential().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rescheduling_replaces_previous_timer() {
    let h = harness();
    let tokens = h.context.tokens();
    tokens.set_refresh_token(&jwt_expiring_in(30)).unwrap();
    tokens.set_access_token(&jwt_expiring_in(30)).unwrap();
    let auth = h.context.auth();
    assert_eq!(auth.initialize().await, AuthStatus::Authenticated);

    // A new login extends the session; the first timer must not fire.
    tokens.set_refresh_token(&jwt_expiring_in(600)).unwrap();
    auth.schedule_logout().await;

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(auth.status(), AuthStatus::Authenticated);
    assert!(tokens.refresh_token().is_some());
}
