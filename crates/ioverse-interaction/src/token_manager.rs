//! Single source of truth for session credentials.
//!
//! Expiry checks never fail: anything that cannot be decoded counts as
//! expired. A refresh that fails for any reason clears the whole session so
//! later calls go down the "log in again" path.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

use ioverse_core::auth::{
    Credential, CredentialStore, RefreshRequest, RefreshResponse, StorageDurability, TokenClaims,
    TokenKind, TokenPair, is_token_expired,
};
use ioverse_core::{IoverseError, Result};

use crate::transport::{ApiRequest, HttpTransport};

pub const REFRESH_PATH: &str = "/token/refresh/";

pub struct TokenManager {
    store: Arc<dyn CredentialStore>,
    transport: Arc<dyn HttpTransport>,
    /// Serializes refreshes so concurrent 401s do not race on the store.
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    pub fn new(store: Arc<dyn CredentialStore>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            store,
            transport,
            refresh_lock: Mutex::new(()),
        }
    }

    fn read(&self, kind: TokenKind) -> Option<String> {
        match self.store.get(kind) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!("[TokenManager] Failed to read {} token: {}", kind, e);
                None
            }
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(TokenKind::Access)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(TokenKind::Refresh)
    }

    pub fn credential(&self) -> Credential {
        Credential {
            access_token: self.access_token(),
            refresh_token: self.refresh_token(),
        }
    }

    /// True when the access token is absent, undecodable, lacks an expiry, or
    /// has expired.
    pub fn is_access_token_invalid(&self) -> bool {
        is_token_expired(self.access_token().as_deref(), Utc::now())
    }

    /// Same rule as [`Self::is_access_token_invalid`] for the refresh token.
    pub fn is_refresh_token_invalid(&self) -> bool {
        is_token_expired(self.refresh_token().as_deref(), Utc::now())
    }

    pub fn access_token_expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry_of(TokenKind::Access)
    }

    pub fn refresh_token_expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry_of(TokenKind::Refresh)
    }

    fn expiry_of(&self, kind: TokenKind) -> Option<DateTime<Utc>> {
        let token = self.read(kind)?;
        match TokenClaims::decode(&token) {
            Ok(claims) => claims.expires_at(),
            Err(e) => {
                tracing::warn!("[TokenManager] Failed to decode {} token: {}", kind, e);
                None
            }
        }
    }

    /// Mints a new access token from the stored refresh token.
    ///
    /// Returns `false` (after clearing all credentials) when no refresh token
    /// exists or the backend call fails in any way. Callers that queued
    /// behind a refresh which already replaced their token reuse its result.
    pub async fn refresh_access_token(&self) -> bool {
        let seen = self.access_token();
        let _guard = self.refresh_lock.lock().await;

        if self.access_token() != seen && !self.is_access_token_invalid() {
            tracing::debug!("[TokenManager] Access token already refreshed by another caller");
            return true;
        }

        let Some(refresh) = self.refresh_token() else {
            tracing::warn!("[TokenManager] No refresh token available. User needs to log in.");
            self.clear_tokens();
            return false;
        };

        match self.request_new_access_token(refresh).await {
            Ok(access) => match self.set_access_token(&access) {
                Ok(()) => {
                    tracing::info!("[TokenManager] Access token refreshed");
                    true
                }
                Err(e) => {
                    tracing::error!("[TokenManager] Failed to store refreshed token: {}", e);
                    self.clear_tokens();
                    false
                }
            },
            Err(e) => {
                tracing::error!("[TokenManager] Failed to refresh access token: {}", e);
                self.clear_tokens();
                false
            }
        }
    }

    async fn request_new_access_token(&self, refresh: String) -> Result<String> {
        // Refresh calls carry the refresh token in the body, never a bearer.
        let request = ApiRequest::post(REFRESH_PATH, &RefreshRequest { refresh })?;
        let response = self.transport.execute(request).await?.error_for_status()?;
        let body: RefreshResponse = response.json()?;

        if body.access.is_empty() {
            return Err(IoverseError::authentication(
                "Refresh endpoint returned an empty access token",
            ));
        }
        Ok(body.access)
    }

    /// Stores a new access token. Empty input is ignored.
    pub fn set_access_token(&self, token: &str) -> Result<()> {
        if token.is_empty() {
            return Ok(());
        }
        self.store.set(TokenKind::Access, token)
    }

    /// Stores a new refresh token. Empty input is ignored.
    pub fn set_refresh_token(&self, token: &str) -> Result<()> {
        if token.is_empty() {
            return Ok(());
        }
        self.store.set(TokenKind::Refresh, token)
    }

    /// Stores the tokens returned by a successful login.
    ///
    /// A pair missing either token is rejected and leaves the session cleared.
    pub fn store_token_pair(
        &self,
        pair: &TokenPair,
        durability: Option<StorageDurability>,
    ) -> Result<()> {
        let (Some(access), Some(refresh)) = (
            pair.access.as_deref().filter(|t| !t.is_empty()),
            pair.refresh.as_deref().filter(|t| !t.is_empty()),
        ) else {
            self.clear_tokens();
            return Err(IoverseError::authentication(
                "Invalid credentials: Tokens not received.",
            ));
        };

        if let Some(durability) = durability {
            self.store.set_durability(durability)?;
        }
        // Replace both tokens; clear first so no stale copy survives in the
        // store of the other durability.
        self.store.clear()?;
        self.set_refresh_token(refresh)?;
        self.set_access_token(access)
    }

    /// Removes both tokens. Safe to call repeatedly.
    pub fn clear_tokens(&self) {
        if let Err(e) = self.store.clear() {
            tracing::error!("[TokenManager] Failed to clear credentials: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ApiResponse;
    use async_trait::async_trait;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::Duration;
    use ioverse_infrastructure::SessionCredentialStore;
    use std::sync::Mutex as StdMutex;

    fn jwt(exp: i64) -> String {
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256"}"#),
            URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{}}}"#, exp))
        )
    }

    fn valid_jwt() -> String {
        jwt((Utc::now() + Duration::hours(1)).timestamp())
    }

    fn expired_jwt() -> String {
        jwt((Utc::now() - Duration::hours(1)).timestamp())
    }

    /// Replays scripted refresh results and records every request.
    struct ScriptedTransport {
        responses: StdMutex<Vec<Result<ApiResponse>>>,
        requests: StdMutex<Vec<ApiRequest>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<ApiResponse>>) -> Arc<Self> {
            Arc::new(Self {
                responses: StdMutex::new(responses.into_iter().rev().collect()),
                requests: StdMutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
            self.requests.lock().unwrap().push(request);
            tokio::task::yield_now().await;
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(IoverseError::network("no scripted response")))
        }
    }

    fn manager(transport: Arc<ScriptedTransport>) -> (TokenManager, Arc<SessionCredentialStore>) {
        let store = Arc::new(SessionCredentialStore::new());
        (TokenManager::new(store.clone(), transport), store)
    }

    #[test]
    fn test_invalid_checks_follow_expiry() {
        let (tokens, _) = manager(ScriptedTransport::new(vec![]));

        assert!(tokens.is_access_token_invalid());
        assert!(tokens.is_refresh_token_invalid());

        tokens.set_access_token(&valid_jwt()).unwrap();
        tokens.set_refresh_token(&expired_jwt()).unwrap();
        assert!(!tokens.is_access_token_invalid());
        assert!(tokens.is_refresh_token_invalid());

        tokens.set_access_token("garbage").unwrap();
        assert!(tokens.is_access_token_invalid());
    }

    #[test]
    fn test_setters_ignore_empty_values() {
        let (tokens, _) = manager(ScriptedTransport::new(vec![]));
        tokens.set_access_token("A1").unwrap();
        tokens.set_access_token("").unwrap();

        assert_eq!(tokens.access_token().as_deref(), Some("A1"));
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_clears_and_fails() {
        let transport = ScriptedTransport::new(vec![]);
        let (tokens, _) = manager(transport.clone());
        tokens.set_access_token("A1").unwrap();

        assert!(!tokens.refresh_access_token().await);
        assert!(tokens.credential().is_empty());

        // Idempotent
        assert!(!tokens.refresh_access_token().await);
        assert!(tokens.credential().is_empty());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_success_replaces_access_only() {
        let transport = ScriptedTransport::new(vec![Ok(ApiResponse::new(
            200,
            r#"{"access": "T2"}"#,
        ))]);
        let (tokens, _) = manager(transport.clone());
        let refresh = valid_jwt();
        tokens.set_refresh_token(&refresh).unwrap();
        tokens.set_access_token("T1").unwrap();

        assert!(tokens.refresh_access_token().await);
        assert_eq!(tokens.access_token().as_deref(), Some("T2"));
        assert_eq!(tokens.refresh_token(), Some(refresh.clone()));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, REFRESH_PATH);
        assert_eq!(requests[0].bearer, None);
        assert_eq!(
            requests[0].body,
            Some(serde_json::json!({ "refresh": refresh }))
        );
    }

    #[tokio::test]
    async fn test_refresh_server_error_clears_session() {
        let transport = ScriptedTransport::new(vec![Ok(ApiResponse::new(
            401,
            r#"{"detail": "Token is blacklisted"}"#,
        ))]);
        let (tokens, _) = manager(transport);
        tokens.set_refresh_token(&valid_jwt()).unwrap();
        tokens.set_access_token("T1").unwrap();

        assert!(!tokens.refresh_access_token().await);
        assert!(tokens.credential().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_transport_error_clears_session() {
        let transport =
            ScriptedTransport::new(vec![Err(IoverseError::network("connection refused"))]);
        let (tokens, _) = manager(transport);
        tokens.set_refresh_token(&valid_jwt()).unwrap();

        assert!(!tokens.refresh_access_token().await);
        assert!(tokens.refresh_token().is_none());
    }

    #[test]
    fn test_store_token_pair_requires_both_tokens() {
        let (tokens, _) = manager(ScriptedTransport::new(vec![]));
        tokens.set_access_token("old").unwrap();

        let err = tokens
            .store_token_pair(
                &TokenPair {
                    access: Some("A".into()),
                    refresh: None,
                },
                None,
            )
            .unwrap_err();

        assert!(err.is_authentication());
        assert!(tokens.credential().is_empty());
    }

    #[test]
    fn test_expiry_introspection() {
        let (tokens, _) = manager(ScriptedTransport::new(vec![]));
        let exp = (Utc::now() + Duration::minutes(5)).timestamp();
        tokens.set_refresh_token(&jwt(exp)).unwrap();

        assert_eq!(tokens.refresh_token_expiry().unwrap().timestamp(), exp);
        assert!(tokens.access_token_expiry().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_hit_backend_once() {
        let fresh = valid_jwt();
        let transport = ScriptedTransport::new(vec![Ok(ApiResponse::new(
            200,
            format!(r#"{{"access": "{}"}}"#, fresh),
        ))]);
        let (tokens, _) = manager(transport.clone());
        tokens.set_refresh_token(&valid_jwt()).unwrap();
        tokens.set_access_token(&expired_jwt()).unwrap();

        let (first, second) = tokio::join!(
            tokens.refresh_access_token(),
            tokens.refresh_access_token()
        );

        assert!(first && second);
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(tokens.access_token(), Some(fresh));
    }

    #[tokio::test]
    async fn test_rejected_but_unexpired_token_is_still_refreshed() {
        let transport = ScriptedTransport::new(vec![Ok(ApiResponse::new(
            200,
            r#"{"access": "T2"}"#,
        ))]);
        let (tokens, _) = manager(transport.clone());
        tokens.set_refresh_token(&valid_jwt()).unwrap();
        tokens.set_access_token(&valid_jwt()).unwrap();

        assert!(tokens.refresh_access_token().await);
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(tokens.access_token().as_deref(), Some("T2"));
    }
}
