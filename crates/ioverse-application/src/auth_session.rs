//! Login state of the client and the forced logout at refresh expiry.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use ioverse_core::Result;
use ioverse_core::auth::StorageDurability;
use ioverse_interaction::{AccountApi, TokenManager};

use crate::chat_state::ChatState;
use crate::query_cache::QueryCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Authenticated,
    Unauthenticated,
}

/// Owns the authenticated/unauthenticated transition.
///
/// Logging out, whether requested or forced by the timer, drops the stored
/// credentials together with every cached query and the chat view state.
pub struct AuthSession {
    tokens: Arc<TokenManager>,
    account: AccountApi,
    cache: QueryCache,
    state: ChatState,
    status: Arc<watch::Sender<AuthStatus>>,
    logout_timer: Mutex<Option<JoinHandle<()>>>,
}

impl AuthSession {
    pub fn new(
        tokens: Arc<TokenManager>,
        account: AccountApi,
        cache: QueryCache,
        state: ChatState,
    ) -> Self {
        let (status, _) = watch::channel(AuthStatus::Unauthenticated);
        Self {
            tokens,
            account,
            cache,
            state,
            status: Arc::new(status),
            logout_timer: Mutex::new(None),
        }
    }

    pub fn status(&self) -> AuthStatus {
        *self.status.borrow()
    }

    /// Receiver that observes every status change, including forced logouts.
    pub fn subscribe(&self) -> watch::Receiver<AuthStatus> {
        self.status.subscribe()
    }

    /// Start-up check against the stored credentials.
    ///
    /// A valid access token, or a valid refresh token that refreshes
    /// successfully, authenticates the session. Anything else clears the
    /// stored tokens.
    pub async fn initialize(&self) -> AuthStatus {
        let authenticated = if !self.tokens.is_access_token_invalid() {
            true
        } else if !self.tokens.is_refresh_token_invalid() {
            self.tokens.refresh_access_token().await
        } else {
            false
        };

        if authenticated {
            tracing::info!("[AuthSession] Restored session from stored credentials");
            self.status.send_replace(AuthStatus::Authenticated);
            self.schedule_logout().await;
        } else {
            tracing::info!("[AuthSession] No usable credentials, login required");
            self.tokens.clear_tokens();
            self.status.send_replace(AuthStatus::Unauthenticated);
        }
        self.status()
    }

    /// Logs in and arms the logout timer.
    ///
    /// `remember_me` selects the storage durability for this login; `None`
    /// keeps the configured default.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        remember_me: Option<bool>,
    ) -> Result<()> {
        let durability = remember_me.map(StorageDurability::from_remember_me);
        self.account.login(username, password, durability).await?;

        self.status.send_replace(AuthStatus::Authenticated);
        self.schedule_logout().await;
        Ok(())
    }

    pub async fn logout(&self) {
        if let Some(timer) = self.logout_timer.lock().await.take() {
            timer.abort();
        }
        end_session(&self.tokens, &self.cache, &self.state, &self.status).await;
    }

    /// Arms a timer that ends the session when the refresh token expires.
    ///
    /// Replaces any previously armed timer. Without a decodable refresh
    /// expiry the session ends immediately.
    pub async fn schedule_logout(&self) {
        let mut timer = self.logout_timer.lock().await;
        if let Some(previous) = timer.take() {
            previous.abort();
        }

        let delay = match self.tokens.refresh_token_expiry() {
            Some(expires_at) => (expires_at - Utc::now()).to_std().unwrap_or(Duration::ZERO),
            None => Duration::ZERO,
        };
        tracing::debug!("[AuthSession] Logout scheduled in {}s", delay.as_secs());

        let tokens = self.tokens.clone();
        let cache = self.cache.clone();
        let state = self.state.clone();
        let status = self.status.clone();
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::info!("[AuthSession] Refresh token expired, logging out");
            end_session(&tokens, &cache, &state, &status).await;
        }));
    }
}

async fn end_session(
    tokens: &TokenManager,
    cache: &QueryCache,
    state: &ChatState,
    status: &watch::Sender<AuthStatus>,
) {
    tokens.clear_tokens();
    cache.clear().await;
    state.reset().await;
    status.send_replace(AuthStatus::Unauthenticated);
    tracing::info!("[AuthSession] Session ended");
}

impl Drop for AuthSession {
    fn drop(&mut self) {
        if let Some(timer) = self.logout_timer.get_mut().take() {
            timer.abort();
        }
    }
}
