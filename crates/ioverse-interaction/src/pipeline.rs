//! Authenticated request pipeline.
//!
//! Two independent guards keep bearer tokens usable:
//! - a pre-flight check that refreshes a locally expired access token
//! - a single refresh-and-retry when the server answers `401`
//!
//! A second `401` after the retry is returned to the caller as is.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use ioverse_core::{IoverseError, Result};

use crate::token_manager::TokenManager;
use crate::transport::{ApiRequest, ApiResponse, HttpTransport};

const UNAUTHORIZED: u16 = 401;

fn session_expired() -> IoverseError {
    IoverseError::authentication("Your session has expired. Please log in again.")
}

#[derive(Clone)]
pub struct AuthenticatedClient {
    tokens: Arc<TokenManager>,
    transport: Arc<dyn HttpTransport>,
}

impl AuthenticatedClient {
    pub fn new(tokens: Arc<TokenManager>, transport: Arc<dyn HttpTransport>) -> Self {
        Self { tokens, transport }
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Returns an access token that is valid as far as the client can tell.
    ///
    /// Refreshes at most once. Fails with `Authentication` when no refresh
    /// path remains, in which case the caller must force a new login.
    pub async fn usable_access_token(&self) -> Result<String> {
        if !self.tokens.is_access_token_invalid()
            && let Some(token) = self.tokens.access_token()
        {
            return Ok(token);
        }

        if self.tokens.is_refresh_token_invalid() {
            tracing::info!("[Pipeline] Refresh token missing or expired");
            self.tokens.clear_tokens();
            return Err(session_expired());
        }

        if self.tokens.refresh_access_token().await
            && let Some(token) = self.tokens.access_token()
        {
            return Ok(token);
        }

        Err(session_expired())
    }

    /// Sends `request` with a bearer token, retrying once after a `401`.
    ///
    /// Non-success responses are decoded into the error taxonomy.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let token = self.usable_access_token().await?;
        let response = self
            .transport
            .execute(request.clone().with_bearer(token))
            .await?;

        if response.status != UNAUTHORIZED {
            return response.error_for_status();
        }

        tracing::info!(
            "[Pipeline] {} rejected with 401, refreshing once",
            request.path
        );
        if !self.tokens.refresh_access_token().await {
            return Err(session_expired());
        }
        let Some(token) = self.tokens.access_token() else {
            return Err(session_expired());
        };

        let retried = self.transport.execute(request.with_bearer(token)).await?;
        if retried.status == UNAUTHORIZED {
            tracing::warn!("[Pipeline] Retry was rejected with 401 as well");
        }
        retried.error_for_status()
    }

    /// Sends `request` without a bearer token.
    pub async fn execute_public(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.transport.execute(request).await?.error_for_status()
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(ApiRequest::get(path)).await?.json()
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        self.execute(ApiRequest::post(path, body)?).await?.json()
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        self.execute(ApiRequest::put(path, body)?).await?.json()
    }

    pub async fn patch(&self, path: &str, body: &impl Serialize) -> Result<()> {
        self.execute(ApiRequest::patch(path, body)?).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.execute(ApiRequest::delete(path)).await?;
        Ok(())
    }
}
