use std::sync::Arc;

use ioverse_core::account::{
    CurrentUser, LoginRequest, RegisterRequest, ResetPasswordRequest, ResetPasswordResponse,
};
use ioverse_core::auth::{StorageDurability, TokenPair};
use ioverse_core::{IoverseError, Result};

use crate::pipeline::AuthenticatedClient;
use crate::transport::{ApiRequest, HttpTransport};

const LOGIN_PATH: &str = "/token/";
const CURRENT_USER_PATH: &str = "/current-user/";
const REGISTER_PATH: &str = "/register/";
const RESET_PASSWORD_PATH: &str = "/account/reset-password/";

/// Account endpoints: login, registration, password reset, profile.
///
/// Registration and password reset live on the domain host rather than under
/// the API prefix, so they go through a separate transport.
#[derive(Clone)]
pub struct AccountApi {
    client: AuthenticatedClient,
    domain: Arc<dyn HttpTransport>,
}

impl AccountApi {
    pub fn new(client: AuthenticatedClient, domain: Arc<dyn HttpTransport>) -> Self {
        Self { client, domain }
    }

    /// Exchanges username and password for a token pair and stores it.
    ///
    /// `durability` overrides the configured storage for this login
    /// ("remember me").
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        durability: Option<StorageDurability>,
    ) -> Result<()> {
        let request = ApiRequest::post(
            LOGIN_PATH,
            &LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            },
        )?;

        let pair: TokenPair = match self.client.execute_public(request).await {
            Ok(response) => response.json()?,
            Err(IoverseError::Http { status: 401, message }) => {
                tracing::info!("[AccountApi] Login rejected for {}", username);
                let message = if message.is_empty() {
                    "Invalid username or password.".to_string()
                } else {
                    message
                };
                return Err(IoverseError::authentication(message));
            }
            Err(e) => return Err(e),
        };

        self.client.tokens().store_token_pair(&pair, durability)?;
        tracing::info!("[AccountApi] Logged in as {}", username);
        Ok(())
    }

    /// Drops all stored credentials.
    pub fn logout(&self) {
        self.client.tokens().clear_tokens();
        tracing::info!("[AccountApi] Logged out");
    }

    pub async fn current_user(&self) -> Result<CurrentUser> {
        self.client.get_json(CURRENT_USER_PATH).await
    }

    /// Creates an account. Field errors come back as `Validation`.
    pub async fn register(&self, request: &RegisterRequest) -> Result<()> {
        let request = ApiRequest::post(REGISTER_PATH, request)?;
        self.domain.execute(request).await?.error_for_status()?;
        Ok(())
    }

    pub async fn reset_password(&self, email: &str) -> Result<ResetPasswordResponse> {
        let request = ApiRequest::post(
            RESET_PASSWORD_PATH,
            &ResetPasswordRequest {
                email: email.to_string(),
            },
        )?;
        self.domain.execute(request).await?.error_for_status()?.json()
    }
}
