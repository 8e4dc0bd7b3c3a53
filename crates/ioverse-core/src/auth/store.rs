//! Credential storage seam.

use super::model::{StorageDurability, TokenKind};
use crate::error::Result;

/// Storage key of the access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Storage key of the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
/// Storage key of the colour scheme preference.
pub const THEME_PREFERENCE_KEY: &str = "theme-preference";

/// Key-value storage for session credentials.
///
/// Only the token manager writes through this trait. Implementations decide
/// durability (on disk, in memory, or a combination of both).
pub trait CredentialStore: Send + Sync {
    /// Reads the stored token, `None` when absent.
    fn get(&self, kind: TokenKind) -> Result<Option<String>>;

    /// Stores a token, replacing any previous value.
    fn set(&self, kind: TokenKind, value: &str) -> Result<()>;

    /// Removes a single token. Removing a missing token is not an error.
    fn remove(&self, kind: TokenKind) -> Result<()>;

    /// Removes both tokens.
    fn clear(&self) -> Result<()> {
        self.remove(TokenKind::Access)?;
        self.remove(TokenKind::Refresh)
    }

    /// Selects where subsequent writes land (the "remember me" choice).
    ///
    /// Stores with a single fixed durability ignore this.
    fn set_durability(&self, _durability: StorageDurability) -> Result<()> {
        Ok(())
    }
}
