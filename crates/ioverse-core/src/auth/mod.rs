//! Authentication domain module.
//!
//! # Module Structure
//!
//! - `model`: Credential state and token endpoint payloads
//! - `claims`: Expiry introspection of signed tokens (`TokenClaims`)
//! - `store`: Storage seam for persisted credentials (`CredentialStore`)

mod claims;
mod model;
mod store;

pub use claims::{TokenClaims, is_token_expired};
pub use model::{
    Credential, RefreshRequest, RefreshResponse, StorageDurability, ThemePreference, TokenKind,
    TokenPair,
};
pub use store::{
    ACCESS_TOKEN_KEY, CredentialStore, REFRESH_TOKEN_KEY, THEME_PREFERENCE_KEY,
};
