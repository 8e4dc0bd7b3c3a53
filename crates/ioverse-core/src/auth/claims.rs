//! Expiry introspection for signed bearer tokens.
//!
//! Only the payload segment is decoded; signatures are the server's concern.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::error::{IoverseError, Result};

/// Claims decoded on demand from a token's payload. Never stored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TokenClaims {
    /// Expiry as seconds since the Unix epoch.
    #[serde(default)]
    pub exp: Option<f64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user_id: Option<serde_json::Value>,
}

impl TokenClaims {
    /// Decodes the payload segment of a `header.payload.signature` token.
    pub fn decode(token: &str) -> Result<Self> {
        let mut segments = token.split('.');
        let payload = match (segments.next(), segments.next(), segments.next()) {
            (Some(_), Some(payload), Some(_)) if !payload.is_empty() => payload,
            _ => {
                return Err(IoverseError::Serialization {
                    format: "JWT".to_string(),
                    message: "token does not have three segments".to_string(),
                });
            }
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| IoverseError::Serialization {
                format: "JWT".to_string(),
                message: format!("payload is not base64url: {}", e),
            })?;

        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Expiry instant, when the claim is present and representable.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let exp = self.exp?;
        if !exp.is_finite() {
            return None;
        }
        Utc.timestamp_millis_opt((exp * 1000.0) as i64).single()
    }

    /// A token without an expiry claim counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expiry) => expiry <= now,
            None => true,
        }
    }
}

/// Fail-closed expiry check: absent, undecodable, or expiry-less tokens are
/// expired. Never panics.
pub fn is_token_expired(token: Option<&str>, now: DateTime<Utc>) -> bool {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return true;
    };

    match TokenClaims::decode(token) {
        Ok(claims) => claims.is_expired_at(now),
        Err(e) => {
            tracing::debug!("[TokenClaims] Treating undecodable token as expired: {}", e);
            true
        }
    }
}
