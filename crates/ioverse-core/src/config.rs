use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::auth::StorageDurability;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_DOMAIN_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Client configuration stored in `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the authenticated API (token, chatbot endpoints).
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Base URL of the public account endpoints (register, reset-password).
    #[serde(default = "default_domain_base_url")]
    pub domain_base_url: String,
    /// Default credential durability when no "remember me" choice is given.
    #[serde(default)]
    pub storage: StorageDurability,
    /// Per-request timeout applied by the HTTP client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_domain_base_url() -> String {
    DEFAULT_DOMAIN_BASE_URL.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            domain_base_url: default_domain_base_url(),
            storage: StorageDurability::default(),
            request_timeout_secs: None,
            log_level: default_log_level(),
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
