//! Configuration service implementation.
//!
//! Loads `ClientConfig` from `config.toml`, applies environment overrides,
//! and caches the result.

use std::sync::{Arc, RwLock};

use ioverse_core::Result;
use ioverse_core::config::ClientConfig;

use crate::paths::IoversePaths;
use crate::storage::AtomicTomlFile;

pub const ENV_API_BASE_URL: &str = "IOVERSE_API_BASE_URL";
pub const ENV_DOMAIN_BASE_URL: &str = "IOVERSE_DOMAIN_BASE_URL";
pub const ENV_LOG_LEVEL: &str = "IOVERSE_LOG_LEVEL";

/// Configuration service that loads and caches the client configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    paths: IoversePaths,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<ClientConfig>>>,
}

impl ConfigService {
    pub fn new(paths: IoversePaths) -> Self {
        Self {
            paths,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the configuration, loading from file if not cached.
    ///
    /// Falls back to defaults when the file cannot be read.
    pub fn get_config(&self) -> ClientConfig {
        if let Ok(read_lock) = self.config.read()
            && let Some(cached) = read_lock.as_ref()
        {
            return cached.clone();
        }

        let loaded = match self.load_config() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("[ConfigService] Using default configuration: {}", e);
                ClientConfig::default()
            }
        };
        let loaded = apply_env_overrides(loaded, |key| std::env::var(key).ok());

        if let Ok(mut write_lock) = self.config.write() {
            *write_lock = Some(loaded.clone());
        }

        loaded
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        if let Ok(mut write_lock) = self.config.write() {
            *write_lock = None;
        }
    }

    /// Writes `config` to disk and refreshes the cache.
    pub fn save_config(&self, config: &ClientConfig) -> Result<()> {
        let file = AtomicTomlFile::<ClientConfig>::new(self.paths.config_file()?);
        file.save(config)?;
        self.invalidate_cache();
        Ok(())
    }

    fn load_config(&self) -> Result<ClientConfig> {
        let path = self.paths.config_file()?;
        let file = AtomicTomlFile::<ClientConfig>::new(path.clone());

        match file.load()? {
            Some(config) => Ok(config),
            None => {
                let default_config = ClientConfig::default();
                if let Err(e) = file.save(&default_config) {
                    tracing::warn!(
                        "[ConfigService] Could not write default config to {}: {}",
                        path.display(),
                        e
                    );
                } else {
                    tracing::info!("[ConfigService] Created default config at {}", path.display());
                }
                Ok(default_config)
            }
        }
    }
}

/// Applies `IOVERSE_*` overrides read through `lookup`.
pub fn apply_env_overrides<F>(mut config: ClientConfig, lookup: F) -> ClientConfig
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = non_empty(ENV_API_BASE_URL) {
        config.api_base_url = url;
    }
    if let Some(url) = non_empty(ENV_DOMAIN_BASE_URL) {
        config.domain_base_url = url;
    }
    if let Some(level) = non_empty(ENV_LOG_LEVEL) {
        config.log_level = level;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use ioverse_core::auth::StorageDurability;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_creates_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let paths = IoversePaths::new(Some(temp_dir.path()));
        let service = ConfigService::new(paths.clone());

        let config = service.load_config().unwrap();

        assert_eq!(config, ClientConfig::default());
        assert!(paths.config_file().unwrap().exists());
    }

    #[test]
    fn test_reads_existing_file_and_caches() {
        let temp_dir = TempDir::new().unwrap();
        let paths = IoversePaths::new(Some(temp_dir.path()));
        fs::write(
            paths.config_file().unwrap(),
            "api_base_url = \"https://chat.example.com/api\"\nstorage = \"session\"\n",
        )
        .unwrap();
        let service = ConfigService::new(paths.clone());

        let config = service.load_config().unwrap();
        assert_eq!(config.api_base_url, "https://chat.example.com/api");
        assert_eq!(config.storage, StorageDurability::Session);

        service.get_config();
        fs::write(paths.config_file().unwrap(), "storage = \"persistent\"\n").unwrap();
        // Cached until invalidated.
        assert_eq!(service.get_config().storage, StorageDurability::Session);
        service.invalidate_cache();
        assert_eq!(service.get_config().storage, StorageDurability::Persistent);
    }

    #[test]
    fn test_env_overrides_ignore_blank_values() {
        let config = apply_env_overrides(ClientConfig::default(), |key| match key {
            ENV_API_BASE_URL => Some("https://override/api".to_string()),
            ENV_LOG_LEVEL => Some("   ".to_string()),
            _ => None,
        });

        assert_eq!(config.api_base_url, "https://override/api");
        assert_eq!(config.log_level, "info");
    }
}
