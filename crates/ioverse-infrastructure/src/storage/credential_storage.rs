//! Credential stores with persistent and session durability.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use ioverse_core::auth::{CredentialStore, StorageDurability, TokenKind};
use ioverse_core::{IoverseError, Result};

use super::atomic_toml::AtomicTomlFile;
use super::client_state::ClientState;

fn slot(state: &mut ClientState, kind: TokenKind) -> &mut Option<String> {
    match kind {
        TokenKind::Access => &mut state.access_token,
        TokenKind::Refresh => &mut state.refresh_token,
    }
}

/// Credentials kept in `state.toml`; survive process restarts.
pub struct FileCredentialStore {
    file: AtomicTomlFile<ClientState>,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: AtomicTomlFile::new(path),
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, kind: TokenKind) -> Result<Option<String>> {
        let Some(mut state) = self.file.load()? else {
            return Ok(None);
        };
        Ok(slot(&mut state, kind).take())
    }

    fn set(&self, kind: TokenKind, value: &str) -> Result<()> {
        self.file.update(ClientState::default(), |state| {
            *slot(state, kind) = Some(value.to_string());
            Ok(())
        })
    }

    fn remove(&self, kind: TokenKind) -> Result<()> {
        if !self.file.path().exists() {
            return Ok(());
        }
        self.file.update(ClientState::default(), |state| {
            *slot(state, kind) = None;
            Ok(())
        })
    }

    fn clear(&self) -> Result<()> {
        if !self.file.path().exists() {
            return Ok(());
        }
        self.file.update(ClientState::default(), |state| {
            state.access_token = None;
            state.refresh_token = None;
            Ok(())
        })
    }
}

/// Credentials held in memory for the lifetime of the process.
#[derive(Default)]
pub struct SessionCredentialStore {
    tokens: RwLock<HashMap<TokenKind, String>>,
}

impl SessionCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> IoverseError {
    IoverseError::internal("Session credential lock poisoned")
}

impl CredentialStore for SessionCredentialStore {
    fn get(&self, kind: TokenKind) -> Result<Option<String>> {
        let tokens = self.tokens.read().map_err(poisoned)?;
        Ok(tokens.get(&kind).cloned())
    }

    fn set(&self, kind: TokenKind, value: &str) -> Result<()> {
        let mut tokens = self.tokens.write().map_err(poisoned)?;
        tokens.insert(kind, value.to_string());
        Ok(())
    }

    fn remove(&self, kind: TokenKind) -> Result<()> {
        let mut tokens = self.tokens.write().map_err(poisoned)?;
        tokens.remove(&kind);
        Ok(())
    }
}

/// Combines a persistent and a session store behind one `CredentialStore`.
///
/// Reads prefer the persistent value. Writes go to the store selected by the
/// current durability and evict the same key from the other store, so a
/// token never lives in both at once.
pub struct DualCredentialStore {
    persistent: FileCredentialStore,
    session: SessionCredentialStore,
    durability: RwLock<StorageDurability>,
}

impl DualCredentialStore {
    pub fn new(path: PathBuf, durability: StorageDurability) -> Self {
        Self {
            persistent: FileCredentialStore::new(path),
            session: SessionCredentialStore::new(),
            durability: RwLock::new(durability),
        }
    }

    pub fn durability(&self) -> StorageDurability {
        self.durability
            .read()
            .map(|d| *d)
            .unwrap_or_default()
    }

    /// Durability a refreshed token should inherit: wherever the refresh
    /// token currently lives.
    fn effective_durability(&self) -> StorageDurability {
        match self.persistent.get(TokenKind::Refresh) {
            Ok(Some(_)) => StorageDurability::Persistent,
            _ => match self.session.get(TokenKind::Refresh) {
                Ok(Some(_)) => StorageDurability::Session,
                _ => self.durability(),
            },
        }
    }
}

impl CredentialStore for DualCredentialStore {
    fn get(&self, kind: TokenKind) -> Result<Option<String>> {
        match self.persistent.get(kind)? {
            Some(value) => Ok(Some(value)),
            None => self.session.get(kind),
        }
    }

    fn set(&self, kind: TokenKind, value: &str) -> Result<()> {
        let target = match kind {
            TokenKind::Access => self.effective_durability(),
            TokenKind::Refresh => self.durability(),
        };

        match target {
            StorageDurability::Persistent => {
                self.persistent.set(kind, value)?;
                self.session.remove(kind)
            }
            StorageDurability::Session => {
                self.session.set(kind, value)?;
                self.persistent.remove(kind)
            }
        }
    }

    fn remove(&self, kind: TokenKind) -> Result<()> {
        self.persistent.remove(kind)?;
        self.session.remove(kind)
    }

    fn clear(&self) -> Result<()> {
        self.persistent.clear()?;
        self.session.clear()
    }

    fn set_durability(&self, durability: StorageDurability) -> Result<()> {
        let mut current = self.durability.write().map_err(poisoned)?;
        *current = durability;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ThemePreferenceStore;
    use ioverse_core::auth::ThemePreference;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.toml");

        FileCredentialStore::new(path.clone())
            .set(TokenKind::Refresh, "r1")
            .unwrap();

        let reopened = FileCredentialStore::new(path);
        assert_eq!(reopened.get(TokenKind::Refresh).unwrap().as_deref(), Some("r1"));
        assert_eq!(reopened.get(TokenKind::Access).unwrap(), None);
    }

    #[test]
    fn test_file_store_clear_keeps_theme() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.toml");
        let store = FileCredentialStore::new(path.clone());
        let themes = ThemePreferenceStore::new(path);

        store.set(TokenKind::Access, "a1").unwrap();
        themes.set(ThemePreference::Dark).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();

        assert_eq!(store.get(TokenKind::Access).unwrap(), None);
        assert_eq!(themes.get().unwrap(), Some(ThemePreference::Dark));
    }

    #[test]
    fn test_session_store_is_in_memory() {
        let store = SessionCredentialStore::new();
        store.set(TokenKind::Access, "a1").unwrap();
        store.set(TokenKind::Access, "a2").unwrap();

        assert_eq!(store.get(TokenKind::Access).unwrap().as_deref(), Some("a2"));
        store.clear().unwrap();
        assert_eq!(store.get(TokenKind::Access).unwrap(), None);
    }

    #[test]
    fn test_dual_store_session_writes_do_not_touch_disk() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.toml");
        let store = DualCredentialStore::new(path.clone(), StorageDurability::Session);

        store.set(TokenKind::Refresh, "r1").unwrap();
        store.set(TokenKind::Access, "a1").unwrap();

        assert_eq!(store.get(TokenKind::Access).unwrap().as_deref(), Some("a1"));
        let on_disk = FileCredentialStore::new(path);
        assert_eq!(on_disk.get(TokenKind::Access).unwrap(), None);
        assert_eq!(on_disk.get(TokenKind::Refresh).unwrap(), None);
    }

    #[test]
    fn test_dual_store_switching_durability_moves_token() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.toml");
        let store = DualCredentialStore::new(path.clone(), StorageDurability::Session);

        store.set(TokenKind::Refresh, "r1").unwrap();
        store.set_durability(StorageDurability::Persistent).unwrap();
        store.set(TokenKind::Refresh, "r2").unwrap();

        assert_eq!(store.get(TokenKind::Refresh).unwrap().as_deref(), Some("r2"));
        assert_eq!(store.session.get(TokenKind::Refresh).unwrap(), None);
    }

    #[test]
    fn test_dual_store_refreshed_access_follows_refresh_token() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.toml");
        let store = DualCredentialStore::new(path, StorageDurability::Persistent);

        store.set(TokenKind::Refresh, "r1").unwrap();
        // A later default change must not move the refreshed access token.
        store.set_durability(StorageDurability::Session).unwrap();
        store.set(TokenKind::Access, "a2").unwrap();

        assert_eq!(
            store.persistent.get(TokenKind::Access).unwrap().as_deref(),
            Some("a2")
        );
        assert_eq!(store.session.get(TokenKind::Access).unwrap(), None);
    }

    #[test]
    fn test_dual_store_clear_removes_everything() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.toml");
        let store = DualCredentialStore::new(path, StorageDurability::Persistent);

        store.set(TokenKind::Access, "a1").unwrap();
        store.set(TokenKind::Refresh, "r1").unwrap();
        store.clear().unwrap();

        assert_eq!(store.get(TokenKind::Access).unwrap(), None);
        assert_eq!(store.get(TokenKind::Refresh).unwrap(), None);
    }
}
