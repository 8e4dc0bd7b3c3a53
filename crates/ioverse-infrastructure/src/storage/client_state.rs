//! On-disk client state (`state.toml`).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use ioverse_core::Result;
use ioverse_core::auth::ThemePreference;

use super::atomic_toml::AtomicTomlFile;

/// Everything the client persists between runs, under the well-known keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientState {
    #[serde(rename = "accessToken", default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(rename = "refreshToken", default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(
        rename = "theme-preference",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub theme_preference: Option<ThemePreference>,
}

/// Reads and writes the theme preference stored next to the credentials.
pub struct ThemePreferenceStore {
    file: AtomicTomlFile<ClientState>,
}

impl ThemePreferenceStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: AtomicTomlFile::new(path),
        }
    }

    pub fn get(&self) -> Result<Option<ThemePreference>> {
        Ok(self.file.load()?.and_then(|state| state.theme_preference))
    }

    pub fn set(&self, theme: ThemePreference) -> Result<()> {
        self.file.update(ClientState::default(), |state| {
            state.theme_preference = Some(theme);
            Ok(())
        })
    }
}
