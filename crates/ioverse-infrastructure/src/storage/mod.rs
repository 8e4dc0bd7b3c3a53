//! Storage layer for persisted client state.

mod atomic_toml;
mod client_state;
mod credential_storage;

pub use atomic_toml::AtomicTomlFile;
pub use client_state::{ClientState, ThemePreferenceStore};
pub use credential_storage::{DualCredentialStore, FileCredentialStore, SessionCredentialStore};
