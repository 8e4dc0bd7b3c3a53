//! Unified path management for ioverse client files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/ioverse/           # Config directory
//! ├── config.toml              # Client configuration
//! ├── state.toml               # Persisted tokens and theme preference
//! └── logs/                    # Application logs
//!     └── ioverse.log.YYYY-MM-DD
//! ```

use std::path::{Path, PathBuf};

use ioverse_core::{IoverseError, Result};

const APP_DIR_NAME: &str = "ioverse";

/// Resolves the locations of client files.
///
/// With a base path every file lives directly under it (used by tests and the
/// `--config-dir` flag); otherwise the platform config directory is used.
#[derive(Debug, Clone, Default)]
pub struct IoversePaths {
    base: Option<PathBuf>,
}

impl IoversePaths {
    pub fn new(base: Option<&Path>) -> Self {
        Self {
            base: base.map(Path::to_path_buf),
        }
    }

    /// Returns the ioverse configuration directory.
    pub fn config_dir(&self) -> Result<PathBuf> {
        if let Some(base) = &self.base {
            return Ok(base.clone());
        }

        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or_else(|| IoverseError::config("Cannot find home directory"))
    }

    pub fn config_file(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Returns the path of the persisted client state.
    ///
    /// Holds bearer credentials; written with owner-only permissions on Unix.
    pub fn state_file(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join("state.toml"))
    }

    pub fn logs_dir(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_base_path_override() {
        let temp_dir = TempDir::new().unwrap();
        let paths = IoversePaths::new(Some(temp_dir.path()));

        assert_eq!(paths.config_dir().unwrap(), temp_dir.path());
        assert_eq!(
            paths.config_file().unwrap(),
            temp_dir.path().join("config.toml")
        );
        assert_eq!(paths.state_file().unwrap(), temp_dir.path().join("state.toml"));
        assert!(paths.logs_dir().unwrap().ends_with("logs"));
    }
}
