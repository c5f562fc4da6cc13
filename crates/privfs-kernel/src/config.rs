//! Configuration for privfs.
//!
//! Loaded from `$XDG_CONFIG_HOME/privfs/config.toml` when present; every
//! field has a default, so an empty or missing file is valid.
//!
//! ```toml
//! [storage]
//! backend = "local"          # or "memory"
//! root = "/home/amy/.local/share/privfs/origin"
//! serialize_same_name = false
//!
//! [export]
//! mode = "auto"              # "picker" | "download"
//! download_dir = "/home/amy/Downloads"
//!
//! [session]
//! file_name = "example.txt"
//! file_content = "Hello, OPFS!"
//! directory_name = "myDirectory"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::export::ExportMode;
use crate::host::EntryName;
use crate::paths;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("storage.root must not be empty")]
    EmptyStorageRoot,

    #[error("export.download_dir must not be empty")]
    EmptyDownloadDir,

    #[error("session.{field} is not a valid entry name: {value:?}")]
    InvalidSessionName { field: &'static str, value: String },
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub export: ExportConfig,
    pub session: SessionConfig,
}

/// Which storage host to run on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// A private directory on disk.
    #[default]
    Local,
    /// Ephemeral, lost on exit.
    Memory,
}

/// Storage host configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: Backend,

    /// Root directory of the local backend.
    pub root: PathBuf,

    /// Serialise operations on the same entry name.
    pub serialize_same_name: bool,
}

/// Export configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    pub mode: ExportMode,

    /// Directory that receives downloads.
    pub download_dir: PathBuf,
}

/// Initial session state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub file_name: String,
    pub file_content: String,
    pub directory_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Local,
            root: paths::storage_root(),
            serialize_same_name: false,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            mode: ExportMode::Auto,
            download_dir: paths::download_dir(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            file_name: "example.txt".to_string(),
            file_content: "Hello, OPFS!".to_string(),
            directory_name: "myDirectory".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?;
        Ok(config)
    }

    /// Load from `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse and validate TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.root.as_os_str().is_empty() {
            return Err(ConfigError::EmptyStorageRoot);
        }
        if self.export.download_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDownloadDir);
        }
        // An empty file name is a valid state to start from, but not a bad name
        for (field, value) in [
            ("file_name", &self.session.file_name),
            ("directory_name", &self.session.directory_name),
        ] {
            if !value.is_empty() && EntryName::new(value.as_str()).is_err() {
                return Err(ConfigError::InvalidSessionName {
                    field,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }

    /// Serialize to TOML, e.g. for writing a starter config.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.session.file_name, "example.txt");
        assert_eq!(config.session.file_content, "Hello, OPFS!");
        assert_eq!(config.session.directory_name, "myDirectory");
        assert_eq!(config.storage.backend, Backend::Local);
        assert_eq!(config.export.mode, ExportMode::Auto);
        assert!(!config.storage.serialize_same_name);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::parse(
            r#"
            [storage]
            backend = "memory"
            serialize_same_name = true

            [export]
            mode = "download"
            download_dir = "/tmp/dl"
            "#,
        )
        .unwrap();
        assert_eq!(config.storage.backend, Backend::Memory);
        assert!(config.storage.serialize_same_name);
        assert_eq!(config.storage.root, paths::storage_root());
        assert_eq!(config.export.mode, ExportMode::Download);
        assert_eq!(config.export.download_dir, PathBuf::from("/tmp/dl"));
        assert_eq!(config.session, SessionConfig::default());
    }

    #[test]
    fn unknown_export_mode_is_rejected() {
        assert!(Config::parse("[export]\nmode = \"dialog\"\n").is_err());
    }

    #[test]
    fn invalid_session_name_is_rejected() {
        let mut config = Config::default();
        config.session.directory_name = "a/b".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidSessionName {
                field: "directory_name",
                value: "a/b".to_string()
            })
        );
    }

    #[test]
    fn empty_root_is_rejected() {
        let mut config = Config::default();
        config.storage.root = PathBuf::new();
        assert_eq!(config.validate(), Err(ConfigError::EmptyStorageRoot));
    }

    #[test]
    fn toml_round_trip() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        assert_eq!(Config::parse(&text).unwrap(), config);
    }

    #[test]
    fn printed_config_works_as_starter_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.backend = Backend::Memory;
        config.export.mode = ExportMode::Download;
        let path = dir.path().join("config.toml");
        std::fs::write(&path, config.to_toml().unwrap()).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[storage\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));
    }
}
