//! XDG Base Directory paths for privfs.
//!
//! | Purpose | XDG Variable | Default | privfs Path |
//! |---------|--------------|---------|-------------|
//! | Private storage | `$XDG_DATA_HOME` | `~/.local/share` | `$XDG_DATA_HOME/privfs/origin/` |
//! | Config | `$XDG_CONFIG_HOME` | `~/.config` | `$XDG_CONFIG_HOME/privfs/config.toml` |
//! | Downloads | `$XDG_DOWNLOAD_DIR` | `~/Downloads` | used as-is |

use std::path::PathBuf;

use directories::{BaseDirs, UserDirs};

/// Get the data directory for persistent state.
///
/// Uses `$XDG_DATA_HOME/privfs` or falls back to `~/.local/share/privfs`.
pub fn data_dir() -> PathBuf {
    BaseDirs::new()
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| home_fallback().join(".local").join("share"))
        .join("privfs")
}

/// Get the config directory.
///
/// Uses `$XDG_CONFIG_HOME/privfs` or falls back to `~/.config/privfs`.
pub fn config_dir() -> PathBuf {
    BaseDirs::new()
        .map(|d| d.config_dir().to_path_buf())
        .unwrap_or_else(|| home_fallback().join(".config"))
        .join("privfs")
}

/// Default config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Default root of the private storage namespace.
pub fn storage_root() -> PathBuf {
    data_dir().join("origin")
}

/// Where downloads land when no directory is configured.
///
/// The user's download directory if the platform has one, otherwise
/// `data_dir()/downloads`.
pub fn download_dir() -> PathBuf {
    UserDirs::new()
        .and_then(|d| d.download_dir().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| data_dir().join("downloads"))
}

/// Fallback home directory when BaseDirs fails.
fn home_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
