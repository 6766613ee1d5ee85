//! Configuration and data directory paths
//!
//! Uses XDG directories via `dirs` crate with fallbacks.
//!
//! Platform-specific locations:
//! - Linux: `~/.config/rv/`, `~/.cache/rv/`
//! - macOS: `~/Library/Application Support/rv/`, `~/Library/Caches/rv/`
//! - Windows: `%APPDATA%\rv\`, `%LOCALAPPDATA%\rv\`

use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_NAME: &str = "rv";

/// Get the application config directory.
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Could not determine config directory")?;
    let dir = base.join(APP_NAME);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Get the application cache directory.
pub fn cache_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir().context("Could not determine cache directory")?;
    let dir = base.join(APP_NAME);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Get the path to the app config file.
pub fn app_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Get the path to the embedded store database, unless overridden in config.
pub fn default_db_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("store.sqlite3"))
}

/// Get the path to the advisory cross-process sync lock file.
pub fn sync_lock_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("sync.lock"))
}
