//! Application paths: settings, library, log and upload storage.
//!
//! Priority for every directory:
//! 1. CLI `--config-dir`
//! 2. `SPRITEDECK_CONFIG_DIR` environment variable
//! 3. Current folder, if it already holds spritedeck files
//! 4. Platform directory from dirs-next
//!
//! Platform paths:
//! - Linux: ~/.config/spritedeck (config), ~/.local/share/spritedeck (data)
//! - macOS: ~/Library/Application Support/spritedeck
//! - Windows: %APPDATA%\spritedeck

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const APP_DIR: &str = "spritedeck";
pub const CONFIG_DIR_ENV: &str = "SPRITEDECK_CONFIG_DIR";

pub const SETTINGS_FILE: &str = "spritedeck_settings.json";
pub const LOG_FILE: &str = "spritedeck.log";
/// Upload storage folder inside the data dir
pub const STORAGE_DIR: &str = "storage";

const LOCAL_MARKERS: [&str; 3] = [SETTINGS_FILE, crate::entities::library::LIBRARY_FILE, LOG_FILE];

/// Overrides for default application paths
#[derive(Debug, Clone, Default)]
pub struct PathConfig {
    /// Custom config directory (from CLI or ENV)
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// CLI value wins over `SPRITEDECK_CONFIG_DIR`.
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| std::env::var(CONFIG_DIR_ENV).ok().map(PathBuf::from));
        Self { config_dir }
    }

    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: Some(dir.into()),
        }
    }
}

pub fn config_file(name: &str, config: &PathConfig) -> PathBuf {
    config_dir(config).join(name)
}

pub fn data_file(name: &str, config: &PathConfig) -> PathBuf {
    data_dir(config).join(name)
}

/// Default storage root for uploaded files
pub fn storage_dir(config: &PathConfig) -> PathBuf {
    data_dir(config).join(STORAGE_DIR)
}

/// Create config and data directories if missing.
pub fn ensure_dirs(config: &PathConfig) -> Result<()> {
    let config_dir = config_dir(config);
    let data_dir = data_dir(config);

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;
    if data_dir != config_dir {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    }
    Ok(())
}

fn has_local_files(dir: &Path) -> bool {
    LOCAL_MARKERS.iter().any(|f| dir.join(f).exists())
}

fn resolve_dir(config: &PathConfig, platform: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }
    if let Ok(current) = std::env::current_dir()
        && has_local_files(&current)
    {
        return current;
    }
    platform
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn config_dir(config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::config_dir())
}

fn data_dir(config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::data_dir())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_dir_wins() {
        let config = PathConfig::with_dir("/custom");
        assert_eq!(config_file(SETTINGS_FILE, &config), PathBuf::from("/custom/spritedeck_settings.json"));
        assert_eq!(data_file(LOG_FILE, &config), PathBuf::from("/custom/spritedeck.log"));
        assert_eq!(storage_dir(&config), PathBuf::from("/custom/storage"));
    }

    #[test]
    fn test_cli_overrides_env() {
        let config = PathConfig::from_env_and_cli(Some(PathBuf::from("/from/cli")));
        assert_eq!(config.config_dir, Some(PathBuf::from("/from/cli")));
    }

    #[test]
    fn test_ensure_dirs_creates() {
        let dir = std::env::temp_dir().join(format!("spritedeck_cfg_{}", uuid::Uuid::new_v4()));
        let config = PathConfig::with_dir(&dir);
        ensure_dirs(&config).unwrap();
        assert!(dir.is_dir());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
