//! Application context - settings blob and paths, passed explicitly.
//!
//! Lifecycle: [`AppContext::init`] once at startup (reads the settings file),
//! [`AppContext::update`] for changes, [`AppContext::save`] to write the whole
//! blob back, [`AppContext::teardown`] on exit (saves pending changes).

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{self, PathConfig};
use crate::dialogs::prefs::AppSettings;

/// One JSON file holding [`AppSettings`].
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read settings. Missing or unreadable files give defaults.
    pub fn load(&self) -> AppSettings {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) => {
                debug!("No settings at {} ({}), using defaults", self.path.display(), e);
                return AppSettings::default();
            }
        };
        match serde_json::from_str(&json) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Invalid settings file {}: {}, using defaults", self.path.display(), e);
                AppSettings::default()
            }
        }
    }

    /// Overwrite the file with `settings` (write to temp, then rename).
    pub fn save(&self, settings: &AppSettings) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(settings).context("Serialize settings")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Write settings: {}", tmp.display()))?;
        fs::rename(&tmp, &self.path).with_context(|| format!("Replace settings: {}", self.path.display()))?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct AppContext {
    paths: PathConfig,
    store: SettingsStore,
    settings: AppSettings,
    dirty: bool,
}

impl AppContext {
    /// Resolve paths and read settings.
    pub fn init(paths: PathConfig) -> Self {
        if let Err(e) = config::ensure_dirs(&paths) {
            warn!("{:#}", e);
        }
        let store = SettingsStore::new(config::config_file(config::SETTINGS_FILE, &paths));
        let settings = store.load();
        info!("Settings: {}", store.path().display());
        Self {
            paths,
            store,
            settings,
            dirty: false,
        }
    }

    pub fn paths(&self) -> &PathConfig {
        &self.paths
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mutate settings. Marks dirty only if something actually changed.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut AppSettings) -> R) -> R {
        let before = self.settings.clone();
        let result = f(&mut self.settings);
        if self.settings != before {
            self.dirty = true;
        }
        result
    }

    /// Swap the whole settings blob (e.g. reset to defaults).
    pub fn replace(&mut self, settings: AppSettings) -> AppSettings {
        self.dirty = true;
        std::mem::replace(&mut self.settings, settings)
    }

    pub fn save(&mut self) -> Result<()> {
        self.store.save(&self.settings)?;
        self.dirty = false;
        debug!("Settings saved");
        Ok(())
    }

    /// Final save on exit. Nothing is written when unchanged.
    pub fn teardown(&mut self) -> Result<()> {
        if self.dirty {
            self.save()?;
        }
        info!("Context closed");
        Ok(())
    }

    /// Upload storage root: settings override, else data dir.
    pub fn storage_dir(&self) -> PathBuf {
        self.settings
            .storage_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| config::storage_dir(&self.paths))
    }

    pub fn library_path(&self) -> PathBuf {
        config::data_file(crate::entities::library::LIBRARY_FILE, &self.paths)
    }
}
