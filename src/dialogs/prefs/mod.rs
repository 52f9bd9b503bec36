//! Preferences window, persisted settings and hotkeys

pub mod hotkeys;
mod prefs;
pub mod prefs_events;

pub use hotkeys::HotkeyHandler;
pub use prefs::{AppSettings, DEFAULT_API_PORT, Theme, render_settings_window};
