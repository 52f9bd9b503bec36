use eframe::egui;

use crate::entities::frame::{
    DEFAULT_FRAME_DURATION_MS, FRAME_DURATION_STEP_MS, MAX_FRAME_DURATION_MS, MIN_FRAME_DURATION_MS,
};

pub const DEFAULT_API_PORT: u16 = 9876;

/// Settings categories
#[derive(Debug, Clone, Copy, PartialEq)]
enum SettingsCategory {
    General,
    Cache,
    WebServer,
}

impl SettingsCategory {
    const ALL: [SettingsCategory; 3] = [
        SettingsCategory::General,
        SettingsCategory::Cache,
        SettingsCategory::WebServer,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            SettingsCategory::General => "General",
            SettingsCategory::Cache => "Cache",
            SettingsCategory::WebServer => "Web Server",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

/// Color theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub fn apply(&self, ctx: &egui::Context) {
        let pref = match self {
            Theme::Light => egui::ThemePreference::Light,
            Theme::Dark => egui::ThemePreference::Dark,
            Theme::System => egui::ThemePreference::System,
        };
        ctx.set_theme(pref);
    }
}

/// Application settings
///
/// Persisted as one JSON blob; missing fields fall back to defaults.
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct AppSettings {
    // Sequencer
    pub default_frame_duration_ms: u32,
    pub theme: Theme,
    pub canvas_width: u32,
    pub canvas_height: u32,

    // Cache
    pub frame_cache_capacity: usize,

    // REST API Server
    pub api_server_enabled: bool,
    pub api_server_port: Option<u16>,
    /// Upload storage root (None = data dir)
    pub storage_dir: Option<String>,
    /// Processing endpoint notified after uploads (None = log only)
    pub processing_webhook_url: Option<String>,

    // Internal
    pub selected_settings_category: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            default_frame_duration_ms: DEFAULT_FRAME_DURATION_MS,
            theme: Theme::default(),
            canvas_width: 512,
            canvas_height: 512,
            frame_cache_capacity: crate::core::frame_cache::DEFAULT_CAPACITY,
            api_server_enabled: false,
            api_server_port: Some(DEFAULT_API_PORT),
            storage_dir: None,
            processing_webhook_url: None,
            selected_settings_category: Some("General".to_string()),
        }
    }
}

impl AppSettings {
    pub fn api_port(&self) -> u16 {
        self.api_server_port.unwrap_or(DEFAULT_API_PORT)
    }
}

fn render_general_settings(ui: &mut egui::Ui, settings: &mut AppSettings) {
    ui.heading("Sequencer");
    ui.add_space(8.0);

    ui.label("Default Frame Duration:");
    ui.add(
        egui::Slider::new(
            &mut settings.default_frame_duration_ms,
            MIN_FRAME_DURATION_MS..=MAX_FRAME_DURATION_MS,
        )
        .suffix(" ms")
        .step_by(FRAME_DURATION_STEP_MS as f64),
    );
    ui.label("Used for frames added from files and the library.");
    ui.add_space(8.0);

    ui.label("Canvas Size:");
    ui.horizontal(|ui| {
        ui.add(egui::DragValue::new(&mut settings.canvas_width).range(64..=4096).suffix(" px"));
        ui.label("x");
        ui.add(egui::DragValue::new(&mut settings.canvas_height).range(64..=4096).suffix(" px"));
    });
    ui.add_space(16.0);

    ui.heading("Appearance");
    ui.add_space(8.0);
    let prev = settings.theme;
    ui.horizontal(|ui| {
        ui.radio_value(&mut settings.theme, Theme::Light, "Light");
        ui.radio_value(&mut settings.theme, Theme::Dark, "Dark");
        ui.radio_value(&mut settings.theme, Theme::System, "System");
    });
    if settings.theme != prev {
        settings.theme.apply(ui.ctx());
    }
}

fn render_cache_settings(ui: &mut egui::Ui, settings: &mut AppSettings) {
    ui.heading("Frame Cache");
    ui.add_space(8.0);

    ui.label("Decoded frames kept in memory:");
    ui.add(egui::Slider::new(&mut settings.frame_cache_capacity, 16..=2048).logarithmic(true));
    ui.label("Least recently shown frames are dropped first.");
}

fn render_webserver_settings(ui: &mut egui::Ui, settings: &mut AppSettings) {
    ui.heading("REST API Server");
    ui.add_space(8.0);

    ui.checkbox(&mut settings.api_server_enabled, "Enable REST API server");
    ui.add_space(8.0);

    ui.horizontal(|ui| {
        ui.label("Port:");
        let mut port = settings.api_port() as i32;
        if ui.add(egui::DragValue::new(&mut port).range(1024..=65535)).changed() {
            settings.api_server_port = Some(port as u16);
        }
    });

    ui.horizontal(|ui| {
        ui.label("Storage dir:");
        let mut dir = settings.storage_dir.clone().unwrap_or_default();
        if ui.text_edit_singleline(&mut dir).changed() {
            settings.storage_dir = (!dir.trim().is_empty()).then(|| dir.trim().to_string());
        }
    });

    ui.horizontal(|ui| {
        ui.label("Processing webhook:");
        let mut url = settings.processing_webhook_url.clone().unwrap_or_default();
        if ui.text_edit_singleline(&mut url).changed() {
            settings.processing_webhook_url = (!url.trim().is_empty()).then(|| url.trim().to_string());
        }
    });
    ui.label("Changes take effect on next launch.");
    ui.add_space(12.0);

    if settings.api_server_enabled {
        ui.separator();
        ui.add_space(8.0);
        ui.label("Server URL:");
        ui.monospace(format!("http://0.0.0.0:{}", settings.api_port()));
        ui.add_space(8.0);
        ui.label("Endpoints:");
        ui.monospace("GET  /api/health");
        ui.monospace("GET  /api/player");
        ui.monospace("POST /api/player/play");
        ui.monospace("POST /api/player/pause");
        ui.monospace("POST /api/player/frame/{n}");
        ui.monospace("POST /api/assets/upload");
        ui.monospace("GET  /api/asset-packs");
    }
}

/// Render settings window
pub fn render_settings_window(ctx: &egui::Context, show_settings: &mut bool, settings: &mut AppSettings) {
    let mut selected = settings
        .selected_settings_category
        .as_deref()
        .and_then(SettingsCategory::from_str)
        .unwrap_or(SettingsCategory::General);

    egui::Window::new("Settings")
        .id(egui::Id::new("settings_window"))
        .open(show_settings)
        .default_size([560.0, 380.0])
        .resizable(true)
        .collapsible(false)
        .show(ctx, |ui| {
            ui.horizontal_top(|ui| {
                ui.vertical(|ui| {
                    ui.set_width(140.0);
                    for category in SettingsCategory::ALL {
                        ui.selectable_value(&mut selected, category, category.as_str());
                    }
                });

                ui.separator();

                ui.vertical(|ui| match selected {
                    SettingsCategory::General => render_general_settings(ui, settings),
                    SettingsCategory::Cache => render_cache_settings(ui, settings),
                    SettingsCategory::WebServer => render_webserver_settings(ui, settings),
                });
            });
        });

    settings.selected_settings_category = Some(selected.as_str().to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: AppSettings = serde_json::from_str(r#"{"theme":"dark","api_server_port":null}"#).unwrap();
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.default_frame_duration_ms, DEFAULT_FRAME_DURATION_MS);
        assert_eq!(settings.api_port(), DEFAULT_API_PORT);
    }

    #[test]
    fn test_category_names_roundtrip() {
        for category in SettingsCategory::ALL {
            assert_eq!(SettingsCategory::from_str(category.as_str()), Some(category));
        }
        assert_eq!(SettingsCategory::from_str("Gizmo"), None);
    }
}
