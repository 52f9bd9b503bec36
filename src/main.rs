use spritedeck::cli::Args;
use spritedeck::config::{self, PathConfig};
use spritedeck::context::AppContext;
use spritedeck::core::event_bus::{EventBus, downcast_event};
use spritedeck::core::frame_cache::FrameCache;
use spritedeck::core::player::Player;
use spritedeck::core::player_events::{AddFrameEvent, CurrentFrameChangedEvent, PlaybackStateChangedEvent};
use spritedeck::core::workers::Workers;
use spritedeck::dialogs::prefs::prefs_events::{ToggleLibraryEvent, ToggleSettingsEvent};
use spritedeck::dialogs::prefs::{AppSettings, HotkeyHandler, render_settings_window};
use spritedeck::entities::frame::Frame;
use spritedeck::entities::library::Library;
use spritedeck::entities::sequence::Sequence;
use spritedeck::main_events::{self, EventTargets};
use spritedeck::server::upload::{
    JsonAssetPackRepo, LocalBlobStore, LogOnlyTrigger, ProcessingTrigger, TokenAuthenticator,
    WebhookTrigger,
};
use spritedeck::server::{ApiCommand, ApiServer, PlayerSnapshot, SharedApiState, UploadService};
use spritedeck::utils::{media, paths};
use spritedeck::widgets;
use spritedeck::widgets::file_dialogs::{create_image_dialog, create_sequence_dialog};
use spritedeck::widgets::library::LibraryPanelState;
use spritedeck::widgets::timeline::{TimelineState, render_resize_handle, render_timeline};

use clap::Parser;
use eframe::egui;
use log::{debug, error, info, trace, warn};
use std::path::PathBuf;
use std::sync::{Arc, mpsc};
use std::time::Duration;

/// Poll interval for API commands while the UI is otherwise idle
const API_POLL_INTERVAL: Duration = Duration::from_millis(100);
const ASSET_PACKS_FILE: &str = "asset_packs.json";
/// Threads reserved for processing webhook calls.
const PROCESSING_THREADS: usize = 2;

/// Running API server: shared snapshot + command channel
struct ApiLink {
    state: Arc<SharedApiState>,
    commands: mpsc::Receiver<ApiCommand>,
}

/// Main application state
struct SpriteDeckApp {
    context: AppContext,
    player: Player,
    library: Library,
    frame_cache: FrameCache,
    event_bus: EventBus,
    hotkey_handler: HotkeyHandler,
    timeline_state: TimelineState,
    library_panel: LibraryPanelState,
    api: Option<ApiLink>,
    show_settings: bool,
    show_library: bool,
    reset_settings_pending: bool,
    error_msg: Option<String>,
}

impl SpriteDeckApp {
    fn new(context: AppContext, workers: Arc<Workers>) -> Self {
        let event_bus = EventBus::new();

        let mut player = Player::new();
        player.set_event_emitter(event_bus.emitter());

        let library = match Library::load(&context.library_path()) {
            Ok(library) => library,
            Err(e) => {
                warn!("Library not loaded, starting empty: {:#}", e);
                Library::default()
            }
        };

        let frame_cache = FrameCache::new(context.settings().frame_cache_capacity, workers);

        Self {
            context,
            player,
            library,
            frame_cache,
            event_bus,
            hotkey_handler: HotkeyHandler::default(),
            timeline_state: TimelineState::new(),
            library_panel: LibraryPanelState::default(),
            api: None,
            show_settings: false,
            show_library: true,
            reset_settings_pending: false,
            error_msg: None,
        }
    }

    fn default_duration_ms(&self) -> u32 {
        self.context.settings().default_frame_duration_ms
    }

    /// Append image files to the sequence as frames.
    fn add_frame_files(&mut self, files: impl IntoIterator<Item = PathBuf>, duration_ms: i64) -> usize {
        let mut added = 0;
        for path in files {
            self.player
                .add_frame(Frame::new(path.to_string_lossy().into_owned(), duration_ms));
            added += 1;
        }
        added
    }

    fn open_sequence(&mut self, path: PathBuf) {
        match Sequence::from_json(&path) {
            Ok(sequence) => {
                info!("Opened sequence '{}' ({} frames)", sequence.name, sequence.len());
                self.player.replace_sequence(sequence);
                self.frame_cache.clear();
                self.error_msg = None;
            }
            Err(e) => {
                error!("{:#}", e);
                self.error_msg = Some(format!("{:#}", e));
            }
        }
    }

    fn save_sequence(&mut self, path: PathBuf) {
        match self.player.sequence().to_json(&path) {
            Ok(saved) => {
                info!("Sequence saved: {}", saved.display());
                self.error_msg = None;
            }
            Err(e) => {
                error!("{:#}", e);
                self.error_msg = Some(format!("{:#}", e));
            }
        }
    }

    fn save_library(&mut self) {
        if let Err(e) = self.library.save(&self.context.library_path()) {
            error!("{:#}", e);
            self.error_msg = Some(format!("{:#}", e));
        }
    }

    fn reset_settings(&mut self, ctx: &egui::Context) {
        info!("Resetting settings to defaults");
        self.context.replace(AppSettings::default());
        self.context.settings().theme.apply(ctx);
        self.frame_cache
            .set_capacity(self.context.settings().frame_cache_capacity);
    }

    /// Start the REST API server with upload support.
    fn start_api_server(&mut self, port: u16, storage_root: PathBuf) {
        let auth = TokenAuthenticator::from_env();
        if auth.is_empty() {
            warn!("No upload tokens configured, uploads will be rejected");
        }

        let packs_path = config::data_file(ASSET_PACKS_FILE, self.context.paths());
        let repo = match JsonAssetPackRepo::open(&packs_path) {
            Ok(repo) => repo,
            Err(e) => {
                warn!("Asset pack records kept in memory: {:#}", e);
                JsonAssetPackRepo::in_memory()
            }
        };

        let processing: Arc<dyn ProcessingTrigger> =
            match self.context.settings().processing_webhook_url.as_deref() {
                Some(url) if !url.trim().is_empty() => match WebhookTrigger::new(url.trim()) {
                    Ok(trigger) => Arc::new(trigger),
                    Err(e) => {
                        warn!("Processing webhook disabled: {:#}", e);
                        Arc::new(LogOnlyTrigger)
                    }
                },
                _ => Arc::new(LogOnlyTrigger),
            };

        let uploads = UploadService::new(
            Arc::new(auth),
            Arc::new(LocalBlobStore::new(storage_root.clone())),
            Arc::new(repo),
            processing,
        )
        .with_processing_threads(PROCESSING_THREADS);

        let state = Arc::new(SharedApiState::default());
        let (server, commands) = ApiServer::new(port, Arc::clone(&state));
        server.with_uploads(Arc::new(uploads), storage_root).start();
        self.api = Some(ApiLink { state, commands });
    }

    /// Apply commands queued by the API thread.
    fn sync_api(&mut self) {
        let Some(api) = &self.api else {
            return;
        };
        let commands: Vec<ApiCommand> = api.commands.try_iter().collect();
        let mut library_changed = false;
        for cmd in commands {
            debug!("API command: {:?}", cmd);
            let result = main_events::handle_api_command(cmd, &mut self.player, &mut self.library);
            library_changed |= result.library_changed;
        }
        if library_changed {
            self.save_library();
        }
    }

    fn handle_events(&mut self) {
        let mut library_changed = false;
        let default_duration_ms = self.default_duration_ms();

        for event in self.event_bus.poll() {
            // Player notifications
            if let Some(e) = downcast_event::<CurrentFrameChangedEvent>(&event) {
                trace!("Frame {} -> {}", e.old, e.new);
                continue;
            }
            if let Some(e) = downcast_event::<PlaybackStateChangedEvent>(&event) {
                debug!("Playback {}", if e.playing { "started" } else { "stopped" });
                continue;
            }

            let mut targets = EventTargets {
                player: &mut self.player,
                library: &mut self.library,
                timeline_state: &mut self.timeline_state,
                show_settings: &mut self.show_settings,
                show_library: &mut self.show_library,
                reset_settings_pending: &mut self.reset_settings_pending,
                default_duration_ms,
            };
            match main_events::handle_app_event(&event, &mut targets) {
                Some(result) => library_changed |= result.library_changed,
                None => trace!("Unhandled event: {}", (*event).type_name()),
            }
        }

        if library_changed {
            self.save_library();
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .filter(|p| media::is_image(p))
                .collect()
        });
        if !dropped.is_empty() {
            info!("Files dropped: {:?}", dropped);
            let duration = self.default_duration_ms() as i64;
            self.add_frame_files(dropped, duration);
        }
    }

    fn render_menu_bar(&mut self, ctx: &egui::Context) {
        let emitter = self.event_bus.emitter();
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Add Frames…").clicked() {
                        ui.close();
                        if let Some(files) = create_image_dialog("Add Frames").pick_files() {
                            for file in files {
                                emitter.emit(AddFrameEvent {
                                    image_url: Some(file.to_string_lossy().into_owned()),
                                });
                            }
                        }
                    }
                    ui.separator();
                    if ui.button("Open Sequence…").clicked() {
                        ui.close();
                        if let Some(path) = create_sequence_dialog("Open Sequence").pick_file() {
                            self.open_sequence(path);
                        }
                    }
                    if ui.button("Save Sequence…").clicked() {
                        ui.close();
                        if let Some(path) = create_sequence_dialog("Save Sequence")
                            .set_file_name(format!("{}.json", self.player.sequence().name))
                            .save_file()
                        {
                            self.save_sequence(path);
                        }
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.menu_button("View", |ui| {
                    let mut show_library = self.show_library;
                    if ui.checkbox(&mut show_library, "Library").changed() {
                        emitter.emit(ToggleLibraryEvent);
                        ui.close();
                    }
                    if ui.button("Settings…").clicked() {
                        emitter.emit(ToggleSettingsEvent);
                        ui.close();
                    }
                });

                if let Some(msg) = &self.error_msg {
                    ui.separator();
                    ui.colored_label(ui.visuals().error_fg_color, format!("⚠ {}", msg));
                }
            });
        });
    }
}

impl eframe::App for SpriteDeckApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.sync_api();

        if let Some(idx) = self.player.update() {
            trace!("Advanced to frame {}", idx);
        }
        self.frame_cache.poll(ctx);

        self.handle_dropped_files(ctx);

        self.render_menu_bar(ctx);

        let emitter = self.event_bus.emitter();

        if self.show_library {
            egui::SidePanel::left("library_panel")
                .resizable(true)
                .default_width(260.0)
                .show(ctx, |ui| {
                    let actions = widgets::library::render(ui, &self.library, &mut self.library_panel);
                    actions.dispatch(&emitter);
                });
        }

        let total_height = ctx.input(|i| i.viewport_rect()).height();
        let timeline_height = self.timeline_state.timeline_height(total_height);
        egui::TopBottomPanel::bottom("timeline_panel")
            .resizable(false)
            .exact_height(timeline_height)
            .show(ctx, |ui| {
                render_resize_handle(ui, &mut self.timeline_state);
                render_timeline(
                    ui,
                    self.player.sequence(),
                    &self.timeline_state,
                    &mut self.frame_cache,
                    |evt| emitter.emit_boxed(evt),
                );
            });

        let canvas_size = [
            self.context.settings().canvas_width,
            self.context.settings().canvas_height,
        ];
        egui::CentralPanel::default().show(ctx, |ui| {
            widgets::canvas::render_canvas(
                ui,
                &self.player,
                &mut self.frame_cache,
                canvas_size,
                |evt| emitter.emit_boxed(evt),
            );
        });

        // Hotkeys only when no text field has focus
        if !ctx.wants_keyboard_input() {
            ctx.input(|i| self.hotkey_handler.handle_input(i, &emitter));
        }

        // Settings window
        if self.show_settings {
            let mut open = self.show_settings;
            self.context
                .update(|settings| render_settings_window(ctx, &mut open, settings));
            self.show_settings = open;
            self.frame_cache
                .set_capacity(self.context.settings().frame_cache_capacity);
        }
        self.context.settings().theme.apply(ctx);

        // Apply everything widgets, hotkeys and the player queued this frame
        self.handle_events();

        if self.reset_settings_pending {
            self.reset_settings(ctx);
            self.reset_settings_pending = false;
        }

        if let Some(api) = &self.api {
            api.state.publish(PlayerSnapshot::from_player(&self.player));
            ctx.request_repaint_after(API_POLL_INTERVAL);
        }
        if let Some(wait) = self.player.time_until_next_tick() {
            ctx.request_repaint_after(wait);
        }
        if self.frame_cache.pending_count() > 0 {
            ctx.request_repaint_after(Duration::from_millis(16));
        }
    }

    fn save(&mut self, _storage: &mut dyn eframe::Storage) {
        if self.context.is_dirty()
            && let Err(e) = self.context.save()
        {
            error!("Failed to save settings: {:#}", e);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.player.teardown();
        self.timeline_state.teardown();
        if let Err(e) = self.library.save(&self.context.library_path()) {
            error!("Failed to save library: {:#}", e);
        }
        if let Err(e) = self.context.teardown() {
            error!("Failed to save settings: {:#}", e);
        }
        info!("Shutdown complete");
    }
}

/// Frames named on the command line: explicit files, then glob matches.
fn cli_frame_files(args: &Args) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = args.frame_files().cloned().collect();
    if let Some(pattern) = &args.glob {
        match paths::glob_images(pattern) {
            Ok(found) => {
                info!("Glob '{}' matched {} images", pattern, found.len());
                files.extend(found);
            }
            Err(e) => warn!("{:#}", e),
        }
    }
    files
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments first (needed for log setup)
    let args = Args::parse();

    let path_config = PathConfig::from_env_and_cli(args.config_dir.clone());
    if let Err(e) = config::ensure_dirs(&path_config) {
        eprintln!("Warning: Failed to create application directories: {}", e);
    }

    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| config::data_file(config::LOG_FILE, &path_config));

        let file = std::fs::File::create(&log_path)?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .filter_module("egui", log::LevelFilter::Info)
            .filter_module("eframe", log::LevelFilter::Info)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!("Logging to file: {} (level: {:?})", log_path.display(), log_level);
    } else {
        // Console logging (respects RUST_LOG if set)
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .filter_module("egui", log::LevelFilter::Info)
            .filter_module("eframe", log::LevelFilter::Info)
            .format_timestamp_millis()
            .init();
    }

    info!("SpriteDeck starting...");
    debug!("Command-line args: {:?}", args);

    let context = AppContext::init(path_config.clone());
    let workers = Arc::new(Workers::new(Workers::default_size()));
    info!("Worker pool: {} threads", workers.thread_count());

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(format!("SpriteDeck v{}", env!("CARGO_PKG_VERSION")))
            .with_inner_size([1280.0, 800.0])
            .with_resizable(true)
            .with_drag_and_drop(true),
        persist_window: true,
        persistence_path: Some(config::config_file("spritedeck_window.ron", &path_config)),
        ..Default::default()
    };

    eframe::run_native(
        "SpriteDeck",
        native_options,
        Box::new(move |cc| {
            let mut app = SpriteDeckApp::new(context, Arc::clone(&workers));
            app.context.settings().theme.apply(&cc.egui_ctx);

            let duration = args
                .duration_ms
                .unwrap_or(app.default_duration_ms() as i64);

            if let Some(path) = args.sequence.clone() {
                app.open_sequence(path);
            }
            let added = app.add_frame_files(cli_frame_files(&args), duration);
            if added > 0 {
                info!("Loaded {} frames from command line", added);
            }

            app.player.set_looping(args.looping());
            if args.autoplay {
                app.player.play();
            }

            if args.serve || app.context.settings().api_server_enabled {
                let port = args.port.unwrap_or(app.context.settings().api_port());
                let storage_root = args
                    .storage_dir
                    .clone()
                    .unwrap_or_else(|| app.context.storage_dir());
                app.start_api_server(port, storage_root);
            }

            Ok(Box::new(app))
        }),
    )?;

    info!("Application exiting");
    Ok(())
}
