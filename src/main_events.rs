//! Application event handling - extracted from main.rs for clarity.
//!
//! Widgets, hotkeys and the REST API never touch the player or library
//! directly. Their events are drained from the bus once per frame and applied
//! here, on the UI thread. Player notifications (frame changed, etc.) travel
//! the same queue and are left unhandled.
//!
//! Note: always downcast through `downcast_event`, which derefs the box
//! before calling `as_any()`. Calling `as_any()` on `&Box<dyn Event>` hits
//! the blanket impl for the box itself and every downcast fails.

use log::{debug, warn};
use std::path::Path;

use crate::core::event_bus::{BoxedEvent, downcast_event};
use crate::core::player::Player;
use crate::core::player_events::*;
use crate::dialogs::prefs::prefs_events::*;
use crate::entities::asset::{Asset, AssetCategory, AssetUpdate};
use crate::entities::frame::{Frame, PLACEHOLDER_IMAGE};
use crate::entities::library::Library;
use crate::server::ApiCommand;
use crate::server::upload::AssetPack;
use crate::widgets::library::library_events::*;
use crate::widgets::timeline::TimelineState;
use crate::widgets::timeline::timeline_events::*;

/// Result of handling an app event - deferred work for the caller
#[derive(Debug, Default, PartialEq)]
pub struct EventResult {
    /// Library was modified and should be saved
    pub library_changed: bool,
}

/// Mutable app state events are applied to
pub struct EventTargets<'a> {
    pub player: &'a mut Player,
    pub library: &'a mut Library,
    pub timeline_state: &'a mut TimelineState,
    pub show_settings: &'a mut bool,
    pub show_library: &'a mut bool,
    pub reset_settings_pending: &'a mut bool,
    /// Duration for frames created without an explicit one
    pub default_duration_ms: u32,
}

fn asset_from_path(path: &Path, category: AssetCategory) -> Asset {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Asset::new(name, category, path.to_string_lossy().into_owned())
}

/// Library entry for an uploaded pack
pub fn asset_from_pack(pack: &AssetPack) -> Asset {
    let mut asset = Asset::new(pack.name.clone(), AssetCategory::Custom, pack.original_image_url.clone());
    asset.thumbnail_url = pack.thumbnail_url.clone();
    asset
}

/// Handle a single app event (called from main event loop).
/// Returns Some(result) if event was handled, None otherwise.
pub fn handle_app_event(event: &BoxedEvent, t: &mut EventTargets) -> Option<EventResult> {
    let mut result = EventResult::default();

    // === Playback Control ===
    if downcast_event::<TogglePlayPauseEvent>(event).is_some() {
        t.player.toggle_play();
        return Some(result);
    }
    if downcast_event::<PlayEvent>(event).is_some() {
        t.player.play();
        return Some(result);
    }
    if downcast_event::<PauseEvent>(event).is_some() {
        t.player.pause();
        return Some(result);
    }
    if downcast_event::<StopEvent>(event).is_some() {
        t.player.stop();
        return Some(result);
    }
    if downcast_event::<StepForwardEvent>(event).is_some() {
        t.player.step_forward();
        return Some(result);
    }
    if downcast_event::<StepBackwardEvent>(event).is_some() {
        t.player.step_backward();
        return Some(result);
    }
    if downcast_event::<ToggleLoopEvent>(event).is_some() {
        t.player.toggle_loop();
        return Some(result);
    }
    if let Some(e) = downcast_event::<SelectFrameEvent>(event) {
        t.player.select_frame(e.0);
        return Some(result);
    }

    // === Frame Edits ===
    if let Some(e) = downcast_event::<AddFrameEvent>(event) {
        let url = e.image_url.clone().unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string());
        let idx = t.player.add_frame(Frame::new(url, t.default_duration_ms as i64));
        debug!("AddFrame: appended at {}", idx);
        return Some(result);
    }
    if let Some(e) = downcast_event::<RemoveFrameEvent>(event) {
        if t.player.remove_frame(e.0).is_none() {
            debug!("RemoveFrame: no frame at {}", e.0);
        }
        return Some(result);
    }
    if let Some(e) = downcast_event::<MoveFrameEvent>(event) {
        t.player.move_frame(e.from, e.to);
        return Some(result);
    }
    if let Some(e) = downcast_event::<SetFrameDurationEvent>(event) {
        t.player.set_frame_duration(e.index, e.duration_ms);
        return Some(result);
    }
    if let Some(e) = downcast_event::<SetFrameBlurEvent>(event) {
        t.player.set_frame_blur(e.index, e.blur);
        return Some(result);
    }
    if let Some(e) = downcast_event::<RenameSequenceEvent>(event) {
        let name = e.0.trim();
        if !name.is_empty() {
            t.player.rename(name);
        }
        return Some(result);
    }

    // === Timeline ===
    if downcast_event::<TimelineZoomInEvent>(event).is_some() {
        t.timeline_state.zoom_in();
        return Some(result);
    }
    if downcast_event::<TimelineZoomOutEvent>(event).is_some() {
        t.timeline_state.zoom_out();
        return Some(result);
    }
    if downcast_event::<TimelineZoomResetEvent>(event).is_some() {
        t.timeline_state.set_zoom(1.0);
        return Some(result);
    }

    // === Library ===
    if let Some(e) = downcast_event::<UseAssetEvent>(event) {
        match t.library.get(e.0) {
            Some(asset) => {
                t.player.add_frame(asset.to_frame(t.default_duration_ms as i64));
            }
            None => warn!("UseAsset: unknown asset {}", e.0),
        }
        return Some(result);
    }
    if let Some(e) = downcast_event::<ToggleFavoriteEvent>(event) {
        result.library_changed = t.library.toggle_favorite(e.0).is_some();
        return Some(result);
    }
    if let Some(e) = downcast_event::<DuplicateAssetEvent>(event) {
        result.library_changed = t.library.duplicate(e.0).is_some();
        return Some(result);
    }
    if let Some(e) = downcast_event::<DeleteAssetEvent>(event) {
        result.library_changed = t.library.delete(e.0).is_some();
        return Some(result);
    }
    if let Some(e) = downcast_event::<MoveAssetEvent>(event) {
        result.library_changed = t.library.move_to_category(e.id, e.category);
        return Some(result);
    }
    if let Some(e) = downcast_event::<RenameAssetEvent>(event) {
        result.library_changed = t.library.update(
            e.id,
            AssetUpdate {
                name: Some(e.name.clone()),
                ..Default::default()
            },
        );
        return Some(result);
    }
    if let Some(e) = downcast_event::<TagAssetEvent>(event) {
        let tags = t.library.get(e.id).map(|a| {
            let mut tags = a.tags.clone();
            if !tags.contains(&e.tag) {
                tags.push(e.tag.clone());
            }
            tags
        });
        if let Some(tags) = tags {
            result.library_changed = t.library.update(
                e.id,
                AssetUpdate {
                    tags: Some(tags),
                    ..Default::default()
                },
            );
        }
        return Some(result);
    }
    if let Some(e) = downcast_event::<CreateTagEvent>(event) {
        t.library.add_tag(e.name.clone(), e.color.clone());
        result.library_changed = true;
        return Some(result);
    }
    if let Some(e) = downcast_event::<ImportAssetsEvent>(event) {
        for path in &e.paths {
            t.library.add(asset_from_path(path, e.category));
        }
        debug!("Imported {} assets into {}", e.paths.len(), e.category);
        result.library_changed = !e.paths.is_empty();
        return Some(result);
    }

    // === Dialogs / Panels ===
    if downcast_event::<ToggleSettingsEvent>(event).is_some() {
        *t.show_settings = !*t.show_settings;
        return Some(result);
    }
    if downcast_event::<ToggleLibraryEvent>(event).is_some() {
        *t.show_library = !*t.show_library;
        return Some(result);
    }
    if downcast_event::<ResetSettingsEvent>(event).is_some() {
        *t.reset_settings_pending = true;
        return Some(result);
    }

    // Event not handled
    None
}

/// Apply a command received from the REST API.
pub fn handle_api_command(cmd: ApiCommand, player: &mut Player, library: &mut Library) -> EventResult {
    let mut result = EventResult::default();
    match cmd {
        ApiCommand::Play => player.play(),
        ApiCommand::Pause => player.pause(),
        ApiCommand::Stop => player.stop(),
        ApiCommand::Next => {
            player.step_forward();
        }
        ApiCommand::Prev => {
            player.step_backward();
        }
        ApiCommand::ToggleLoop => {
            player.toggle_loop();
        }
        ApiCommand::SelectFrame(idx) => {
            player.select_frame(idx);
        }
        ApiCommand::AssetUploaded(pack) => {
            debug!("API upload '{}' added to library", pack.name);
            library.add(asset_from_pack(&pack));
            result.library_changed = true;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scheduler::ManualClock;
    use std::path::PathBuf;

    struct Harness {
        player: Player,
        library: Library,
        timeline: TimelineState,
        show_settings: bool,
        show_library: bool,
        reset: bool,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                player: Player::with_clock(ManualClock::new()),
                library: Library::new(),
                timeline: TimelineState::new(),
                show_settings: false,
                show_library: true,
                reset: false,
            }
        }

        fn handle<E: crate::core::event_bus::Event>(&mut self, event: E) -> Option<EventResult> {
            let boxed: BoxedEvent = Box::new(event);
            let mut targets = EventTargets {
                player: &mut self.player,
                library: &mut self.library,
                timeline_state: &mut self.timeline,
                show_settings: &mut self.show_settings,
                show_library: &mut self.show_library,
                reset_settings_pending: &mut self.reset,
                default_duration_ms: 150,
            };
            handle_app_event(&boxed, &mut targets)
        }
    }

    #[test]
    fn test_frame_events_reach_player() {
        let mut h = Harness::new();
        h.handle(AddFrameEvent { image_url: None });
        h.handle(AddFrameEvent {
            image_url: Some("b.png".into()),
        });
        assert_eq!(h.player.sequence().len(), 2);
        assert_eq!(h.player.sequence().frames()[0].image_url, PLACEHOLDER_IMAGE);
        assert_eq!(h.player.sequence().frames()[0].duration_ms(), 150);

        h.handle(SetFrameDurationEvent {
            index: 1,
            duration_ms: 9999,
        });
        assert_eq!(h.player.sequence().frames()[1].duration_ms(), 1000);

        h.handle(SelectFrameEvent(1));
        h.handle(RemoveFrameEvent(1));
        assert_eq!(h.player.current_index(), 0);

        h.handle(TogglePlayPauseEvent);
        assert!(h.player.is_playing());
        h.handle(StopEvent);
        assert!(!h.player.is_playing());
    }

    #[test]
    fn test_rename_sequence_ignores_blank_names() {
        let mut h = Harness::new();
        assert!(h.handle(RenameSequenceEvent("  Blink loop ".into())).is_some());
        assert_eq!(h.player.sequence().name, "Blink loop");
        h.handle(RenameSequenceEvent("   ".into()));
        assert_eq!(h.player.sequence().name, "Blink loop");
    }

    #[test]
    fn test_timeline_and_dialog_events() {
        let mut h = Harness::new();
        h.handle(TimelineZoomInEvent);
        assert_eq!(h.timeline.zoom(), 1.25);
        h.handle(TimelineZoomResetEvent);
        assert_eq!(h.timeline.zoom(), 1.0);
        h.handle(ToggleSettingsEvent);
        assert!(h.show_settings);
        h.handle(ToggleLibraryEvent);
        assert!(!h.show_library);
    }

    #[test]
    fn test_library_events() {
        let mut h = Harness::new();
        let result = h
            .handle(ImportAssetsEvent {
                category: AssetCategory::Parts,
                paths: vec![PathBuf::from("/art/ears.png")],
            })
            .unwrap();
        assert!(result.library_changed);
        let id = h.library.assets()[0].id;
        assert_eq!(h.library.assets()[0].name, "ears");

        h.handle(TagAssetEvent { id, tag: "cute".into() });
        h.handle(TagAssetEvent { id, tag: "cute".into() });
        assert_eq!(h.library.get(id).unwrap().tags, vec!["cute".to_string()]);

        h.handle(UseAssetEvent(id));
        assert_eq!(h.player.sequence().frames()[0].image_url, "/art/ears.png");

        let unknown = h.handle(DeleteAssetEvent(uuid::Uuid::new_v4())).unwrap();
        assert!(!unknown.library_changed);
    }

    #[test]
    fn test_notifications_unhandled() {
        let mut h = Harness::new();
        assert!(h.handle(PlaybackStateChangedEvent { playing: true }).is_none());
    }

    #[test]
    fn test_api_commands() {
        let mut player = Player::with_clock(ManualClock::new());
        let mut library = Library::new();
        player.add_frame(Frame::new("a.png", 100));
        player.add_frame(Frame::new("b.png", 100));

        handle_api_command(ApiCommand::SelectFrame(5), &mut player, &mut library);
        assert_eq!(player.current_index(), 1);
        handle_api_command(ApiCommand::Prev, &mut player, &mut library);
        assert_eq!(player.current_index(), 0);
        handle_api_command(ApiCommand::ToggleLoop, &mut player, &mut library);
        assert!(!player.is_looping());

        let pack = AssetPack {
            id: uuid::Uuid::new_v4(),
            user_id: "alice".into(),
            name: "Bunny".into(),
            description: None,
            original_image_url: "/store/alice/1.png".into(),
            thumbnail_url: "/store/alice/1.png".into(),
            status: Default::default(),
            created_at: 0,
        };
        let result = handle_api_command(ApiCommand::AssetUploaded(pack), &mut player, &mut library);
        assert!(result.library_changed);
        assert_eq!(library.assets()[0].category, AssetCategory::Custom);
        assert_eq!(library.assets()[0].file_url, "/store/alice/1.png");
    }
}
