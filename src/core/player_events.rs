//! Player events.
//!
//! Commands (`*Event` structs without payload semantics of a notification)
//! are dispatched by widgets, hotkeys and the REST API and applied in
//! `main_events::handle_app_event`. Notifications are emitted by the
//! [`Player`](super::player::Player) itself after a state change.

// === Commands ===

#[derive(Clone, Debug)]
pub struct TogglePlayPauseEvent;

#[derive(Clone, Debug)]
pub struct PlayEvent;

#[derive(Clone, Debug)]
pub struct PauseEvent;

#[derive(Clone, Debug)]
pub struct StopEvent;

#[derive(Clone, Debug)]
pub struct StepForwardEvent;

#[derive(Clone, Debug)]
pub struct StepBackwardEvent;

#[derive(Clone, Debug)]
pub struct ToggleLoopEvent;

/// Jump to frame index (clamped by the player)
#[derive(Clone, Debug)]
pub struct SelectFrameEvent(pub usize);

/// Append a frame showing `image_url` (placeholder if `None`)
#[derive(Clone, Debug)]
pub struct AddFrameEvent {
    pub image_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct RemoveFrameEvent(pub usize);

#[derive(Clone, Debug)]
pub struct MoveFrameEvent {
    pub from: usize,
    pub to: usize,
}

#[derive(Clone, Debug)]
pub struct SetFrameDurationEvent {
    pub index: usize,
    pub duration_ms: i64,
}

#[derive(Clone, Debug)]
pub struct SetFrameBlurEvent {
    pub index: usize,
    pub blur: f32,
}

/// Rename the sequence; blank names are ignored
#[derive(Clone, Debug)]
pub struct RenameSequenceEvent(pub String);

// === Notifications ===

#[derive(Clone, Debug, PartialEq)]
pub struct CurrentFrameChangedEvent {
    pub old: usize,
    pub new: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackStateChangedEvent {
    pub playing: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SequenceEditedEvent {
    pub frame_count: usize,
}
