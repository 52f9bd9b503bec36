//! Timeline widget - frame strip under the canvas
//!
//! Resizable pane with one thumbnail per frame, zoom controls and the
//! duration slider for the current frame.

mod timeline;
pub mod timeline_events;
mod timeline_ui;

pub use timeline::{
    DEFAULT_HEIGHT_PERCENT, MAX_HEIGHT_PERCENT, MAX_ZOOM, MIN_HEIGHT_PERCENT, MIN_ZOOM,
    ResizeDrag, THUMBNAIL_BASE_WIDTH, TimelineState, ZOOM_STEP,
};
pub use timeline_ui::{render_resize_handle, render_timeline};
