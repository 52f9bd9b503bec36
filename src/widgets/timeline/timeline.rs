//! Timeline widget - pane geometry and zoom.
//!
//! The timeline pane sits under the canvas and can be resized by dragging
//! its handle. Height is kept as a percentage of the window so it survives
//! window resizes. Zoom scales the width of frame thumbnails.
//!
//! A resize only reacts to pointer movement while a [`ResizeDrag`] session
//! is open; `end_resize()` / `teardown()` close it.

/// Minimum timeline pane height, percent of window height
pub const MIN_HEIGHT_PERCENT: f32 = 10.0;
/// Maximum timeline pane height, percent of window height
pub const MAX_HEIGHT_PERCENT: f32 = 60.0;
pub const DEFAULT_HEIGHT_PERCENT: f32 = 25.0;

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 3.0;
pub const ZOOM_STEP: f32 = 0.25;

/// Thumbnail width at zoom 1.0, pixels
pub const THUMBNAIL_BASE_WIDTH: f32 = 96.0;
/// Timeline pane never gets shorter than this, pixels
pub const MIN_PANE_HEIGHT: f32 = 100.0;

/// Active resize drag.
#[derive(Clone, Debug, PartialEq)]
pub struct ResizeDrag {
    /// Height when the drag started (for cancel)
    pub initial_percent: f32,
}

/// Timeline geometry state (presentation only, not persisted)
#[derive(Clone, Debug, PartialEq)]
pub struct TimelineState {
    height_percent: f32,
    zoom: f32,
    resize: Option<ResizeDrag>,
}

impl Default for TimelineState {
    fn default() -> Self {
        Self {
            height_percent: DEFAULT_HEIGHT_PERCENT,
            zoom: 1.0,
            resize: None,
        }
    }
}

impl TimelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn height_percent(&self) -> f32 {
        self.height_percent
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    // === Resize ===

    /// Open a resize session. Re-entrant calls keep the original session.
    pub fn begin_resize(&mut self) {
        if self.resize.is_none() {
            log::trace!("Timeline resize started at {:.1}%", self.height_percent);
            self.resize = Some(ResizeDrag {
                initial_percent: self.height_percent,
            });
        }
    }

    pub fn is_resizing(&self) -> bool {
        self.resize.is_some()
    }

    /// Recompute height from the pointer's vertical position.
    /// Ignored outside a resize session. Returns true if height changed.
    pub fn drag_to(&mut self, cursor_y: f32, window_height: f32) -> bool {
        if self.resize.is_none() || !(window_height > 0.0) || !cursor_y.is_finite() {
            return false;
        }
        let percent = (window_height - cursor_y) / window_height * 100.0;
        let clamped = percent.clamp(MIN_HEIGHT_PERCENT, MAX_HEIGHT_PERCENT);
        let changed = clamped != self.height_percent;
        self.height_percent = clamped;
        changed
    }

    /// Close the resize session. Safe to call repeatedly.
    pub fn end_resize(&mut self) {
        if let Some(drag) = self.resize.take() {
            log::trace!(
                "Timeline resize ended: {:.1}% -> {:.1}%",
                drag.initial_percent,
                self.height_percent
            );
        }
    }

    /// Abort the drag and restore the height it started from.
    pub fn cancel_resize(&mut self) {
        if let Some(drag) = self.resize.take() {
            self.height_percent = drag.initial_percent;
        }
    }

    /// Set height directly (handle double-click resets to default), clamped.
    pub fn set_height_percent(&mut self, percent: f32) {
        if percent.is_finite() {
            self.height_percent = percent.clamp(MIN_HEIGHT_PERCENT, MAX_HEIGHT_PERCENT);
        }
    }

    // === Zoom ===

    pub fn zoom_in(&mut self) -> f32 {
        self.set_zoom(self.zoom + ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> f32 {
        self.set_zoom(self.zoom - ZOOM_STEP)
    }

    /// Set zoom, clamped to [MIN_ZOOM, MAX_ZOOM]. Returns stored value.
    pub fn set_zoom(&mut self, zoom: f32) -> f32 {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
        self.zoom
    }

    /// Zoom as displayed in the toolbar ("125%").
    pub fn zoom_percent(&self) -> i32 {
        (self.zoom * 100.0).round() as i32
    }

    // === Derived geometry ===

    pub fn thumbnail_width(&self) -> f32 {
        THUMBNAIL_BASE_WIDTH * self.zoom
    }

    /// Timeline pane height for a given total height (never below MIN_PANE_HEIGHT
    /// unless the total itself is smaller).
    pub fn timeline_height(&self, total: f32) -> f32 {
        let total = total.max(0.0);
        (total * self.height_percent / 100.0).max(MIN_PANE_HEIGHT.min(total))
    }

    /// Remaining height for the canvas.
    pub fn canvas_height(&self, total: f32) -> f32 {
        (total.max(0.0) - self.timeline_height(total)).max(0.0)
    }

    /// Close any open interaction (widget teardown).
    pub fn teardown(&mut self) {
        self.end_resize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_ignored_without_session() {
        let mut state = TimelineState::new();
        assert!(!state.drag_to(100.0, 1000.0));
        assert_eq!(state.height_percent(), DEFAULT_HEIGHT_PERCENT);
    }

    #[test]
    fn test_drag_computes_percent_from_bottom() {
        let mut state = TimelineState::new();
        state.begin_resize();
        assert!(state.drag_to(700.0, 1000.0));
        assert!((state.height_percent() - 30.0).abs() < 1e-4);
        state.end_resize();
        state.end_resize();
        assert!(!state.is_resizing());
        // Session closed - movement ignored
        assert!(!state.drag_to(100.0, 1000.0));
    }

    #[test]
    fn test_drag_clamps() {
        let mut state = TimelineState::new();
        state.begin_resize();
        state.drag_to(0.0, 800.0);
        assert_eq!(state.height_percent(), MAX_HEIGHT_PERCENT);
        state.drag_to(800.0, 800.0);
        assert_eq!(state.height_percent(), MIN_HEIGHT_PERCENT);
        state.drag_to(5000.0, 800.0);
        assert_eq!(state.height_percent(), MIN_HEIGHT_PERCENT);
        state.drag_to(-5000.0, 800.0);
        assert_eq!(state.height_percent(), MAX_HEIGHT_PERCENT);
        assert!(!state.drag_to(10.0, 0.0));
        assert!(!state.drag_to(f32::NAN, 800.0));
    }

    #[test]
    fn test_cancel_restores() {
        let mut state = TimelineState::new();
        state.begin_resize();
        state.drag_to(100.0, 1000.0);
        state.cancel_resize();
        assert_eq!(state.height_percent(), DEFAULT_HEIGHT_PERCENT);
        assert!(!state.is_resizing());
    }

    #[test]
    fn test_pointer_moves_after_cancel_ignored() {
        let mut state = TimelineState::new();
        state.set_height_percent(40.0);
        state.begin_resize();
        assert!(state.drag_to(900.0, 1000.0));
        state.cancel_resize();
        // Pointer keeps moving until the button is released
        assert!(!state.drag_to(500.0, 1000.0));
        state.end_resize();
        assert_eq!(state.height_percent(), 40.0);
        state.set_height_percent(DEFAULT_HEIGHT_PERCENT);
        assert_eq!(state.height_percent(), DEFAULT_HEIGHT_PERCENT);
    }

    #[test]
    fn test_zoom_bounds() {
        let mut state = TimelineState::new();
        for _ in 0..20 {
            state.zoom_in();
        }
        assert_eq!(state.zoom(), MAX_ZOOM);
        assert_eq!(state.zoom_percent(), 300);
        for _ in 0..20 {
            state.zoom_out();
        }
        assert_eq!(state.zoom(), MIN_ZOOM);
        assert_eq!(state.thumbnail_width(), 48.0);
        assert_eq!(state.set_zoom(f32::INFINITY), MIN_ZOOM);
    }

    #[test]
    fn test_pane_heights() {
        let mut state = TimelineState::new();
        assert_eq!(state.timeline_height(1000.0), 250.0);
        assert_eq!(state.canvas_height(1000.0), 750.0);
        state.set_height_percent(10.0);
        // Pane minimum wins on small windows
        assert_eq!(state.timeline_height(600.0), 100.0);
        assert_eq!(state.timeline_height(50.0), 50.0);
        assert_eq!(state.canvas_height(50.0), 0.0);
    }
}
