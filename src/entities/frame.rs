//! Sequence frame - one image shown for a fixed number of milliseconds.
//!
//! Frames are owned by a [`Sequence`](super::sequence::Sequence). The image
//! reference is opaque here; only the frame cache knows how to turn it into
//! pixels.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shortest display time a frame may have (matches the duration slider).
pub const MIN_FRAME_DURATION_MS: u32 = 50;
/// Longest display time a frame may have.
pub const MAX_FRAME_DURATION_MS: u32 = 1000;
/// Duration given to frames created without an explicit value.
pub const DEFAULT_FRAME_DURATION_MS: u32 = 100;
/// Slider step for duration edits.
pub const FRAME_DURATION_STEP_MS: u32 = 50;

/// Image reference used for frames added without a source image.
/// The frame cache renders it without touching the filesystem.
pub const PLACEHOLDER_IMAGE: &str = "builtin:placeholder";

/// Clamp an arbitrary duration request into the allowed range.
///
/// Accepts a signed value so that UI and API input (which may be negative or
/// absurdly large) never needs a separate validation path.
pub fn clamp_duration_ms(ms: i64) -> u32 {
    ms.clamp(MIN_FRAME_DURATION_MS as i64, MAX_FRAME_DURATION_MS as i64) as u32
}

/// Clamp a blur radius. Non-finite and negative values become 0.
pub fn clamp_blur(px: f32) -> f32 {
    if px.is_finite() { px.max(0.0) } else { 0.0 }
}

/// Single frame of a sequence
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub id: Uuid,
    pub image_url: String,
    duration_ms: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    blur: Option<f32>,
}

impl Frame {
    /// Create a frame with a clamped duration and no blur.
    pub fn new(image_url: impl Into<String>, duration_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            image_url: image_url.into(),
            duration_ms: clamp_duration_ms(duration_ms),
            blur: None,
        }
    }

    /// Frame pointing at the placeholder image with the default duration.
    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER_IMAGE, DEFAULT_FRAME_DURATION_MS as i64)
    }

    pub fn duration_ms(&self) -> u32 {
        self.duration_ms
    }

    /// Set duration, clamped to [MIN_FRAME_DURATION_MS, MAX_FRAME_DURATION_MS].
    /// Returns the stored value.
    pub fn set_duration_ms(&mut self, ms: i64) -> u32 {
        self.duration_ms = clamp_duration_ms(ms);
        self.duration_ms
    }

    /// Blur radius in pixels, `None` when the frame is sharp.
    pub fn blur(&self) -> Option<f32> {
        self.blur
    }

    /// Set blur radius. Zero (after clamping) clears the blur.
    pub fn set_blur(&mut self, px: f32) -> Option<f32> {
        let px = clamp_blur(px);
        self.blur = (px > 0.0).then_some(px);
        self.blur
    }

    /// Restore invariants after deserialization of hand-edited files.
    pub(crate) fn normalize(&mut self) {
        self.duration_ms = clamp_duration_ms(self.duration_ms as i64);
        if let Some(px) = self.blur {
            self.set_blur(px);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_clamped_on_create() {
        assert_eq!(Frame::new("a.png", 9999).duration_ms(), 1000);
        assert_eq!(Frame::new("a.png", 0).duration_ms(), 50);
        assert_eq!(Frame::new("a.png", -20).duration_ms(), 50);
        assert_eq!(Frame::new("a.png", 250).duration_ms(), 250);
    }

    #[test]
    fn test_set_duration_returns_stored_value() {
        let mut frame = Frame::placeholder();
        assert_eq!(frame.duration_ms(), DEFAULT_FRAME_DURATION_MS);
        assert_eq!(frame.set_duration_ms(1001), 1000);
        assert_eq!(frame.set_duration_ms(49), 50);
    }

    #[test]
    fn test_blur_clamping() {
        let mut frame = Frame::placeholder();
        assert_eq!(frame.set_blur(2.5), Some(2.5));
        assert_eq!(frame.set_blur(-3.0), None);
        assert_eq!(frame.set_blur(f32::NAN), None);
        assert_eq!(frame.blur(), None);
    }

    #[test]
    fn test_normalize_fixes_out_of_range_json() {
        let json = r#"{"id":"6f1c3c64-4a3e-4a57-9d4e-0b7d0f7b8a11","image_url":"x.png","duration_ms":5,"blur":-1.0}"#;
        let mut frame: Frame = serde_json::from_str(json).unwrap();
        frame.normalize();
        assert_eq!(frame.duration_ms(), 50);
        assert_eq!(frame.blur(), None);
    }
}
