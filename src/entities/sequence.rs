//! Frame sequence - ordered frames plus the index of the displayed one.
//!
//! All index-taking operations clamp instead of failing: an out-of-range
//! request is a UI consistency matter, never an error. The sequence itself
//! knows nothing about playback; [`Player`](crate::core::player::Player)
//! wraps it and re-arms its timer after every mutation.

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::frame::Frame;

/// Ordered frames with a current index.
///
/// Invariant: `current < frames.len()` when frames exist, `current == 0` otherwise.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Sequence {
    pub name: String,
    frames: Vec<Frame>,
    current: usize,
}

impl Sequence {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frames: Vec::new(),
            current: 0,
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.frames.get(self.current)
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 >= self.frames.len()
    }

    /// Sum of all frame durations.
    pub fn total_duration_ms(&self) -> u64 {
        self.frames.iter().map(|f| f.duration_ms() as u64).sum()
    }

    /// Largest valid index, or 0 for an empty sequence.
    fn last_index(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }

    /// Set current index, clamped to the valid range. Returns the stored index.
    pub fn set_current(&mut self, index: usize) -> usize {
        self.current = index.min(self.last_index());
        self.current
    }

    /// Move current index by `delta`, clamped to `[0, len-1]`.
    pub fn step(&mut self, delta: isize) -> usize {
        let target = self.current.saturating_add_signed(delta);
        self.set_current(target)
    }

    /// Append frame at the end. Returns its index.
    pub fn add_frame(&mut self, frame: Frame) -> usize {
        debug!("Sequence '{}': add frame {} ({})", self.name, frame.id, frame.image_url);
        self.frames.push(frame);
        self.frames.len() - 1
    }

    /// Remove frame at `index`.
    ///
    /// `current_index` follows the displayed frame, not the position:
    /// removing a frame before it decrements the index (a purely positional
    /// index would silently jump to the next frame). Removing the current or
    /// a later frame only clamps the index into the shortened range.
    pub fn remove_frame(&mut self, index: usize) -> Option<Frame> {
        if index >= self.frames.len() {
            return None;
        }
        let removed = self.frames.remove(index);
        if index < self.current {
            self.current -= 1;
        }
        self.current = self.current.min(self.last_index());
        debug!("Sequence '{}': removed frame {} at {}", self.name, removed.id, index);
        Some(removed)
    }

    /// Move frame from `from` to `to` (both clamped). Current frame follows
    /// its content, so the display doesn't jump.
    pub fn move_frame(&mut self, from: usize, to: usize) -> bool {
        if from >= self.frames.len() {
            return false;
        }
        let to = to.min(self.last_index());
        if from == to {
            return false;
        }
        let current_id = self.current_frame().map(|f| f.id);
        let frame = self.frames.remove(from);
        self.frames.insert(to, frame);
        if let Some(id) = current_id
            && let Some(pos) = self.frames.iter().position(|f| f.id == id)
        {
            self.current = pos;
        }
        true
    }

    /// Update duration of frame at `index` (clamped). Returns the stored value.
    pub fn set_frame_duration(&mut self, index: usize, ms: i64) -> Option<u32> {
        self.frames.get_mut(index).map(|f| f.set_duration_ms(ms))
    }

    /// Update blur of frame at `index`. Returns `Some(stored)` if the frame exists.
    pub fn set_frame_blur(&mut self, index: usize, px: f32) -> Option<Option<f32>> {
        self.frames.get_mut(index).map(|f| f.set_blur(px))
    }

    /// Clamp everything loaded from disk back into range.
    fn normalize(&mut self) {
        for frame in &mut self.frames {
            frame.normalize();
        }
        self.current = self.current.min(self.last_index());
    }

    /// Save sequence as pretty JSON. Adds `.json` extension if missing.
    /// Returns the path actually written.
    pub fn to_json<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(self).context("Serialize sequence")?;

        let path = path.as_ref();
        let path = if path.extension().and_then(|s| s.to_str()) != Some("json") {
            path.with_extension("json")
        } else {
            path.to_path_buf()
        };

        fs::write(&path, json)
            .with_context(|| format!("Write sequence: {}", path.display()))?;
        Ok(path)
    }

    /// Load sequence from JSON, normalizing durations and the current index.
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Read sequence: {}", path.display()))?;
        let mut sequence: Sequence = serde_json::from_str(&json)
            .with_context(|| format!("Parse sequence: {}", path.display()))?;
        sequence.normalize();
        Ok(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq_with(n: usize) -> Sequence {
        let mut seq = Sequence::new("test");
        for i in 0..n {
            seq.add_frame(Frame::new(format!("{i}.png"), 100));
        }
        seq
    }

    #[test]
    fn test_empty_sequence_index_is_zero() {
        let mut seq = Sequence::new("empty");
        assert_eq!(seq.set_current(5), 0);
        assert_eq!(seq.step(1), 0);
        assert_eq!(seq.step(-1), 0);
        assert!(seq.current_frame().is_none());
    }

    #[test]
    fn test_step_clamps() {
        let mut seq = seq_with(3);
        assert_eq!(seq.step(-1), 0);
        assert_eq!(seq.step(1), 1);
        assert_eq!(seq.step(1), 2);
        assert_eq!(seq.step(1), 2);
        assert_eq!(seq.step(isize::MIN), 0);
    }

    #[test]
    fn test_remove_current_last_frame_clamps() {
        let mut seq = seq_with(3);
        seq.set_current(2);
        seq.remove_frame(2);
        assert_eq!(seq.current_index(), 1);
        assert_eq!(seq.len(), 2);
    }

    #[test]
    fn test_remove_before_current_keeps_displayed_frame() {
        let mut seq = seq_with(4);
        seq.set_current(2);
        let shown = seq.current_frame().unwrap().id;
        seq.remove_frame(0);
        assert_eq!(seq.current_index(), 1);
        assert_eq!(seq.current_frame().unwrap().id, shown);
    }

    #[test]
    fn test_remove_all_frames() {
        let mut seq = seq_with(2);
        seq.set_current(1);
        seq.remove_frame(1);
        seq.remove_frame(0);
        assert!(seq.is_empty());
        assert_eq!(seq.current_index(), 0);
        assert!(seq.remove_frame(0).is_none());
    }

    #[test]
    fn test_index_invariant_under_mixed_edits() {
        let mut seq = seq_with(5);
        let ops: [(usize, isize); 8] = [(4, 1), (0, -1), (3, 2), (1, 0), (0, 5), (2, -3), (9, 1), (0, 0)];
        for (remove_at, step) in ops {
            seq.step(step);
            seq.remove_frame(remove_at);
            if !seq.is_empty() {
                assert!(seq.current_index() < seq.len());
            } else {
                assert_eq!(seq.current_index(), 0);
            }
            seq.add_frame(Frame::placeholder());
            assert!(seq.current_index() < seq.len());
        }
    }

    #[test]
    fn test_move_frame_current_follows() {
        let mut seq = seq_with(3);
        seq.set_current(0);
        let shown = seq.current_frame().unwrap().id;
        assert!(seq.move_frame(0, 2));
        assert_eq!(seq.current_index(), 2);
        assert_eq!(seq.current_frame().unwrap().id, shown);
        assert!(!seq.move_frame(7, 0));
    }

    #[test]
    fn test_total_duration() {
        let mut seq = seq_with(3);
        seq.set_frame_duration(1, 9999);
        assert_eq!(seq.total_duration_ms(), 1200);
        assert_eq!(seq.set_frame_duration(10, 100), None);
    }

    #[test]
    fn test_json_roundtrip_normalizes() {
        let dir = std::env::temp_dir().join(format!("spritedeck_seq_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();

        let mut seq = seq_with(2);
        seq.set_current(1);
        seq.set_frame_blur(0, 3.0);
        let written = seq.to_json(dir.join("walk")).unwrap();
        assert_eq!(written.extension().and_then(|s| s.to_str()), Some("json"));

        let loaded = Sequence::from_json(&written).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.current_index(), 1);
        assert_eq!(loaded.get(0).unwrap().blur(), Some(3.0));

        // Hand-edited file with an index past the end
        fs::write(dir.join("bad.json"), r#"{"name":"bad","frames":[],"current":7}"#).unwrap();
        let bad = Sequence::from_json(dir.join("bad.json")).unwrap();
        assert_eq!(bad.current_index(), 0);

        let _ = fs::remove_dir_all(&dir);
    }
}
