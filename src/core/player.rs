//! Playback controller with per-frame timing.
//!
//! Player owns the [`Sequence`] and the single playback timer. Unlike a
//! fixed-fps player, each frame carries its own display time: the timer for
//! frame `i` is due `frames[i].duration_ms` after it was armed.
//!
//! # Timing Model
//!
//! - At most one timer is pending ([`TaskSlot`]).
//! - Any mutation (play/pause/step/loop/frame edit/frame list edit) cancels
//!   the pending timer and re-arms it for the current frame, so a tick can
//!   never act on a frame that no longer exists.
//! - Ticks fired during `update()` chain from the previous deadline, not from
//!   "now", so slow UI frames don't stretch the animation. More than
//!   [`MAX_TICKS_PER_UPDATE`] overdue ticks resynchronise to the clock.
//!
//! # End of sequence
//!
//! When the last frame's timer fires: loop back to 0 if looping, otherwise
//! stop without arming another timer.

use log::{debug, info, trace, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::event_bus::{Event, EventEmitter};
use super::player_events::{CurrentFrameChangedEvent, PlaybackStateChangedEvent, SequenceEditedEvent};
use super::scheduler::{Clock, SystemClock, TaskSlot};
use crate::entities::frame::Frame;
use crate::entities::sequence::Sequence;

/// Overdue ticks processed per `update()` before resynchronising.
pub const MAX_TICKS_PER_UPDATE: usize = 64;

/// Timer payload: the frame index the timer was armed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTick {
    pub index: usize,
}

/// Playback state manager (owns the frame sequence)
pub struct Player {
    sequence: Sequence,
    is_playing: bool,
    is_looping: bool,
    timer: TaskSlot<FrameTick>,
    clock: Arc<dyn Clock>,
    events: Option<EventEmitter>,
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("frames", &self.sequence.len())
            .field("current", &self.sequence.current_index())
            .field("is_playing", &self.is_playing)
            .field("is_looping", &self.is_looping)
            .field("timer_due", &self.timer.due())
            .finish()
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

impl Player {
    /// Create player on the system clock with an empty sequence.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            sequence: Sequence::new("Untitled"),
            is_playing: false,
            is_looping: true,
            timer: TaskSlot::new(),
            clock,
            events: None,
        }
    }

    /// Route notifications (frame changed, play state, edits) to the bus.
    pub fn set_event_emitter(&mut self, emitter: EventEmitter) {
        self.events = Some(emitter);
    }

    fn emit<E: Event>(&self, event: E) {
        if let Some(ref emitter) = self.events {
            emitter.emit(event);
        }
    }

    // === Accessors ===

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn current_index(&self) -> usize {
        self.sequence.current_index()
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.sequence.current_frame()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_looping(&self) -> bool {
        self.is_looping
    }

    pub fn has_pending_timer(&self) -> bool {
        self.timer.is_pending()
    }

    /// Deadline of the pending frame timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.due()
    }

    /// Time until the next tick, for scheduling repaints.
    pub fn time_until_next_tick(&self) -> Option<Duration> {
        self.timer.remaining(self.clock.now())
    }

    // === Internal state transitions ===

    fn set_playing(&mut self, playing: bool) {
        if self.is_playing != playing {
            self.is_playing = playing;
            debug!("Playback {}", if playing { "started" } else { "stopped" });
            self.emit(PlaybackStateChangedEvent { playing });
        }
    }

    /// Move current index (clamped), emitting a change notification.
    fn move_to(&mut self, index: usize) -> usize {
        let old = self.sequence.current_index();
        let new = self.sequence.set_current(index);
        if old != new {
            self.emit(CurrentFrameChangedEvent { old, new });
        }
        new
    }

    fn step_by(&mut self, delta: isize) -> usize {
        let old = self.sequence.current_index();
        let new = self.sequence.step(delta);
        if old != new {
            self.emit(CurrentFrameChangedEvent { old, new });
        }
        new
    }

    /// Cancel the pending timer and arm a fresh one for the current frame.
    fn rearm(&mut self) {
        self.timer.cancel();
        if !self.is_playing {
            return;
        }
        let Some(frame) = self.sequence.current_frame() else {
            // Empty sequence can't play
            self.set_playing(false);
            return;
        };
        let due = self.clock.now() + Duration::from_millis(frame.duration_ms() as u64);
        let index = self.sequence.current_index();
        self.timer.schedule(FrameTick { index }, due);
    }

    fn edited(&mut self) {
        let frame_count = self.sequence.len();
        self.emit(SequenceEditedEvent { frame_count });
    }

    // === Transport ===

    /// Start playback from the current frame. No-op when already playing
    /// or when there are no frames.
    pub fn play(&mut self) {
        if self.is_playing || self.sequence.is_empty() {
            return;
        }
        self.set_playing(true);
        self.rearm();
        trace!("Play from frame {}", self.sequence.current_index());
    }

    /// Stop advancing, keep the current frame.
    pub fn pause(&mut self) {
        self.timer.cancel();
        self.set_playing(false);
    }

    /// Stop and rewind to the first frame.
    pub fn stop(&mut self) {
        self.timer.cancel();
        self.set_playing(false);
        self.move_to(0);
    }

    pub fn toggle_play(&mut self) {
        if self.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn step_forward(&mut self) -> usize {
        let index = self.step_by(1);
        self.rearm();
        index
    }

    pub fn step_backward(&mut self) -> usize {
        let index = self.step_by(-1);
        self.rearm();
        index
    }

    /// Jump to frame (clamped). Playback state unchanged.
    pub fn select_frame(&mut self, index: usize) -> usize {
        let index = self.move_to(index);
        self.rearm();
        index
    }

    pub fn set_looping(&mut self, looping: bool) {
        if self.is_looping != looping {
            self.is_looping = looping;
            debug!("Loop {}", if looping { "enabled" } else { "disabled" });
            self.rearm();
        }
    }

    pub fn toggle_loop(&mut self) -> bool {
        self.set_looping(!self.is_looping);
        self.is_looping
    }

    // === Sequence edits ===

    /// Append frame. Returns its index.
    pub fn add_frame(&mut self, frame: Frame) -> usize {
        let index = self.sequence.add_frame(frame);
        self.edited();
        self.rearm();
        index
    }

    /// Remove frame; current index is kept valid, empty sequence stops playback.
    pub fn remove_frame(&mut self, index: usize) -> Option<Frame> {
        let old_index = self.sequence.current_index();
        let old_shown = self.sequence.current_frame().map(|f| f.id);

        let removed = self.sequence.remove_frame(index)?;

        let new_index = self.sequence.current_index();
        let new_shown = self.sequence.current_frame().map(|f| f.id);
        if old_index != new_index || old_shown != new_shown {
            self.emit(CurrentFrameChangedEvent {
                old: old_index,
                new: new_index,
            });
        }
        if self.sequence.is_empty() {
            self.set_playing(false);
        }
        self.edited();
        self.rearm();
        Some(removed)
    }

    pub fn move_frame(&mut self, from: usize, to: usize) -> bool {
        let old = self.sequence.current_index();
        if !self.sequence.move_frame(from, to) {
            return false;
        }
        let new = self.sequence.current_index();
        if old != new {
            self.emit(CurrentFrameChangedEvent { old, new });
        }
        self.edited();
        self.rearm();
        true
    }

    /// Set frame duration, clamped to the slider range. Returns stored value.
    pub fn set_frame_duration(&mut self, index: usize, ms: i64) -> Option<u32> {
        let stored = self.sequence.set_frame_duration(index, ms)?;
        if stored as i64 != ms {
            debug!("Frame {} duration {}ms clamped to {}ms", index, ms, stored);
        }
        self.edited();
        self.rearm();
        Some(stored)
    }

    pub fn set_frame_blur(&mut self, index: usize, px: f32) -> Option<Option<f32>> {
        let stored = self.sequence.set_frame_blur(index, px)?;
        self.edited();
        self.rearm();
        Some(stored)
    }

    /// Swap in a whole sequence (file load). Playback stops.
    /// Returns the previous sequence.
    pub fn replace_sequence(&mut self, sequence: Sequence) -> Sequence {
        self.timer.cancel();
        self.set_playing(false);
        let old_index = self.sequence.current_index();
        let old = std::mem::replace(&mut self.sequence, sequence);
        info!(
            "Sequence '{}' loaded: {} frames, {}ms",
            self.sequence.name,
            self.sequence.len(),
            self.sequence.total_duration_ms()
        );
        self.emit(CurrentFrameChangedEvent {
            old: old_index,
            new: self.sequence.current_index(),
        });
        self.edited();
        old
    }

    /// Rename the sequence (also the default file name on save).
    pub fn rename(&mut self, name: impl Into<String>) {
        let name = name.into();
        if self.sequence.name != name {
            debug!("Sequence renamed: '{}' -> '{}'", self.sequence.name, name);
            self.sequence.name = name;
        }
    }

    // === Playback loop ===

    /// Fire due timers. Returns the current index if at least one tick fired.
    pub fn update(&mut self) -> Option<usize> {
        let now = self.clock.now();
        let mut ticks = 0;

        while let Some(fired) = self.timer.poll(now) {
            self.on_tick(fired.payload, fired.due);
            ticks += 1;

            if ticks >= MAX_TICKS_PER_UPDATE {
                if self.timer.due().is_some_and(|due| due <= now) {
                    warn!("Playback fell {} ticks behind, resyncing to clock", ticks);
                    self.rearm();
                }
                break;
            }
        }

        (ticks > 0).then(|| self.sequence.current_index())
    }

    fn on_tick(&mut self, tick: FrameTick, due: Instant) {
        if !self.is_playing || self.sequence.is_empty() {
            return;
        }
        let current = self.sequence.current_index();
        if tick.index != current {
            // Every index change re-arms, so this only happens if that contract broke
            warn!("Stale frame tick for {} (current {}), re-arming", tick.index, current);
            self.rearm();
            return;
        }

        let next = if !self.sequence.is_last() {
            current + 1
        } else if self.is_looping {
            trace!("Frame loop: {} -> 0", current);
            0
        } else {
            trace!("Reached last frame, stopping");
            self.set_playing(false);
            return;
        };

        self.move_to(next);
        if let Some(frame) = self.sequence.current_frame() {
            let next_due = due + Duration::from_millis(frame.duration_ms() as u64);
            self.timer.schedule(FrameTick { index: next }, next_due);
        }
    }

    /// Cancel the timer and stop playback (app shutdown).
    pub fn teardown(&mut self) {
        if self.timer.cancel() {
            trace!("Player teardown cancelled pending tick");
        }
        self.set_playing(false);
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.timer.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event_bus::{EventBus, downcast_event};
    use crate::core::scheduler::ManualClock;

    fn player_with(durations: &[i64]) -> (Player, Arc<ManualClock>) {
        let clock = ManualClock::new();
        let mut player = Player::with_clock(clock.clone());
        for (i, &d) in durations.iter().enumerate() {
            player.add_frame(Frame::new(format!("{i}.png"), d));
        }
        (player, clock)
    }

    #[test]
    fn test_play_noop_on_empty() {
        let (mut player, _clock) = player_with(&[]);
        player.play();
        assert!(!player.is_playing());
        assert!(!player.has_pending_timer());
    }

    #[test]
    fn test_play_twice_keeps_single_timer() {
        let (mut player, clock) = player_with(&[100, 100]);
        player.play();
        let due = player.next_deadline();
        clock.advance_ms(40);
        player.play();
        // Second play is a no-op: deadline not pushed back
        assert_eq!(player.next_deadline(), due);
    }

    #[test]
    fn test_advances_on_frame_duration() {
        let (mut player, clock) = player_with(&[100, 200, 100]);
        player.play();

        clock.advance_ms(99);
        assert_eq!(player.update(), None);
        assert_eq!(player.current_index(), 0);

        clock.advance_ms(1);
        assert_eq!(player.update(), Some(1));

        // Frame 1 lasts 200ms
        clock.advance_ms(150);
        assert_eq!(player.update(), None);
        clock.advance_ms(50);
        assert_eq!(player.update(), Some(2));
    }

    #[test]
    fn test_loop_wraps_after_350ms() {
        let (mut player, clock) = player_with(&[100, 100, 100]);
        player.set_looping(true);
        player.play();

        clock.advance_ms(350);
        assert_eq!(player.update(), Some(0));
        assert!(player.is_playing());
        // Exactly one timer pending: frame 0, due at 400ms
        assert_eq!(player.timer.payload(), Some(&FrameTick { index: 0 }));
        assert_eq!(player.time_until_next_tick(), Some(Duration::from_millis(50)));
    }

    #[test]
    fn test_loop_wraps_with_fine_updates() {
        let (mut player, clock) = player_with(&[100, 100, 100]);
        player.play();
        for _ in 0..35 {
            clock.advance_ms(10);
            player.update();
        }
        assert_eq!(player.current_index(), 0);
        assert_eq!(player.timer.payload(), Some(&FrameTick { index: 0 }));
    }

    #[test]
    fn test_no_loop_stops_at_end() {
        let (mut player, clock) = player_with(&[100, 100, 100]);
        player.set_looping(false);
        player.play();

        clock.advance_ms(250);
        player.update();
        assert_eq!(player.current_index(), 2);
        assert!(player.is_playing());

        clock.advance_ms(50);
        player.update();
        assert!(!player.is_playing());
        assert_eq!(player.current_index(), 2);
        assert!(!player.has_pending_timer());
    }

    #[test]
    fn test_pause_keeps_frame_stop_rewinds() {
        let (mut player, clock) = player_with(&[100, 100, 100]);
        player.play();
        clock.advance_ms(150);
        player.update();
        player.pause();
        assert_eq!(player.current_index(), 1);
        assert!(!player.has_pending_timer());

        clock.advance_ms(500);
        assert_eq!(player.update(), None);
        assert_eq!(player.current_index(), 1);

        player.stop();
        assert_eq!(player.current_index(), 0);
        assert!(!player.is_playing());
    }

    #[test]
    fn test_step_does_not_touch_play_state() {
        let (mut player, _clock) = player_with(&[100, 100]);
        assert_eq!(player.step_forward(), 1);
        assert_eq!(player.step_forward(), 1);
        assert!(!player.is_playing());
        assert!(!player.has_pending_timer());

        player.play();
        assert_eq!(player.step_backward(), 0);
        assert_eq!(player.step_backward(), 0);
        assert!(player.is_playing());
        assert_eq!(player.timer.payload(), Some(&FrameTick { index: 0 }));
    }

    #[test]
    fn test_set_frame_duration_clamps() {
        let (mut player, _clock) = player_with(&[100]);
        assert_eq!(player.set_frame_duration(0, 9999), Some(1000));
        assert_eq!(player.set_frame_duration(0, 0), Some(50));
        assert_eq!(player.set_frame_duration(3, 100), None);
        assert_eq!(player.sequence().get(0).unwrap().duration_ms(), 50);
    }

    #[test]
    fn test_duration_edit_reschedules() {
        let (mut player, clock) = player_with(&[1000, 100]);
        player.play();
        clock.advance_ms(60);
        player.set_frame_duration(0, 50);
        // Re-armed from the edit: due 50ms after it
        assert_eq!(player.time_until_next_tick(), Some(Duration::from_millis(50)));
        clock.advance_ms(50);
        assert_eq!(player.update(), Some(1));
    }

    #[test]
    fn test_remove_current_while_playing() {
        let (mut player, clock) = player_with(&[100, 100, 100]);
        player.select_frame(2);
        player.play();
        clock.advance_ms(50);

        player.remove_frame(2);
        assert_eq!(player.current_index(), 1);
        assert_eq!(player.timer.payload(), Some(&FrameTick { index: 1 }));

        // Timer armed for the surviving frame, never for the removed one
        clock.advance_ms(100);
        assert_eq!(player.update(), Some(0));
    }

    #[test]
    fn test_remove_last_frame_forces_stop() {
        let (mut player, _clock) = player_with(&[100]);
        player.play();
        player.remove_frame(0);
        assert!(!player.is_playing());
        assert!(!player.has_pending_timer());
        assert_eq!(player.current_index(), 0);
    }

    #[test]
    fn test_index_invariant_across_operations() {
        let (mut player, clock) = player_with(&[50, 60, 70, 80]);
        player.play();
        for step in 0..40usize {
            match step % 7 {
                0 => { player.step_forward(); }
                1 => { player.remove_frame(step % 3); }
                2 => { player.add_frame(Frame::placeholder()); }
                3 => player.toggle_play(),
                4 => { player.select_frame(step); }
                5 => { player.step_backward(); }
                _ => player.stop(),
            }
            clock.advance_ms(37);
            player.update();
            let len = player.sequence().len();
            if len > 0 {
                assert!(player.current_index() < len);
            } else {
                assert_eq!(player.current_index(), 0);
                assert!(!player.is_playing());
            }
            if player.is_playing() {
                assert!(player.has_pending_timer());
            } else {
                assert!(!player.has_pending_timer());
            }
        }
    }

    #[test]
    fn test_overdue_resync() {
        let (mut player, clock) = player_with(&[50, 50]);
        player.play();
        clock.advance(Duration::from_secs(60));
        assert!(player.update().is_some());
        // Resynced: next tick is a full frame away, not in the past
        let remaining = player.time_until_next_tick().unwrap();
        assert!(remaining > Duration::ZERO);
    }

    #[test]
    fn test_teardown_cancels() {
        let (mut player, clock) = player_with(&[100, 100]);
        player.play();
        player.teardown();
        assert!(!player.is_playing());
        assert!(!player.has_pending_timer());
        clock.advance_ms(500);
        assert_eq!(player.update(), None);
    }

    #[test]
    fn test_emits_notifications() {
        let bus = EventBus::new();
        let (mut player, clock) = player_with(&[100, 100]);
        bus.poll();
        player.set_event_emitter(bus.emitter());

        player.play();
        clock.advance_ms(100);
        player.update();
        player.set_frame_duration(1, 300);

        let events = bus.poll();
        assert_eq!(
            downcast_event::<PlaybackStateChangedEvent>(&events[0]),
            Some(&PlaybackStateChangedEvent { playing: true })
        );
        assert_eq!(
            downcast_event::<CurrentFrameChangedEvent>(&events[1]),
            Some(&CurrentFrameChangedEvent { old: 0, new: 1 })
        );
        assert_eq!(
            downcast_event::<SequenceEditedEvent>(&events[2]),
            Some(&SequenceEditedEvent { frame_count: 2 })
        );
    }
}
