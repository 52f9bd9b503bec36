//! Core engine modules - scheduler, player, events, frame cache, workers
//!
//! These modules form the playback engine, independent of UI.

pub mod event_bus;
pub mod frame_cache;
pub mod player;
pub mod player_events;
pub mod scheduler;
pub mod workers;

// Re-exports for convenience
pub use event_bus::EventBus;
pub use frame_cache::{FrameCache, FrameImage, FrameKey};
pub use player::Player;
pub use scheduler::{Clock, ManualClock, SystemClock, TaskSlot};
pub use workers::Workers;
