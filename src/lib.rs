//! SpriteDeck - frame sequencer library
//!
//! Re-exports all modules for use by the binary target.

// Core engine (events, player, scheduler, frame cache, workers)
pub mod core;

// App modules
pub mod cli;
pub mod config;
pub mod context;
pub mod dialogs;
pub mod entities;
pub mod main_events;
pub mod server;
pub mod utils;
pub mod widgets;

// Re-export commonly used types from core
pub use core::event_bus::{BoxedEvent, EventBus, EventEmitter, downcast_event};
pub use core::player::Player;

// Re-export entities
pub use entities::{Frame, Library, Sequence};
