//! Entities module - sequencer and library data, no UI
//!
//! - [`Frame`] / [`Sequence`]: what the player plays
//! - [`Asset`] / [`Library`]: what the user picks frames from

pub mod asset;
pub mod frame;
pub mod library;
pub mod sequence;

pub use asset::{Asset, AssetCategory, AssetFilter, AssetTag, AssetUpdate};
pub use frame::Frame;
pub use library::Library;
pub use sequence::Sequence;
