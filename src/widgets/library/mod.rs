//! Library panel - browse, filter and organize assets

pub mod library_events;
mod library_ui;

pub use library_ui::{LibraryPanelState, render};
