//! UI Widgets - modular, reusable UI components
//!
//! Each widget is self-contained and communicates via EventBus

pub mod actions;
pub mod canvas;
pub mod file_dialogs;
pub mod library;
pub mod timeline;
