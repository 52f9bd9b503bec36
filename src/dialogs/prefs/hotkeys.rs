//! Hotkey system - keyboard shortcuts to bus events

use std::collections::HashMap;

use eframe::egui;

use crate::core::event_bus::{BoxedEvent, EventEmitter};
use crate::core::player_events::{
    StepBackwardEvent, StepForwardEvent, StopEvent, ToggleLoopEvent, TogglePlayPauseEvent,
};
use crate::widgets::timeline::timeline_events::{TimelineZoomInEvent, TimelineZoomOutEvent};

type EventFactory = fn() -> BoxedEvent;

/// Maps key combos ("Space", "Ctrl+S") to events
pub struct HotkeyHandler {
    bindings: HashMap<String, EventFactory>,
}

impl Default for HotkeyHandler {
    fn default() -> Self {
        let mut handler = Self::new();
        handler.setup_default_bindings();
        handler
    }
}

impl HotkeyHandler {
    /// Handler without bindings
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    pub fn add_binding(&mut self, key: impl Into<String>, factory: EventFactory) {
        self.bindings.insert(key.into(), factory);
    }

    pub fn handle_key(&self, key: &str) -> Option<BoxedEvent> {
        self.bindings.get(key).map(|factory| factory())
    }

    pub fn handle_key_with_modifiers(&self, key: &str, ctrl: bool, shift: bool, alt: bool) -> Option<BoxedEvent> {
        let mut combo = String::new();
        if ctrl {
            combo.push_str("Ctrl+");
        }
        if shift {
            combo.push_str("Shift+");
        }
        if alt {
            combo.push_str("Alt+");
        }
        combo.push_str(key);
        self.handle_key(&combo)
    }

    pub fn setup_default_bindings(&mut self) {
        self.add_binding("Space", || Box::new(TogglePlayPauseEvent));
        self.add_binding("ArrowRight", || Box::new(StepForwardEvent));
        self.add_binding("ArrowLeft", || Box::new(StepBackwardEvent));
        self.add_binding("Home", || Box::new(StopEvent));
        self.add_binding("L", || Box::new(ToggleLoopEvent));
        self.add_binding("Plus", || Box::new(TimelineZoomInEvent));
        self.add_binding("Equals", || Box::new(TimelineZoomInEvent));
        // "+" needs Shift on many layouts
        self.add_binding("Shift+Plus", || Box::new(TimelineZoomInEvent));
        self.add_binding("Shift+Equals", || Box::new(TimelineZoomInEvent));
        self.add_binding("Minus", || Box::new(TimelineZoomOutEvent));
    }

    /// Emit an event for every bound key pressed this frame.
    /// Returns the number of events emitted.
    pub fn handle_input(&self, input: &egui::InputState, emitter: &EventEmitter) -> usize {
        let mut emitted = 0;
        for event in &input.events {
            if let egui::Event::Key {
                key,
                pressed: true,
                modifiers,
                ..
            } = event
            {
                let key_str = format!("{:?}", key);
                let hit = self
                    .handle_key_with_modifiers(&key_str, modifiers.ctrl, modifiers.shift, modifiers.alt)
                    .or_else(|| (!modifiers.any()).then(|| self.handle_key(&key_str)).flatten());
                if let Some(ev) = hit {
                    emitter.emit_boxed(ev);
                    emitted += 1;
                }
            }
        }
        emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event_bus::{EventBus, downcast_event};

    #[test]
    fn test_default_bindings() {
        let handler = HotkeyHandler::default();
        let ev = handler.handle_key("Space").unwrap();
        assert!(downcast_event::<TogglePlayPauseEvent>(&ev).is_some());
        let ev = handler.handle_key("Minus").unwrap();
        assert!(downcast_event::<TimelineZoomOutEvent>(&ev).is_some());
        assert!(handler.handle_key("Q").is_none());
        // Ctrl+Space is not bound
        assert!(handler.handle_key_with_modifiers("Space", true, false, false).is_none());
    }

    #[test]
    fn test_handle_input_emits() {
        let handler = HotkeyHandler::default();
        let bus = EventBus::new();
        let mut input = egui::InputState::default();
        input.events.push(egui::Event::Key {
            key: egui::Key::ArrowLeft,
            physical_key: None,
            pressed: true,
            repeat: false,
            modifiers: egui::Modifiers::NONE,
        });
        input.events.push(egui::Event::Key {
            key: egui::Key::ArrowLeft,
            physical_key: None,
            pressed: false,
            repeat: false,
            modifiers: egui::Modifiers::NONE,
        });
        assert_eq!(handler.handle_input(&input, &bus.emitter()), 1);
        let events = bus.poll();
        assert!(downcast_event::<StepBackwardEvent>(&events[0]).is_some());
    }

    #[test]
    fn test_shifted_plus_zooms_in() {
        let handler = HotkeyHandler::default();
        let bus = EventBus::new();
        let mut input = egui::InputState::default();
        for key in [egui::Key::Plus, egui::Key::Equals] {
            input.events.push(egui::Event::Key {
                key,
                physical_key: None,
                pressed: true,
                repeat: false,
                modifiers: egui::Modifiers::SHIFT,
            });
        }
        assert_eq!(handler.handle_input(&input, &bus.emitter()), 2);
        let events = bus.poll();
        assert!(events.iter().all(|e| downcast_event::<TimelineZoomInEvent>(e).is_some()));
        // Shift+Minus stays unbound
        assert!(handler.handle_key_with_modifiers("Minus", false, true, false).is_none());
    }
}
