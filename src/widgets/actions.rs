//! Action queue for panels that return their events instead of emitting them.

use crate::core::event_bus::{BoxedEvent, Event, EventEmitter};

/// Panel result: queued events plus whether the pointer was over the panel.
#[derive(Default)]
pub struct ActionQueue {
    pub hovered: bool,
    pub events: Vec<BoxedEvent>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send<E: Event>(&mut self, event: E) {
        self.events.push(Box::new(event));
    }

    /// Forward all queued events to the bus.
    pub fn dispatch(self, emitter: &EventEmitter) {
        for event in self.events {
            emitter.emit_boxed(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event_bus::{EventBus, downcast_event};

    #[test]
    fn test_dispatch_forwards_in_order() {
        let bus = EventBus::new();
        let mut actions = ActionQueue::new();
        actions.send(1u32);
        actions.send("two");
        actions.dispatch(&bus.emitter());
        let events = bus.poll();
        assert_eq!(downcast_event::<u32>(&events[0]), Some(&1));
        assert_eq!(downcast_event::<&str>(&events[1]), Some(&"two"));
    }
}
