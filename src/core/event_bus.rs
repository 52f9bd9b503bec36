//! Deferred event queue shared by widgets, the player and the app loop.
//!
//! Widgets, hotkeys and the player only ever hold an [`EventEmitter`] and
//! push typed events; the app owns the bus, drains it once per frame with
//! `poll()` and applies each event on the UI thread (see `main_events`).

use log::warn;
use std::any::Any;
use std::sync::{Arc, Mutex};

/// Queue length at which the oldest half is dropped.
const MAX_QUEUE_SIZE: usize = 1000;

/// Anything `Send + Sync + 'static` can travel on the bus.
pub trait Event: Any + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync + 'static> Event for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

type Queue = Arc<Mutex<Vec<BoxedEvent>>>;

pub type BoxedEvent = Box<dyn Event>;

/// Downcast a queued event.
///
/// Goes through `**event` so the call dispatches on the inner `dyn Event`
/// and not on the blanket impl for `Box<dyn Event>` itself.
pub fn downcast_event<E: Event>(event: &BoxedEvent) -> Option<&E> {
    (**event).as_any().downcast_ref::<E>()
}

fn enqueue(queue: &Queue, event: BoxedEvent) {
    let mut queue = queue.lock().unwrap_or_else(|e| e.into_inner());
    if queue.len() >= MAX_QUEUE_SIZE {
        let evict = queue.len() / 2;
        warn!("Event queue full ({} events), dropping oldest {}", queue.len(), evict);
        queue.drain(0..evict);
    }
    queue.push(event);
}

/// Owner side of the queue.
#[derive(Clone, Default)]
pub struct EventBus {
    queue: Queue,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain every queued event, oldest first.
    pub fn poll(&self) -> Vec<BoxedEvent> {
        std::mem::take(&mut *self.queue.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Cheap handle for widgets and the player.
    pub fn emitter(&self) -> EventEmitter {
        EventEmitter {
            queue: Arc::clone(&self.queue),
        }
    }
}

/// Emit-only handle onto an [`EventBus`].
#[derive(Clone)]
pub struct EventEmitter {
    queue: Queue,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("queue_len", &self.queue.lock().map(|q| q.len()).unwrap_or(0))
            .finish()
    }
}

impl EventEmitter {
    pub fn emit<E: Event>(&self, event: E) {
        enqueue(&self.queue, Box::new(event));
    }

    pub fn emit_boxed(&self, event: BoxedEvent) {
        enqueue(&self.queue, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug)]
    struct Ping(i32);

    #[derive(Clone, Debug)]
    struct Pong;

    #[test]
    fn test_events_queued_in_order() {
        let bus = EventBus::new();
        let emitter = bus.emitter();
        emitter.emit(Ping(3));
        emitter.emit_boxed(Box::new(Ping(4)));
        emitter.emit(Pong);

        let events = bus.poll();
        assert_eq!(events.len(), 3);
        assert!(bus.poll().is_empty());
        assert_eq!(downcast_event::<Ping>(&events[1]).map(|p| p.0), Some(4));
        assert!(downcast_event::<Pong>(&events[2]).is_some());
        assert!(downcast_event::<Ping>(&events[2]).is_none());
    }

    #[test]
    fn test_cloned_emitters_share_queue() {
        let bus = EventBus::new();
        let a = bus.emitter();
        let b = a.clone();
        a.emit(Ping(1));
        b.emit(Pong);
        assert_eq!(bus.poll().len(), 2);
    }

    #[test]
    fn test_queue_eviction() {
        let bus = EventBus::new();
        let emitter = bus.emitter();
        for i in 0..(MAX_QUEUE_SIZE as i32 + 1) {
            emitter.emit(Ping(i));
        }
        let events = bus.poll();
        assert_eq!(events.len(), MAX_QUEUE_SIZE / 2 + 1);
        assert_eq!(downcast_event::<Ping>(events.last().unwrap()).map(|p| p.0), Some(MAX_QUEUE_SIZE as i32));
    }
}
