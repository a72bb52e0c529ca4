/// Deterministic event scheduler.
///
/// Uses a `BinaryHeap` with reversed `Ord` on `Event` to act as a
/// min-heap keyed by `(scheduled_at, event_id)`. Event IDs are strictly
/// increasing, so events at the same virtual time come out in the order
/// they were scheduled, and two runs with the same inputs dispatch in
/// the same order.

use std::collections::BinaryHeap;

use crate::event::{Event, EventId, EventIdGen, EventType};
use crate::station::Wakeup;
use crate::time::VirtualTime;

/// The event queue plus its ID generator.
#[derive(Debug, Default)]
pub struct Scheduler {
    /// Min-heap (via reversed Ord on Event).
    queue: BinaryHeap<Event>,

    /// Monotonic event-ID generator.
    id_gen: EventIdGen,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            queue: BinaryHeap::new(),
            id_gen: EventIdGen::new(),
        }
    }

    /// Schedule a new event at the given virtual time.
    pub fn schedule(&mut self, at: VirtualTime, payload: EventType) -> EventId {
        let id = self.id_gen.next_id();
        self.queue.push(Event::new(id, at, payload));
        id
    }

    /// Turn a station's wake-up request into a timer event.
    pub fn schedule_wakeup(&mut self, wakeup: Wakeup) -> EventId {
        self.schedule(
            wakeup.at,
            EventType::Timer {
                station: wakeup.station,
                kind: wakeup.kind,
            },
        )
    }

    /// Pop the next event (earliest time, lowest ID).
    pub fn pop_next(&mut self) -> Option<Event> {
        self.queue.pop()
    }

    /// Peek at the next event without removing it.
    pub fn peek_next(&self) -> Option<&Event> {
        self.queue.peek()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Pending events in no particular order.
    pub fn pending(&self) -> impl Iterator<Item = &Event> {
        self.queue.iter()
    }

    /// The ID the next scheduled event will receive.
    pub fn next_event_id(&self) -> EventId {
        self.id_gen.peek()
    }

    /// Drain all events in dispatch order.
    pub fn drain_ordered(&mut self) -> Vec<Event> {
        let mut events = Vec::with_capacity(self.queue.len());
        while let Some(e) = self.queue.pop() {
            events.push(e);
        }
        events
    }
}
