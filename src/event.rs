/// Event system for the mesh simulator.
///
/// Every effect is modeled as an `Event` placed on the scheduler's
/// priority queue and dispatched in deterministic order. Events own
/// their payload: a delivery event carries the task itself, so a task
/// in flight exists in exactly one place.

use serde::{Deserialize, Serialize};

use crate::client::ClientId;
use crate::station::{Message, StationId, TimerKind};
use crate::time::VirtualTime;
use std::cmp::Ordering;

// ── Event ID ──────────────────────────────────────────────────────────

/// A globally unique, strictly increasing event identifier.
///
/// Two events scheduled at the same `VirtualTime` are ordered by their
/// `EventId`, which corresponds to creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(u64);

impl EventId {
    #[inline]
    pub fn new(raw: u64) -> Self {
        EventId(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

// ── Event ID Generator ───────────────────────────────────────────────

/// Deterministic, strictly increasing event-ID generator.
///
/// Each `Simulation` owns exactly one of these.
#[derive(Debug, Clone, Default)]
pub struct EventIdGen {
    next: u64,
}

impl EventIdGen {
    pub fn new() -> Self {
        EventIdGen { next: 0 }
    }

    /// Mint the next event ID.
    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next);
        self.next += 1;
        id
    }

    /// Peek at the next ID without consuming it.
    pub fn peek(&self) -> EventId {
        EventId(self.next)
    }
}

// ── Event Type ────────────────────────────────────────────────────────

/// The payload of an event.
#[derive(Debug, PartialEq)]
pub enum EventType {
    /// The transport hands `message` to station `to`.
    Delivery { to: StationId, message: Message },

    /// A wake-up previously requested by `station`.
    Timer { station: StationId, kind: TimerKind },

    /// A client produces its next task.
    ClientEmit { client: ClientId },
}

impl EventType {
    /// Short label used in traces and logs.
    pub fn label(&self) -> &'static str {
        match self {
            EventType::Delivery { .. } => "delivery",
            EventType::Timer { .. } => "timer",
            EventType::ClientEmit { .. } => "client-emit",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::Delivery { to, message } => write!(f, "Deliver({} → {})", message, to),
            EventType::Timer { station, kind } => write!(f, "Timer({}, {})", station, kind),
            EventType::ClientEmit { client } => write!(f, "Emit({})", client),
        }
    }
}

// ── Event ─────────────────────────────────────────────────────────────

/// A single simulation event, ordered by `(scheduled_at, id)`.
#[derive(Debug, PartialEq)]
pub struct Event {
    pub id: EventId,
    pub scheduled_at: VirtualTime,
    pub payload: EventType,
}

/// The identity of a dispatched event, kept after its payload is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventStamp {
    pub id: EventId,
    pub at: VirtualTime,
}

impl Event {
    pub fn new(id: EventId, scheduled_at: VirtualTime, payload: EventType) -> Self {
        Event {
            id,
            scheduled_at,
            payload,
        }
    }

    pub fn stamp(&self) -> EventStamp {
        EventStamp {
            id: self.id,
            at: self.scheduled_at,
        }
    }
}

impl Eq for Event {}

/// Ordering: smallest `(scheduled_at, id)` first.
///
/// `BinaryHeap` is a max-heap, so the natural ordering is reversed here
/// to turn it into a min-heap.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .scheduled_at
            .cmp(&self.scheduled_at)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer(station: u64) -> EventType {
        EventType::Timer {
            station: StationId::new(station),
            kind: TimerKind::ServeNext,
        }
    }

    #[test]
    fn test_event_id_monotonic() {
        let mut gen = EventIdGen::new();
        let a = gen.next_id();
        let b = gen.next_id();
        assert_eq!(a.raw(), 0);
        assert_eq!(b.raw(), 1);
        assert_eq!(gen.peek().raw(), 2);
    }

    #[test]
    fn test_event_ordering_by_time() {
        let e1 = Event::new(EventId::new(0), VirtualTime::from_units(1.0), timer(0));
        let e2 = Event::new(EventId::new(1), VirtualTime::from_units(2.0), timer(0));
        // e1 comes first (smaller time) → in reversed ordering e1 > e2.
        assert!(e1 > e2);
    }

    #[test]
    fn test_event_ordering_tiebreak_by_id() {
        let e1 = Event::new(EventId::new(0), VirtualTime::from_units(1.0), timer(1));
        let e2 = Event::new(EventId::new(1), VirtualTime::from_units(1.0), timer(0));
        assert!(e1 > e2);
    }

    #[test]
    fn test_event_display() {
        let e = Event::new(EventId::new(42), VirtualTime::ZERO, timer(3));
        assert_eq!(format!("{}", e.id), "E#42");
        assert_eq!(format!("{}", e.payload), "Timer(BS3, ServeNext)");
        assert_eq!(e.payload.label(), "timer");
        assert_eq!(e.stamp().id, EventId::new(42));
    }
}
