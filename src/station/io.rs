//! The call surfaces between a station and its scheduler/transport.
//!
//! Inbound: the runtime hands a station a [`Message`] or a fired
//! [`TimerKind`]. Outbound: the station talks back exclusively through
//! [`StationIo`], so it can be driven by the real runtime or by a test
//! double without knowing which.

use serde::{Deserialize, Serialize};

use crate::error::MeshResult;
use crate::metrics::Metric;
use crate::time::{VirtualDuration, VirtualTime};

use super::id::StationId;
use super::task::Task;

// ── Inbound ───────────────────────────────────────────────────────────

/// A message delivered to a station's inbound endpoint.
#[derive(Debug, PartialEq)]
pub enum Message {
    /// A fresh task from a client.
    Task(Task),
    /// A task forwarded by an overloaded peer.
    Forwarded { from: StationId, task: Task },
    /// Anything else; discarded with a warning.
    Unrecognized { label: String },
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Message::Task(task) => write!(f, "Task({})", task.id()),
            Message::Forwarded { from, task } => write!(f, "Forwarded({} from {})", task.id(), from),
            Message::Unrecognized { label } => write!(f, "Unrecognized({:?})", label),
        }
    }
}

/// What a self-timer is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerKind {
    /// The task in service completes; serve the next queued task.
    ServeNext,
    /// Any other self-timer. Stations ignore these.
    Other(u32),
}

impl std::fmt::Display for TimerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerKind::ServeNext => write!(f, "ServeNext"),
            TimerKind::Other(n) => write!(f, "Other({})", n),
        }
    }
}

/// A wake-up request: "call `station` back with `kind` at `at`".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wakeup {
    pub at: VirtualTime,
    pub station: StationId,
    pub kind: TimerKind,
}

// ── Outbound ──────────────────────────────────────────────────────────

/// Effects a station may ask its environment to perform.
///
/// All methods are non-blocking; the environment records the request
/// and control returns to the station immediately.
pub trait StationIo {
    /// Current virtual time.
    fn now(&self) -> VirtualTime;

    /// Ask for a future callback.
    fn request_wakeup(&mut self, wakeup: Wakeup) -> MeshResult<()>;

    /// Hand `task` to the transport for delivery to peer `to` after
    /// at least `delay`. Ownership of the task moves to the transport.
    fn forward_task(
        &mut self,
        task: Task,
        from: StationId,
        to: StationId,
        delay: VirtualDuration,
    ) -> MeshResult<()>;

    /// Emit a scalar metric sample for `station`.
    fn emit(&mut self, station: StationId, metric: Metric, value: f64);
}
