//! `TraceEntry` — records every event dispatched to a station.

use serde::Serialize;

use crate::event::EventId;
use crate::station::{AdmissionOutcome, StationId, TaskId, TimerKind};
use crate::time::VirtualTime;

/// What reached the station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TraceInput {
    /// A task from a client.
    Task { task: TaskId },
    /// A task forwarded by `from`.
    Forwarded { task: TaskId, from: StationId },
    /// A message of unknown kind.
    Unrecognized { label: String },
    /// A fired self-timer.
    Timer { kind: TimerKind },
}

impl std::fmt::Display for TraceInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceInput::Task { task } => write!(f, "task {}", task),
            TraceInput::Forwarded { task, from } => write!(f, "task {} from {}", task, from),
            TraceInput::Unrecognized { label } => write!(f, "unrecognized {:?}", label),
            TraceInput::Timer { kind } => write!(f, "timer {}", kind),
        }
    }
}

/// What the station did about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TraceOutcome {
    Admitted(AdmissionOutcome),
    /// `task` finished; `next` went into service, if any.
    Completed { task: TaskId, next: Option<TaskId> },
    /// Discarded or ignored without effect.
    Ignored,
}

impl std::fmt::Display for TraceOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceOutcome::Admitted(outcome) => write!(f, "{}", outcome),
            TraceOutcome::Completed { task, next: Some(next) } => {
                write!(f, "completed {}, serving {}", task, next)
            }
            TraceOutcome::Completed { task, next: None } => write!(f, "completed {}", task),
            TraceOutcome::Ignored => write!(f, "ignored"),
        }
    }
}

/// A record of a single event dispatched to a station.
///
/// Appended by `MeshRuntime` when tracing is enabled; useful for test
/// assertions and post-mortem debugging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEntry {
    /// Virtual time at which the event was dispatched.
    pub time: VirtualTime,
    /// The scheduler's unique ID for this event.
    pub event_id: EventId,
    /// The station that received the event.
    pub station: StationId,
    pub input: TraceInput,
    pub outcome: TraceOutcome,
}

impl std::fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} {} {}] {} -> {}",
            self.time, self.event_id, self.station, self.input, self.outcome,
        )
    }
}
