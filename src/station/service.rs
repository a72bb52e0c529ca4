//! Service engine: one task in service at a time.
//!
//! ```text
//!            admit into idle station
//!   Idle ───────────────────────────────▶ Serving
//!    ▲                                     │  │
//!    │  wake-up, queue empty               │  │ wake-up, queue non-empty:
//!    └─────────────────────────────────────┘  │ finish, dequeue, reschedule
//!                                             └──▶ Serving
//! ```

use serde::Serialize;

use crate::time::{VirtualDuration, VirtualTime};

use super::task::{Task, TaskId};

/// Smallest size used when computing service time.
const MIN_BILLABLE_SIZE: f64 = 1.0;

/// Time needed to serve `size` work units at `service_rate`.
///
/// Sizes below one unit are billed as one. A non-positive or non-finite
/// rate falls back to exactly one unit of virtual time, so a
/// misconfigured rate can never stall or divide by zero.
pub fn processing_time(size: f64, service_rate: f64) -> VirtualDuration {
    if !(service_rate.is_finite() && service_rate > 0.0) {
        return VirtualDuration::UNIT;
    }
    VirtualDuration::from_units(size.max(MIN_BILLABLE_SIZE) / service_rate)
}

/// The task occupying the service slot.
#[derive(Debug)]
pub struct ActiveTask {
    pub task: Task,
    pub started_at: VirtualTime,
    pub completes_at: VirtualTime,
}

/// Record of one finished task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub task: TaskId,
    /// Creation-to-completion span: waiting, transport and service.
    pub response_time: VirtualDuration,
    /// The queued task promoted into service, if any.
    pub next: Option<TaskId>,
}

/// Holder of the single service slot.
#[derive(Debug)]
pub struct ServiceEngine {
    service_rate: f64,
    active: Option<ActiveTask>,
}

impl ServiceEngine {
    pub fn new(service_rate: f64) -> Self {
        ServiceEngine {
            service_rate,
            active: None,
        }
    }

    pub fn service_rate(&self) -> f64 {
        self.service_rate
    }

    pub fn is_serving(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&ActiveTask> {
        self.active.as_ref()
    }

    /// Put `task` into the empty slot. Returns the completion instant, or
    /// hands the task back if it would not fit on the clock.
    ///
    /// The caller guarantees the slot is empty.
    pub fn start(&mut self, task: Task, now: VirtualTime) -> Result<VirtualTime, Task> {
        debug_assert!(self.active.is_none(), "service slot already occupied");
        let duration = processing_time(task.size(), self.service_rate);
        let Some(completes_at) = now.plus(duration) else {
            return Err(task);
        };
        self.active = Some(ActiveTask {
            task,
            started_at: now,
            completes_at,
        });
        Ok(completes_at)
    }

    /// Vacate the slot.
    pub fn finish(&mut self) -> Option<ActiveTask> {
        self.active.take()
    }
}
