//! Tasks — the unit of work carried through the mesh.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::time::VirtualTime;

/// Size substituted for tasks that arrive with a non-positive size.
pub const DEFAULT_TASK_SIZE: f64 = 1.0;

// ── TaskId ────────────────────────────────────────────────────────────

/// Identifier used to follow a task through logs and traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(u64);

impl TaskId {
    #[inline]
    pub fn new(raw: u64) -> Self {
        TaskId(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Strictly-increasing task-ID generator, one per mesh.
#[derive(Debug, Clone, Default)]
pub struct TaskIdGen {
    next: u64,
}

impl TaskIdGen {
    pub fn new() -> Self {
        TaskIdGen { next: 0 }
    }

    /// Mint the next task ID.
    pub fn next_id(&mut self) -> TaskId {
        let id = TaskId(self.next);
        self.next += 1;
        id
    }

    /// Number of ids minted so far.
    pub fn minted(&self) -> u64 {
        self.next
    }
}

// ── Task ──────────────────────────────────────────────────────────────

/// A unit of work with a size and the instant it entered the mesh.
///
/// `Task` is deliberately neither `Clone` nor `Copy`: exactly one owner
/// holds it at a time (an in-flight message, a station queue or a
/// service slot), and it is consumed once, either by completing service
/// or by being dropped.
#[derive(Debug, PartialEq)]
pub struct Task {
    id: TaskId,
    size: f64,
    created_at: VirtualTime,
}

impl Task {
    /// Create a task. Sizes that are not strictly positive and finite
    /// are replaced by [`DEFAULT_TASK_SIZE`] so the task still runs.
    pub fn new(id: TaskId, size: f64, created_at: VirtualTime) -> Self {
        let size = if size.is_finite() && size > 0.0 {
            size
        } else {
            debug!(task = %id, size, "non-positive task size, substituting default");
            DEFAULT_TASK_SIZE
        };
        Task {
            id,
            size,
            created_at,
        }
    }

    #[inline]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Work units carried by this task. Always `> 0`.
    #[inline]
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Virtual time at which the task entered the mesh.
    #[inline]
    pub fn created_at(&self) -> VirtualTime {
        self.created_at
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(size={:.3}, created {})", self.id, self.size, self.created_at)
    }
}
