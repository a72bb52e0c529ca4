//! Edge stations: admission control, FIFO queueing and service.
//!
//! A [`Station`] accepts tasks, keeps at most one of them in service,
//! queues the rest up to its capacity and, unless it is locally
//! managed, forwards overflow to the least loaded peer.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`id`] | [`StationId`] newtype |
//! | [`task`] | [`Task`], [`TaskId`], [`TaskIdGen`] |
//! | [`config`] | [`StationConfig`] |
//! | [`queue`] | [`StationQueue`] bounded FIFO |
//! | [`peers`] | [`PeerDirectory`] trait, [`LoadBoard`], [`StaticDirectory`] |
//! | [`admission`] | peer selection and the admission plan |
//! | [`service`] | [`ServiceEngine`] and processing-time rule |
//! | [`io`] | inbound [`Message`]/[`TimerKind`], outbound [`StationIo`] |

pub mod admission;
pub mod config;
pub mod id;
pub mod io;
pub mod peers;
pub mod queue;
pub mod service;
pub mod task;

use std::rc::Rc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ConfigError, MeshError, MeshResult};
use crate::metrics::Metric;
use crate::time::VirtualDuration;

// Flat re-exports so callers can use `edgemesh::station::Task` etc.
pub use admission::{plan_admission, select_best_peer, AdmissionOutcome, Origin, Plan};
pub use config::StationConfig;
pub use id::StationId;
pub use io::{Message, StationIo, TimerKind, Wakeup};
pub use peers::{LoadBoard, PeerDirectory, PeerLoad, StaticDirectory};
pub use queue::StationQueue;
pub use service::{processing_time, ActiveTask, Completion, ServiceEngine};
pub use task::{Task, TaskId, TaskIdGen, DEFAULT_TASK_SIZE};

/// Per-station counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StationStats {
    /// Fresh tasks received from clients.
    pub arrivals: u64,
    /// Tasks received from peers.
    pub peer_arrivals: u64,
    /// Tasks that went straight into service.
    pub started: u64,
    /// Tasks appended to the queue.
    pub enqueued: u64,
    /// Tasks sent to a peer.
    pub forwarded: u64,
    /// Tasks discarded for lack of room.
    pub dropped: u64,
    /// Tasks that finished service.
    pub completed: u64,
    /// Messages of unknown kind that were discarded.
    pub unrecognized: u64,
}

/// What was thrown away when a station was torn down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Discarded {
    pub queued: usize,
    pub in_service: usize,
}

/// A single edge station.
pub struct Station {
    id: StationId,
    config: StationConfig,
    queue: StationQueue,
    engine: ServiceEngine,
    peers: Rc<dyn PeerDirectory>,
    stats: StationStats,
}

impl std::fmt::Debug for Station {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Station")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("queue_len", &self.queue.len())
            .field("serving", &self.engine.active().map(|a| a.task.id()))
            .field("stats", &self.stats)
            .finish()
    }
}

impl Station {
    /// Create a station. Fails fast on configurations that could never
    /// serve work.
    pub fn new(
        id: StationId,
        config: StationConfig,
        peers: Rc<dyn PeerDirectory>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Station {
            id,
            queue: StationQueue::new(config.capacity),
            engine: ServiceEngine::new(config.service_rate),
            config,
            peers,
            stats: StationStats::default(),
        })
    }

    // ── Inspection ────────────────────────────────────────────────

    pub fn id(&self) -> StationId {
        self.id
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// `true` iff nothing is in service and nothing is queued.
    pub fn is_idle(&self) -> bool {
        !self.engine.is_serving() && self.queue.is_empty()
    }

    /// The task currently in service.
    pub fn active_task(&self) -> Option<&ActiveTask> {
        self.engine.active()
    }

    /// The task that will be served next.
    pub fn next_queued(&self) -> Option<&Task> {
        self.queue.front()
    }

    pub fn stats(&self) -> &StationStats {
        &self.stats
    }

    // ── Inbound surface ───────────────────────────────────────────

    /// Handle a message from the transport.
    ///
    /// Returns the admission outcome for task messages and `None` for
    /// discarded unrecognized messages.
    pub fn on_message(
        &mut self,
        io: &mut dyn StationIo,
        message: Message,
    ) -> MeshResult<Option<AdmissionOutcome>> {
        match message {
            Message::Task(task) => self.admit(io, task, Origin::Client).map(Some),
            Message::Forwarded { from, task } => {
                self.admit(io, task, Origin::Peer(from)).map(Some)
            }
            Message::Unrecognized { label } => {
                self.stats.unrecognized += 1;
                warn!(station = %self.id, %label, "discarding unrecognized message");
                Ok(None)
            }
        }
    }

    /// Admit one task: start it, queue it, forward it, or drop it.
    pub fn admit(
        &mut self,
        io: &mut dyn StationIo,
        task: Task,
        origin: Origin,
    ) -> MeshResult<AdmissionOutcome> {
        match origin {
            Origin::Client => self.stats.arrivals += 1,
            Origin::Peer(_) => self.stats.peer_arrivals += 1,
        }

        let load_aware = !self.config.locally_managed && origin == Origin::Client;
        let best_peer = if load_aware {
            select_best_peer(self.peers.as_ref(), self.id)
        } else {
            None
        };

        let plan = plan_admission(
            self.queue.len(),
            self.queue.capacity(),
            self.config.locally_managed,
            origin,
            best_peer,
        );

        match plan {
            Plan::Local => self.keep(io, task),
            Plan::Forward(to) => self.forward(io, task, to),
            Plan::Drop => Ok(self.drop_task(io, task)),
        }
    }

    /// Handle a fired wake-up.
    ///
    /// A `ServeNext` wake-up finishes the task in service, emits its
    /// response time and promotes the next queued task. Wake-ups with no
    /// task in service, or that fire before the task is due, are no-ops.
    pub fn on_timer(
        &mut self,
        io: &mut dyn StationIo,
        kind: TimerKind,
    ) -> MeshResult<Option<Completion>> {
        if let TimerKind::Other(n) = kind {
            debug!(station = %self.id, timer = n, "ignoring foreign timer");
            return Ok(None);
        }

        let now = io.now();
        match self.engine.active() {
            None => {
                warn!(station = %self.id, %now, "wake-up with no task in service");
                return Ok(None);
            }
            Some(active) if now.is_before(active.completes_at) => {
                warn!(
                    station = %self.id,
                    %now,
                    due = %active.completes_at,
                    "early wake-up ignored"
                );
                return Ok(None);
            }
            Some(_) => {}
        }

        let Some(done) = self.engine.finish() else {
            return Ok(None);
        };
        let response_time = now
            .duration_since(done.task.created_at())
            .unwrap_or(VirtualDuration::ZERO);
        io.emit(self.id, Metric::ResponseTime, response_time.as_units());
        self.stats.completed += 1;
        debug!(
            station = %self.id,
            task = %done.task.id(),
            response = %response_time,
            "task completed"
        );

        let next = match self.queue.pop() {
            Some(task) => {
                let id = task.id();
                io.emit(self.id, Metric::QueueLength, self.queue.len() as f64);
                self.start_service(io, task)?;
                Some(id)
            }
            None => None,
        };

        Ok(Some(Completion {
            task: done.task.id(),
            response_time,
            next,
        }))
    }

    /// Discard everything still queued or in service. No metrics are
    /// emitted for discarded tasks.
    pub fn teardown(&mut self) -> Discarded {
        let queued = self.queue.drain().count();
        let in_service = usize::from(self.engine.finish().is_some());
        if queued + in_service > 0 {
            debug!(station = %self.id, queued, in_service, "discarded at teardown");
        }
        Discarded { queued, in_service }
    }

    // ── Internals ─────────────────────────────────────────────────

    fn keep(&mut self, io: &mut dyn StationIo, task: Task) -> MeshResult<AdmissionOutcome> {
        if self.is_idle() {
            debug!(station = %self.id, task = %task.id(), "serving immediately");
            self.start_service(io, task)?;
            self.stats.started += 1;
            io.emit(self.id, Metric::QueueLength, 0.0);
            return Ok(AdmissionOutcome::Started);
        }

        match self.queue.try_push(task) {
            Ok(queue_length) => {
                self.stats.enqueued += 1;
                io.emit(self.id, Metric::QueueLength, queue_length as f64);
                Ok(AdmissionOutcome::Enqueued { queue_length })
            }
            Err(task) => Ok(self.drop_task(io, task)),
        }
    }

    fn forward(
        &mut self,
        io: &mut dyn StationIo,
        task: Task,
        to: StationId,
    ) -> MeshResult<AdmissionOutcome> {
        debug!(station = %self.id, task = %task.id(), peer = %to, "forwarding");
        io.forward_task(task, self.id, to, self.config.propagation_delay)?;
        self.stats.forwarded += 1;
        io.emit(self.id, Metric::ForwardedCount, 1.0);
        Ok(AdmissionOutcome::Forwarded { to })
    }

    fn drop_task(&mut self, io: &mut dyn StationIo, task: Task) -> AdmissionOutcome {
        debug!(station = %self.id, task = %task.id(), "queue full, dropping");
        self.stats.dropped += 1;
        io.emit(self.id, Metric::DroppedCount, 1.0);
        AdmissionOutcome::Dropped
    }

    fn start_service(&mut self, io: &mut dyn StationIo, task: Task) -> MeshResult<()> {
        let now = io.now();
        let at = self
            .engine
            .start(task, now)
            .map_err(|_| MeshError::TimeOverflow)?;
        io.request_wakeup(Wakeup {
            at,
            station: self.id,
            kind: TimerKind::ServeNext,
        })
    }
}

#[cfg(test)]
mod tests;
