/// Workload generators.
///
/// A client sits at a fixed position, attaches to its nearest station
/// and emits tasks with exponential inter-arrival gaps and exponential
/// sizes. Each client draws from its own RNG stream, so adding a client
/// does not change what the others emit.

use serde::{Deserialize, Serialize};

use crate::rng::DeterministicRng;
use crate::station::StationId;
use crate::time::VirtualDuration;
use crate::topology::Position;

/// Identifies a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientId(u64);

impl ClientId {
    #[inline]
    pub fn new(id: u64) -> Self {
        ClientId(id)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// Workload shape shared by every client of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Mean gap between two tasks of one client, in units.
    pub mean_interval: f64,
    /// Mean task size in work units.
    pub mean_size: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            mean_interval: 1.0,
            mean_size: 1.0,
        }
    }
}

/// One task source.
#[derive(Debug, Clone)]
pub struct Client {
    id: ClientId,
    position: Position,
    target: StationId,
    config: ClientConfig,
    rng: DeterministicRng,
    emitted: u64,
}

impl Client {
    pub fn new(
        id: ClientId,
        position: Position,
        target: StationId,
        config: ClientConfig,
        rng: DeterministicRng,
    ) -> Self {
        Client {
            id,
            position,
            target,
            config,
            rng,
            emitted: 0,
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// The station this client sends its tasks to.
    pub fn target(&self) -> StationId {
        self.target
    }

    /// Tasks emitted so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Gap until the next emission.
    pub fn next_interval(&mut self) -> VirtualDuration {
        VirtualDuration::from_units(self.rng.exponential(self.config.mean_interval))
    }

    /// Size of the task being emitted now.
    pub fn next_task_size(&mut self) -> f64 {
        self.emitted += 1;
        self.rng.exponential(self.config.mean_size)
    }
}
