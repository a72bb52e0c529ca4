/// Fluent builder DSL for mesh setup.
///
/// Provides ergonomic APIs that hide the boilerplate of creating the
/// simulation, validating station configurations, placing clients and
/// scheduling seed events, all while preserving full determinism.

use crate::client::{Client, ClientConfig, ClientId};
use crate::error::MeshResult;
use crate::event::EventType;
use crate::rng::DeterministicRng;
use crate::runtime::MeshRuntime;
use crate::simulation::Simulation;
use crate::station::{Message, StationConfig, StationId};
use crate::time::VirtualTime;
use crate::topology::{grid_positions, nearest_station, Field, Placement};
use crate::transport::{Transport, TransportConfig};

/// RNG stream used to place clients.
const PLACEMENT_STREAM: u64 = u64::MAX;
/// RNG stream used for transport jitter.
const TRANSPORT_STREAM: u64 = u64::MAX - 1;

/// How a population of clients is generated.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ClientPopulation {
    count: usize,
    config: ClientConfig,
    placement: Placement,
}

// ── MeshBuilder ───────────────────────────────────────────────────────

/// Fluent builder for constructing a `Simulation` + `MeshRuntime` pair.
///
/// # Example
/// ```rust
/// use edgemesh::dsl::MeshBuilder;
/// use edgemesh::station::StationConfig;
/// use edgemesh::time::VirtualTime;
///
/// let (sim, rt, _events) = MeshBuilder::new()
///     .stations(4, StationConfig::new(10, 2.0))
///     .clients(20, Default::default(), Default::default())
///     .seed(42)
///     .run_until(VirtualTime::from_units(100.0))
///     .unwrap();
/// assert!(rt.tasks_created() > 0);
/// assert!(sim.current_time() >= VirtualTime::from_units(100.0));
/// ```
#[derive(Debug, Clone)]
pub struct MeshBuilder {
    stations: Vec<(StationId, StationConfig)>,
    field: Field,
    clients: Option<ClientPopulation>,
    transport: TransportConfig,
    seed: u64,
    events: Vec<(VirtualTime, StationId, Seeded)>,
    trace: bool,
}

/// An event scheduled by the builder before the run starts.
#[derive(Debug, Clone, PartialEq)]
enum Seeded {
    Arrival { size: f64 },
    Unrecognized { label: String },
}

impl MeshBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        MeshBuilder {
            stations: Vec::new(),
            field: Field::default(),
            clients: None,
            transport: TransportConfig::fixed(),
            seed: 0,
            events: Vec::new(),
            trace: false,
        }
    }

    // ── Stations ──────────────────────────────────────────────

    /// Register one station.
    pub fn station(mut self, id: u64, config: StationConfig) -> Self {
        self.stations.push((StationId::new(id), config));
        self
    }

    /// Register stations `0..n`, all with the same configuration.
    pub fn stations(mut self, n: usize, config: StationConfig) -> Self {
        self.stations
            .extend((0..n as u64).map(|i| (StationId::new(i), config.clone())));
        self
    }

    // ── Topology and workload ─────────────────────────────────

    pub fn field(mut self, field: Field) -> Self {
        self.field = field;
        self
    }

    /// Scatter `count` clients over the field; each attaches to its
    /// nearest station.
    pub fn clients(mut self, count: usize, config: ClientConfig, placement: Placement) -> Self {
        self.clients = Some(ClientPopulation {
            count,
            config,
            placement,
        });
        self
    }

    /// Attach a custom transport config.
    pub fn transport(mut self, config: TransportConfig) -> Self {
        self.transport = config;
        self
    }

    /// Root seed for every random stream of the run.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Record a trace entry for every station dispatch.
    pub fn with_trace(mut self) -> Self {
        self.trace = true;
        self
    }

    // ── Events ────────────────────────────────────────────────

    /// Inject a task of `size` into `station` at time `at` (units).
    pub fn arrival(mut self, at: f64, station: u64, size: f64) -> Self {
        self.events.push((
            VirtualTime::from_units(at),
            StationId::new(station),
            Seeded::Arrival { size },
        ));
        self
    }

    /// Deliver a message of unknown kind to `station` at time `at`.
    pub fn unrecognized(mut self, at: f64, station: u64, label: &str) -> Self {
        self.events.push((
            VirtualTime::from_units(at),
            StationId::new(station),
            Seeded::Unrecognized {
                label: label.into(),
            },
        ));
        self
    }

    // ── Build ─────────────────────────────────────────────────

    /// Build and return `(Simulation, MeshRuntime)`.
    ///
    /// Every station configuration is validated here; an invalid one
    /// fails the whole build.
    pub fn build(self) -> MeshResult<(Simulation, MeshRuntime)> {
        let root = DeterministicRng::new(self.seed);
        let transport = Transport::new(self.transport, root.derive(TRANSPORT_STREAM).state());

        let mut sim = Simulation::new();
        let mut rt = MeshRuntime::new(self.stations, transport)?;
        if self.trace {
            rt.enable_trace();
        }

        if let Some(population) = self.clients {
            let ids = rt.station_ids();
            let sites: Vec<_> = ids
                .iter()
                .copied()
                .zip(grid_positions(ids.len(), self.field))
                .collect();
            let mut placement_rng = root.derive(PLACEMENT_STREAM);
            for i in 0..population.count as u64 {
                let position = population.placement.sample(self.field, &mut placement_rng);
                let Some(target) = nearest_station(position, &sites) else {
                    break;
                };
                rt.add_client(Client::new(
                    ClientId::new(i),
                    position,
                    target,
                    population.config,
                    root.derive(i),
                ))?;
            }
            rt.start_clients(&mut sim)?;
        }

        for (at, station, seeded) in self.events {
            match seeded {
                Seeded::Arrival { size } => {
                    rt.schedule_arrival(&mut sim, at, station, size)?;
                }
                Seeded::Unrecognized { label } => {
                    sim.schedule(
                        at,
                        EventType::Delivery {
                            to: station,
                            message: Message::Unrecognized { label },
                        },
                    )?;
                }
            }
        }

        Ok((sim, rt))
    }

    /// Build, run to completion, return `(Simulation, MeshRuntime, u64)`.
    /// The `u64` is the number of events processed.
    ///
    /// Only terminates when there are no clients; use [`run_until`] for
    /// open workloads.
    ///
    /// [`run_until`]: MeshBuilder::run_until
    pub fn run(self) -> MeshResult<(Simulation, MeshRuntime, u64)> {
        let (mut sim, mut rt) = self.build()?;
        let n = sim.run(&mut rt)?;
        Ok((sim, rt, n))
    }

    /// Build and run every event up to `horizon`.
    pub fn run_until(self, horizon: VirtualTime) -> MeshResult<(Simulation, MeshRuntime, u64)> {
        let (mut sim, mut rt) = self.build()?;
        let n = sim.run_until(horizon, &mut rt)?;
        Ok((sim, rt, n))
    }
}

impl Default for MeshBuilder {
    fn default() -> Self {
        Self::new()
    }
}
