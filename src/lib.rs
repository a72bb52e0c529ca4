//! # Edgemesh — Deterministic Edge-Station Mesh Simulator
//!
//! A discrete-event model of edge-computing stations that accept tasks
//! from nearby clients, queue them up to a capacity, serve one at a time
//! at a finite rate and, when overloaded, forward work to the least
//! loaded peer. No async, no threads, no wall-clock time: stations are
//! plain state machines driven by a virtual clock, so every run with the
//! same seed is reproducible.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │          MeshRuntime          │ ← dispatches events to stations,
//! │  ┌──────────┐  ┌───────────┐ │   runs clients, routes forwards
//! │  │ Stations │──│ LoadBoard │ │ ← shared peer-load snapshots
//! │  └──────────┘  └───────────┘ │
//! │  ┌──────────┐  ┌───────────┐ │
//! │  │ Clients  │  │ Transport │ │ ← workload / hop latency
//! │  └──────────┘  └───────────┘ │
//! │  ┌────────────────────────┐  │
//! │  │       Simulation        │  │ ← execution loop
//! │  │  ┌──────────────────┐  │  │
//! │  │  │    Scheduler     │  │  │ ← deterministic min-heap
//! │  │  └──────────────────┘  │  │
//! │  └────────────────────────┘  │
//! └──────────────────────────────┘
//! ```
//!
//! Most users start from a [`Scenario`] (TOML) or a [`MeshBuilder`].

pub mod client;
pub mod dsl;
pub mod error;
pub mod event;
pub mod metrics;
pub mod rng;
pub mod runtime;
pub mod scenario;
pub mod scheduler;
pub mod simulation;
pub mod station;
pub mod time;
pub mod topology;
pub mod trace;
pub mod transport;

// Re-exports for convenience.
pub use client::{Client, ClientConfig, ClientId};
pub use dsl::MeshBuilder;
pub use error::{ConfigError, MeshError, MeshResult};
pub use event::{Event, EventId, EventIdGen, EventType};
pub use metrics::{Metric, MetricsSink, Recorder, Summary};
pub use runtime::MeshRuntime;
pub use scenario::{RunReport, Scenario};
pub use scheduler::Scheduler;
pub use simulation::{EventHandler, Simulation, SimulationContext};
pub use station::{Station, StationConfig, StationId, Task, TaskId};
pub use time::{VirtualDuration, VirtualTime};
pub use trace::TraceEntry;
pub use transport::{Transport, TransportConfig};
