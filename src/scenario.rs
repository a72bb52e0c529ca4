//! TOML scenario files.
//!
//! A scenario describes a whole run: how many stations and how they are
//! configured, the client workload, the transport and the run length.
//! Every field has a default, so an empty file is a valid scenario.
//!
//! ```toml
//! seed = 42
//! duration = 500.0
//!
//! [field]
//! width = 1000.0
//! height = 1000.0
//!
//! [stations]
//! count = 4
//! capacity = 10
//! service_rate = 1.0
//! locally_managed = false
//! propagation_delay = 0.1
//!
//! [clients]
//! count = 20
//! mean_interval = 5.0
//! mean_size = 1.0
//! placement = { kind = "log_normal", mu = 6.0, sigma = 0.5 }
//!
//! [transport]
//! jitter = 0.0
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::ClientConfig;
use crate::dsl::MeshBuilder;
use crate::error::{MeshError, MeshResult};
use crate::event::EventType;
use crate::metrics::{Recorder, Summary};
use crate::station::{Discarded, Message, StationConfig, StationId, StationStats};
use crate::time::{VirtualDuration, VirtualTime};
use crate::topology::{Field, Placement};
use crate::transport::TransportConfig;

/// The `[stations]` table. All stations share one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StationsSection {
    pub count: usize,
    pub capacity: usize,
    pub service_rate: f64,
    pub locally_managed: bool,
    /// Forwarding delay in units.
    pub propagation_delay: f64,
}

impl Default for StationsSection {
    fn default() -> Self {
        StationsSection {
            count: 4,
            capacity: 10,
            service_rate: 1.0,
            locally_managed: false,
            propagation_delay: 0.1,
        }
    }
}

impl StationsSection {
    pub fn station_config(&self) -> StationConfig {
        StationConfig::new(self.capacity, self.service_rate)
            .locally_managed(self.locally_managed)
            .propagation_delay(VirtualDuration::from_units(self.propagation_delay))
    }
}

/// The `[clients]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientsSection {
    pub count: usize,
    pub mean_interval: f64,
    pub mean_size: f64,
    pub placement: Placement,
}

impl Default for ClientsSection {
    fn default() -> Self {
        ClientsSection {
            count: 20,
            mean_interval: 5.0,
            mean_size: 1.0,
            placement: Placement::Uniform,
        }
    }
}

/// The `[transport]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportSection {
    /// Maximum extra hop latency in units.
    pub jitter: f64,
}

/// A complete run description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Scenario {
    pub seed: u64,
    /// Run length in units.
    pub duration: f64,
    pub field: Field,
    pub stations: StationsSection,
    pub clients: ClientsSection,
    pub transport: TransportSection,
}

impl Default for Scenario {
    fn default() -> Self {
        Scenario {
            seed: 0,
            duration: 1000.0,
            field: Field::default(),
            stations: StationsSection::default(),
            clients: ClientsSection::default(),
            transport: TransportSection::default(),
        }
    }
}

fn positive(name: &str, value: f64) -> MeshResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(MeshError::InvalidScenario(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}

fn non_negative(name: &str, value: f64) -> MeshResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(MeshError::InvalidScenario(format!(
            "{name} must be non-negative and finite, got {value}"
        )))
    }
}

impl Scenario {
    /// Parse a scenario from a TOML string and validate it.
    pub fn from_toml_str(toml_str: &str) -> MeshResult<Self> {
        let scenario: Self = toml::from_str(toml_str)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Load a scenario from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> MeshResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> MeshResult<String> {
        toml::to_string_pretty(self).map_err(|e| MeshError::Serialization(e.to_string()))
    }

    /// Check scenario-level parameters. Station parameters (capacity,
    /// service rate) are checked when the stations are built.
    pub fn validate(&self) -> MeshResult<()> {
        positive("duration", self.duration)?;
        positive("field.width", self.field.width)?;
        positive("field.height", self.field.height)?;
        if self.stations.count == 0 {
            return Err(MeshError::InvalidScenario(
                "stations.count must be at least 1".into(),
            ));
        }
        non_negative("stations.propagation_delay", self.stations.propagation_delay)?;
        positive("clients.mean_interval", self.clients.mean_interval)?;
        positive("clients.mean_size", self.clients.mean_size)?;
        if let Placement::LogNormal { mu, sigma } = self.clients.placement {
            if !mu.is_finite() {
                return Err(MeshError::InvalidScenario(format!(
                    "clients.placement.mu must be finite, got {mu}"
                )));
            }
            non_negative("clients.placement.sigma", sigma)?;
        }
        non_negative("transport.jitter", self.transport.jitter)?;
        Ok(())
    }

    /// Validate everything, including building the stations, without
    /// running anything.
    pub fn check(&self) -> MeshResult<()> {
        self.validate()?;
        self.builder().build().map(|_| ())
    }

    pub fn horizon(&self) -> VirtualTime {
        VirtualTime::from_units(self.duration)
    }

    /// The builder this scenario describes.
    pub fn builder(&self) -> MeshBuilder {
        MeshBuilder::new()
            .stations(self.stations.count, self.stations.station_config())
            .field(self.field)
            .clients(
                self.clients.count,
                ClientConfig {
                    mean_interval: self.clients.mean_interval,
                    mean_size: self.clients.mean_size,
                },
                self.clients.placement,
            )
            .transport(TransportConfig::with_jitter(VirtualDuration::from_units(
                self.transport.jitter,
            )))
            .seed(self.seed)
    }

    /// Run the scenario to its horizon, tear the mesh down and report.
    pub fn run(&self) -> MeshResult<RunReport> {
        self.validate()?;
        info!(
            seed = self.seed,
            stations = self.stations.count,
            clients = self.clients.count,
            duration = self.duration,
            locally_managed = self.stations.locally_managed,
            "starting run"
        );

        let (sim, mut rt, events_processed) = self.builder().run_until(self.horizon())?;
        let in_flight = sim
            .pending_events()
            .filter(|e| {
                matches!(
                    e.payload,
                    EventType::Delivery {
                        message: Message::Task(_) | Message::Forwarded { .. },
                        ..
                    }
                )
            })
            .count();
        let teardown = rt.teardown();
        let summary = rt.recorder().summary();

        info!(
            events = events_processed,
            tasks = rt.tasks_created(),
            completed = summary.response_time.count,
            forwarded = summary.forwarded,
            dropped = summary.dropped,
            "run finished"
        );

        Ok(RunReport {
            seed: self.seed,
            events_processed,
            end_time: sim.current_time().as_units(),
            tasks_created: rt.tasks_created(),
            undeliverable: rt.undeliverable(),
            hops: rt.transport().hop_count(),
            in_flight,
            teardown,
            summary,
            stats: rt.station_stats(),
            metrics: rt.recorder().clone(),
        })
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub seed: u64,
    pub events_processed: u64,
    /// Clock value at the end of the run, in units.
    pub end_time: f64,
    pub tasks_created: u64,
    pub undeliverable: u64,
    /// Forwarding hops routed between stations.
    pub hops: u64,
    /// Tasks still travelling between stations at the horizon.
    pub in_flight: usize,
    /// Tasks still queued or in service at the horizon.
    pub teardown: Discarded,
    pub summary: Summary,
    pub stats: BTreeMap<StationId, StationStats>,
    /// Raw per-station series.
    pub metrics: Recorder,
}

impl RunReport {
    /// Pretty JSON rendering.
    pub fn to_json(&self) -> MeshResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Every created task is completed, dropped, discarded at teardown
    /// or still in flight. Forwarding moves a task without ending it.
    pub fn is_conserved(&self) -> bool {
        let completed = self.summary.response_time.count as u64;
        let ended = completed
            + self.summary.dropped
            + self.teardown.queued as u64
            + self.teardown.in_service as u64
            + self.in_flight as u64;
        ended == self.tasks_created
    }
}
