//! Structured error types for edgemesh.
//!
//! Only configuration and harness problems are errors. Per-task anomalies
//! (bad sizes, overflowing queues, unknown message kinds) are recovered
//! inside the station and show up in metrics and logs instead.

use thiserror::Error;

use crate::station::StationId;
use crate::time::VirtualTime;

/// A station configuration that cannot be run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A station must be able to hold at least one queued task.
    #[error("capacity must be at least 1")]
    ZeroCapacity,

    /// Service rate must be a positive, finite number.
    #[error("service rate must be positive and finite, got {0}")]
    InvalidServiceRate(f64),
}

/// The top-level error type for the mesh simulator.
#[derive(Debug, Error)]
pub enum MeshError {
    // ── Configuration ─────────────────────────────────────

    /// A station was configured with invalid parameters. Fatal: the
    /// station is never created.
    #[error("station {station} has invalid configuration: {source}")]
    InvalidConfig {
        station: StationId,
        #[source]
        source: ConfigError,
    },

    /// Attempted to register a station id twice.
    #[error("station {0} is already registered")]
    StationAlreadyRegistered(StationId),

    /// A station id was referenced but is not registered.
    #[error("station {0} not found")]
    StationNotFound(StationId),

    /// A scenario file could not be parsed or is inconsistent.
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    // ── Scheduling ────────────────────────────────────────

    /// Attempted to schedule an event in the past.
    #[error("cannot schedule event at {requested} when current time is {current}")]
    NonCausalEvent {
        requested: VirtualTime,
        current: VirtualTime,
    },

    /// A computed wake-up time does not fit on the clock.
    #[error("virtual time overflow")]
    TimeOverflow,

    // ── I/O ───────────────────────────────────────────────

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for MeshError {
    fn from(e: serde_json::Error) -> Self {
        MeshError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for MeshError {
    fn from(e: toml::de::Error) -> Self {
        MeshError::InvalidScenario(e.to_string())
    }
}

/// Convenience alias for `Result<T, MeshError>`.
pub type MeshResult<T> = Result<T, MeshError>;
