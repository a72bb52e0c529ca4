//! Station configuration, validated once at construction.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::time::VirtualDuration;

/// Immutable per-station parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationConfig {
    /// Maximum number of queued tasks (the task in service is not counted).
    pub capacity: usize,
    /// Work units served per unit of virtual time.
    pub service_rate: f64,
    /// Drop overflow instead of forwarding it to peers.
    pub locally_managed: bool,
    /// Transport delay applied to tasks this station forwards.
    pub propagation_delay: VirtualDuration,
}

impl StationConfig {
    pub fn new(capacity: usize, service_rate: f64) -> Self {
        StationConfig {
            capacity,
            service_rate,
            locally_managed: false,
            propagation_delay: VirtualDuration::ZERO,
        }
    }

    /// Builder-style setter for the drop-instead-of-forward policy.
    pub fn locally_managed(mut self, yes: bool) -> Self {
        self.locally_managed = yes;
        self
    }

    /// Builder-style setter for the forwarding delay.
    pub fn propagation_delay(mut self, delay: VirtualDuration) -> Self {
        self.propagation_delay = delay;
        self
    }

    /// Reject configurations that could never serve work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if !(self.service_rate.is_finite() && self.service_rate > 0.0) {
            return Err(ConfigError::InvalidServiceRate(self.service_rate));
        }
        Ok(())
    }
}

impl Default for StationConfig {
    /// Ten queue slots, one work unit per unit time, load-aware.
    fn default() -> Self {
        StationConfig::new(10, 1.0)
    }
}
