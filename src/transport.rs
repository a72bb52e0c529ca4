/// Simulated inter-station transport.
///
/// Forwarded tasks pass through the `Transport`, which decides how long
/// the hop takes: the forwarding station's propagation delay plus an
/// optional uniform jitter drawn from a seeded RNG. The transport never
/// loses a task; every discarded task is a counted admission drop.

use serde::{Deserialize, Serialize};

use crate::rng::DeterministicRng;
use crate::station::StationId;
use crate::time::{VirtualDuration, VirtualTime};

/// Transport-wide behaviour.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Maximum extra latency added to each hop; actual jitter is in
    /// `[0, jitter)`.
    pub jitter: VirtualDuration,
}

impl TransportConfig {
    /// Exactly the configured propagation delay, no jitter.
    pub fn fixed() -> Self {
        TransportConfig {
            jitter: VirtualDuration::ZERO,
        }
    }

    pub fn with_jitter(jitter: VirtualDuration) -> Self {
        TransportConfig { jitter }
    }
}

/// One routed hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HopRecord {
    pub time: VirtualTime,
    pub from: StationId,
    pub to: StationId,
    pub latency: VirtualDuration,
}

/// Latency model for forwarded tasks, owned by the runtime.
#[derive(Debug, Clone)]
pub struct Transport {
    config: TransportConfig,
    rng: DeterministicRng,
    hops: u64,
    /// Append-only hop log, kept only once enabled.
    log: Option<Vec<HopRecord>>,
}

impl Transport {
    pub fn new(config: TransportConfig, seed: u64) -> Self {
        Transport {
            config,
            rng: DeterministicRng::new(seed),
            hops: 0,
            log: None,
        }
    }

    /// Keep a [`HopRecord`] for every hop routed from now on.
    pub fn enable_log(&mut self) {
        self.log.get_or_insert_with(Vec::new);
    }

    /// A jitter-free transport.
    pub fn fixed() -> Self {
        Self::new(TransportConfig::fixed(), 0)
    }

    /// Decide the latency of one hop and count it.
    ///
    /// Consumes RNG state only when jitter is enabled, so adding a
    /// jitter-free transport to a run does not perturb other streams.
    pub fn route(
        &mut self,
        time: VirtualTime,
        from: StationId,
        to: StationId,
        base_delay: VirtualDuration,
    ) -> VirtualDuration {
        let jitter = if self.config.jitter.ticks() > 0 {
            VirtualDuration::from_ticks(self.rng.next_range(0, self.config.jitter.ticks()))
        } else {
            VirtualDuration::ZERO
        };
        let latency = base_delay.saturating_add(jitter);
        self.hops += 1;
        if let Some(log) = &mut self.log {
            log.push(HopRecord {
                time,
                from,
                to,
                latency,
            });
        }
        latency
    }

    /// Logged hops; empty unless [`enable_log`](Transport::enable_log) was called.
    pub fn log(&self) -> &[HopRecord] {
        self.log.as_deref().unwrap_or_default()
    }

    /// Number of hops routed so far.
    pub fn hop_count(&self) -> u64 {
        self.hops
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::fixed()
    }
}
