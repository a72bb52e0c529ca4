//! Admission policy: enqueue locally, forward to a peer, or drop.
//!
//! The decision is split into a pure planning step ([`plan_admission`])
//! and its execution in [`Station::admit`](super::Station::admit). Given
//! the same local state and peer snapshot the plan is always the same.

use serde::{Deserialize, Serialize};

use super::id::StationId;
use super::peers::{PeerDirectory, PeerLoad, Peers};

/// Where an arriving task came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    /// Fresh task from a client.
    Client,
    /// Already forwarded once by the given peer. Never forwarded again.
    Peer(StationId),
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Client => write!(f, "client"),
            Origin::Peer(id) => write!(f, "peer {}", id),
        }
    }
}

/// What to do with one arriving task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// Keep it: start serving or append to the local queue.
    Local,
    /// Hand it to the given peer.
    Forward(StationId),
    /// Discard it and count the drop.
    Drop,
}

/// The executed result of admitting a task, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdmissionOutcome {
    /// The station was idle; the task went straight into service.
    Started,
    /// Appended to the local queue, which now holds `queue_length` tasks.
    Enqueued { queue_length: usize },
    /// Sent to a less loaded peer.
    Forwarded { to: StationId },
    /// No room here and forwarding would not help.
    Dropped,
}

impl std::fmt::Display for AdmissionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdmissionOutcome::Started => write!(f, "started"),
            AdmissionOutcome::Enqueued { queue_length } => {
                write!(f, "enqueued (len {})", queue_length)
            }
            AdmissionOutcome::Forwarded { to } => write!(f, "forwarded to {}", to),
            AdmissionOutcome::Dropped => write!(f, "dropped"),
        }
    }
}

/// Pick the least loaded peer other than `me`.
///
/// Peers are scanned in directory order. The first peer with an empty
/// queue is returned immediately. Otherwise the peer with the smallest
/// queue among those that are not full wins, earliest on ties. Returns
/// `None` when every other peer is full or there are no other peers.
pub fn select_best_peer(directory: &dyn PeerDirectory, me: StationId) -> Option<PeerLoad> {
    let mut best: Option<PeerLoad> = None;
    for peer in Peers::of(directory) {
        if peer.id == me {
            continue;
        }
        if peer.queue_length == 0 {
            return Some(peer);
        }
        if peer.is_full() {
            continue;
        }
        match best {
            Some(b) if b.queue_length <= peer.queue_length => {}
            _ => best = Some(peer),
        }
    }
    best
}

/// Decide the fate of one arriving task.
///
/// - Peer-forwarded tasks and locally managed stations use the simple
///   policy: keep while there is room, otherwise drop.
/// - Load-aware stations forward when a qualifying peer has a strictly
///   shorter queue than ours, otherwise fall back to the simple policy.
///
/// `best_peer` is only consulted on the load-aware path.
pub fn plan_admission(
    queue_length: usize,
    capacity: usize,
    locally_managed: bool,
    origin: Origin,
    best_peer: Option<PeerLoad>,
) -> Plan {
    let keep_or_drop = if queue_length < capacity {
        Plan::Local
    } else {
        Plan::Drop
    };

    if locally_managed || matches!(origin, Origin::Peer(_)) {
        return keep_or_drop;
    }

    match best_peer {
        Some(peer) if queue_length > peer.queue_length => Plan::Forward(peer.id),
        _ => keep_or_drop,
    }
}
