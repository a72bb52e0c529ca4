//! Station ID — a lightweight, ordered, copyable station identifier.

use serde::{Deserialize, Serialize};

/// A unique identifier for a station in the mesh.
///
/// The ordering of `StationId` is the peer enumeration order: peer
/// selection scans stations in ascending id order and the first-seen
/// minimum wins ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StationId(u64);

impl StationId {
    /// Create a station ID from a raw integer.
    #[inline]
    pub fn new(id: u64) -> Self {
        StationId(id)
    }

    /// Return the underlying integer.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for StationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BS{}", self.0)
    }
}
