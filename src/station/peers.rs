//! Read-only views over sibling stations' load.
//!
//! A station never touches another station directly. It holds a shared
//! handle to a [`PeerDirectory`] and asks it for `(queue_length,
//! capacity)` snapshots when an admission decision needs them.

use std::cell::Cell;
use std::collections::BTreeMap;

use serde::Serialize;

use super::id::StationId;

/// Load snapshot of one peer at decision time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeerLoad {
    pub id: StationId,
    pub queue_length: usize,
    pub capacity: usize,
}

impl PeerLoad {
    /// A peer whose queue is already at capacity cannot take work.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.queue_length >= self.capacity
    }
}

// ── PeerDirectory ─────────────────────────────────────────────────────

/// Query capability over the stations of a mesh.
///
/// Entries are enumerated by index; the enumeration order is the
/// tie-break order for peer selection and must be stable.
pub trait PeerDirectory {
    /// Number of entries (the querying station may be one of them).
    fn peer_count(&self) -> usize;

    /// Snapshot of the entry at `index`.
    fn peer_at(&self, index: usize) -> Option<PeerLoad>;

    /// Iterate all entries in enumeration order.
    fn peers(&self) -> Peers<'_>
    where
        Self: Sized,
    {
        Peers {
            directory: self,
            next: 0,
        }
    }
}

/// Iterator over a directory's entries.
pub struct Peers<'a> {
    directory: &'a dyn PeerDirectory,
    next: usize,
}

impl<'a> Peers<'a> {
    /// Iterate a type-erased directory.
    pub fn of(directory: &'a dyn PeerDirectory) -> Self {
        Peers { directory, next: 0 }
    }
}

impl Iterator for Peers<'_> {
    type Item = PeerLoad;

    fn next(&mut self) -> Option<PeerLoad> {
        while self.next < self.directory.peer_count() {
            let index = self.next;
            self.next += 1;
            if let Some(peer) = self.directory.peer_at(index) {
                return Some(peer);
            }
        }
        None
    }
}

// ── LoadBoard ─────────────────────────────────────────────────────────

#[derive(Debug)]
struct BoardEntry {
    id: StationId,
    capacity: usize,
    queue_length: Cell<usize>,
}

/// Live directory shared by every station of a mesh.
///
/// Each entry has exactly one writer: the runtime republishes a
/// station's queue length after every event dispatched to that station.
/// Readers see the value as of the last completed dispatch, which in a
/// single-threaded event loop is the current value.
///
/// `LoadBoard` is intentionally `!Sync`; share it with `Rc`.
#[derive(Debug, Default)]
pub struct LoadBoard {
    entries: Vec<BoardEntry>,
    index: BTreeMap<StationId, usize>,
}

impl LoadBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a board with the given `(id, capacity)` entries, all empty.
    /// Entries are enumerated in ascending id order.
    pub fn with_stations<I>(stations: I) -> Self
    where
        I: IntoIterator<Item = (StationId, usize)>,
    {
        let sorted: BTreeMap<StationId, usize> = stations.into_iter().collect();
        let mut board = LoadBoard::new();
        for (id, capacity) in sorted {
            board.index.insert(id, board.entries.len());
            board.entries.push(BoardEntry {
                id,
                capacity,
                queue_length: Cell::new(0),
            });
        }
        board
    }

    /// Record `station`'s current queue length. Unknown ids are ignored.
    pub fn publish(&self, station: StationId, queue_length: usize) {
        if let Some(&i) = self.index.get(&station) {
            self.entries[i].queue_length.set(queue_length);
        }
    }

    /// Snapshot of one station by id.
    pub fn load_of(&self, station: StationId) -> Option<PeerLoad> {
        let &i = self.index.get(&station)?;
        self.peer_at(i)
    }

    pub fn contains(&self, station: StationId) -> bool {
        self.index.contains_key(&station)
    }
}

impl PeerDirectory for LoadBoard {
    fn peer_count(&self) -> usize {
        self.entries.len()
    }

    fn peer_at(&self, index: usize) -> Option<PeerLoad> {
        self.entries.get(index).map(|e| PeerLoad {
            id: e.id,
            queue_length: e.queue_length.get(),
            capacity: e.capacity,
        })
    }
}

// ── StaticDirectory ───────────────────────────────────────────────────

/// A frozen directory, enumerated in the order given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticDirectory {
    entries: Vec<PeerLoad>,
}

impl StaticDirectory {
    pub fn new(entries: Vec<PeerLoad>) -> Self {
        StaticDirectory { entries }
    }

    /// Convenience constructor from `(id, queue_length, capacity)` triples.
    pub fn from_loads(loads: &[(u64, usize, usize)]) -> Self {
        StaticDirectory {
            entries: loads
                .iter()
                .map(|&(id, queue_length, capacity)| PeerLoad {
                    id: StationId::new(id),
                    queue_length,
                    capacity,
                })
                .collect(),
        }
    }
}

impl PeerDirectory for StaticDirectory {
    fn peer_count(&self) -> usize {
        self.entries.len()
    }

    fn peer_at(&self, index: usize) -> Option<PeerLoad> {
        self.entries.get(index).copied()
    }
}
