/// Virtual time for the station mesh.
///
/// Represents a logical timestamp with no dependency on `std::time`.
/// Time advances only when the scheduler processes events — never from
/// wall-clock observation.
///
/// Durations in the model are real-valued (a task of size 3 served at
/// rate 2 takes 1.5 units), so every value is stored as an integer tick
/// count at microsecond resolution. Integer ticks keep the scheduler's
/// ordering exact and runs reproducible across platforms.

use serde::{Deserialize, Serialize};

/// Number of ticks in one virtual-time unit.
pub const TICKS_PER_UNIT: u64 = 1_000_000;

/// Convert a real-valued span in units to ticks, rounding to the nearest
/// tick. Negative, NaN and infinite inputs clamp to zero or `u64::MAX`.
fn units_to_ticks(units: f64) -> u64 {
    if units.is_nan() || units <= 0.0 {
        return 0;
    }
    let ticks = (units * TICKS_PER_UNIT as f64).round();
    if ticks >= u64::MAX as f64 {
        u64::MAX
    } else {
        ticks as u64
    }
}

// ── VirtualTime ───────────────────────────────────────────────────────

/// A point on the simulation clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VirtualTime(u64);

impl VirtualTime {
    /// The zero-point of simulation time.
    pub const ZERO: VirtualTime = VirtualTime(0);

    /// Create a new `VirtualTime` from a raw tick value.
    #[inline]
    pub fn new(ticks: u64) -> Self {
        VirtualTime(ticks)
    }

    /// Create a `VirtualTime` from a real-valued number of units.
    #[inline]
    pub fn from_units(units: f64) -> Self {
        VirtualTime(units_to_ticks(units))
    }

    /// Return the raw tick value.
    #[inline]
    pub fn ticks(self) -> u64 {
        self.0
    }

    /// This instant expressed in units.
    #[inline]
    pub fn as_units(self) -> f64 {
        self.0 as f64 / TICKS_PER_UNIT as f64
    }

    /// The instant `delay` after `self`.
    /// Returns `None` on overflow.
    #[inline]
    pub fn plus(self, delay: VirtualDuration) -> Option<VirtualTime> {
        self.0.checked_add(delay.0).map(VirtualTime)
    }

    /// Returns `true` if `self` is strictly before `other`.
    #[inline]
    pub fn is_before(self, other: VirtualTime) -> bool {
        self.0 < other.0
    }

    /// Returns the span between two points in time.
    /// Returns `None` if `earlier` is after `self`.
    #[inline]
    pub fn duration_since(self, earlier: VirtualTime) -> Option<VirtualDuration> {
        self.0.checked_sub(earlier.0).map(VirtualDuration)
    }
}

impl std::fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T={:.6}", self.as_units())
    }
}

// ── VirtualDuration ───────────────────────────────────────────────────

/// A non-negative span of virtual time.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct VirtualDuration(u64);

impl VirtualDuration {
    pub const ZERO: VirtualDuration = VirtualDuration(0);

    /// One full unit of virtual time.
    pub const UNIT: VirtualDuration = VirtualDuration(TICKS_PER_UNIT);

    #[inline]
    pub fn from_ticks(ticks: u64) -> Self {
        VirtualDuration(ticks)
    }

    /// Create a span from a real-valued number of units.
    #[inline]
    pub fn from_units(units: f64) -> Self {
        VirtualDuration(units_to_ticks(units))
    }

    #[inline]
    pub fn ticks(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn as_units(self) -> f64 {
        self.0 as f64 / TICKS_PER_UNIT as f64
    }

    #[inline]
    pub fn saturating_add(self, other: VirtualDuration) -> VirtualDuration {
        VirtualDuration(self.0.saturating_add(other.0))
    }
}

impl std::fmt::Display for VirtualDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}u", self.as_units())
    }
}
