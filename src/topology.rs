/// Geometry of the mesh: where stations and clients sit on a field.
///
/// Stations are laid out on a regular grid; clients are scattered by a
/// [`Placement`] and attach to the nearest station. Distances only pick
/// targets; they do not affect latency.

use serde::{Deserialize, Serialize};

use crate::rng::DeterministicRng;
use crate::station::StationId;

/// The rectangular area the mesh covers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Field {
    pub width: f64,
    pub height: f64,
}

impl Field {
    pub fn new(width: f64, height: f64) -> Self {
        Field { width, height }
    }

    /// Clamp `p` onto the field.
    pub fn clamp(&self, p: Position) -> Position {
        Position {
            x: p.x.clamp(0.0, self.width.max(0.0)),
            y: p.y.clamp(0.0, self.height.max(0.0)),
        }
    }
}

impl Default for Field {
    fn default() -> Self {
        Field::new(1000.0, 1000.0)
    }
}

/// A point on the field.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Position { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Station positions for `n` stations: the centres of the cells of a
/// `g × g` grid, `g = ceil(sqrt(n))`, filled row by row.
pub fn grid_positions(n: usize, field: Field) -> Vec<Position> {
    if n == 0 {
        return Vec::new();
    }
    let g = (n as f64).sqrt().ceil() as usize;
    let cell_w = field.width / g as f64;
    let cell_h = field.height / g as f64;
    (0..n)
        .map(|i| {
            let (row, col) = (i / g, i % g);
            Position::new((col as f64 + 0.5) * cell_w, (row as f64 + 0.5) * cell_h)
        })
        .collect()
}

/// How clients are scattered over the field.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Placement {
    /// Uniform over the whole field.
    #[default]
    Uniform,
    /// Independent log-normal coordinates, clamped to the field.
    LogNormal { mu: f64, sigma: f64 },
}

impl Placement {
    pub fn sample(&self, field: Field, rng: &mut DeterministicRng) -> Position {
        match *self {
            Placement::Uniform => Position::new(
                rng.uniform(0.0, field.width),
                rng.uniform(0.0, field.height),
            ),
            Placement::LogNormal { mu, sigma } => {
                let x = rng.lognormal(mu, sigma);
                let y = rng.lognormal(mu, sigma);
                field.clamp(Position::new(x, y))
            }
        }
    }
}

/// The station closest to `at`. Ties go to the earliest entry.
pub fn nearest_station(at: Position, stations: &[(StationId, Position)]) -> Option<StationId> {
    let mut best: Option<(StationId, f64)> = None;
    for (id, pos) in stations {
        let d = at.distance(pos);
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((*id, d)),
        }
    }
    best.map(|(id, _)| id)
}
