//! Core types for the intersection simulation
//!
//! Plain value types shared by vehicles, the signal controller and the
//! environment.

use std::fmt;
use std::ops::{Index, IndexMut};

/// A unique identifier for a vehicle agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleId(pub usize);

/// One of the directional streams feeding the intersection.
///
/// The approach is named after the side vehicles come from, so `North`
/// traffic enters from the north edge and drives south.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Approach {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

impl Approach {
    /// All approaches in the fixed order used for spawning and reporting
    pub const ALL: [Approach; 4] = [
        Approach::North,
        Approach::East,
        Approach::South,
        Approach::West,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Single-letter label used in summaries
    pub fn short_name(self) -> &'static str {
        match self {
            Approach::North => "N",
            Approach::East => "E",
            Approach::South => "S",
            Approach::West => "W",
        }
    }
}

impl fmt::Display for Approach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Approach::North => "north",
            Approach::East => "east",
            Approach::South => "south",
            Approach::West => "west",
        };
        f.write_str(name)
    }
}

/// A fixed-size map with one slot per approach
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ApproachMap<T>([T; 4]);

impl<T> ApproachMap<T> {
    pub fn from_fn(f: impl FnMut(Approach) -> T) -> Self {
        Self(Approach::ALL.map(f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Approach, &T)> {
        Approach::ALL.into_iter().zip(self.0.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Approach, &mut T)> {
        Approach::ALL.into_iter().zip(self.0.iter_mut())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }

    pub fn map<U>(&self, mut f: impl FnMut(Approach, &T) -> U) -> ApproachMap<U> {
        ApproachMap::from_fn(|approach| f(approach, &self[approach]))
    }
}

impl<T: Clone> ApproachMap<T> {
    pub fn splat(value: T) -> Self {
        Self::from_fn(|_| value.clone())
    }
}

impl<T> Index<Approach> for ApproachMap<T> {
    type Output = T;

    fn index(&self, approach: Approach) -> &T {
        &self.0[approach.index()]
    }
}

impl<T> IndexMut<Approach> for ApproachMap<T> {
    fn index_mut(&mut self, approach: Approach) -> &mut T {
        &mut self.0[approach.index()]
    }
}

/// A set of mutually compatible approaches that are green together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    approaches: Vec<Approach>,
}

impl Phase {
    pub fn new(approaches: &[Approach]) -> Self {
        let mut approaches = approaches.to_vec();
        approaches.sort();
        approaches.dedup();
        Self { approaches }
    }

    pub fn north_south() -> Self {
        Self::new(&[Approach::North, Approach::South])
    }

    pub fn east_west() -> Self {
        Self::new(&[Approach::East, Approach::West])
    }

    pub fn approaches(&self) -> &[Approach] {
        &self.approaches
    }

    pub fn contains(&self, approach: Approach) -> bool {
        self.approaches.contains(&approach)
    }

    pub fn is_empty(&self) -> bool {
        self.approaches.is_empty()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.approaches.iter().map(|a| a.short_name()).collect();
        write!(f, "{}", names.join("+"))
    }
}

/// Fraction of max velocity below which a vehicle counts as waiting
pub const WAIT_VELOCITY_FRACTION: f64 = 0.1;

/// Default free-flow speed in distance units per tick
pub const DEFAULT_MAX_VELOCITY: f64 = 1.0;

/// Default acceleration in distance units per tick squared
pub const DEFAULT_MAX_ACCELERATION: f64 = 0.25;

/// Default comfortable braking rate in distance units per tick squared
pub const DEFAULT_DECELERATION: f64 = 0.5;

/// Default minimum spacing between consecutive vehicle positions
pub const DEFAULT_MIN_GAP: f64 = 1.5;

/// Default distance from the lane entry to the stop line
pub const DEFAULT_APPROACH_LENGTH: f64 = 40.0;

/// Default distance from the stop line to the far boundary
pub const DEFAULT_INTERSECTION_WIDTH: f64 = 4.0;

/// Default reach of the stop-line detector used by adaptive control
pub const DEFAULT_DETECTION_RANGE: f64 = 12.0;
