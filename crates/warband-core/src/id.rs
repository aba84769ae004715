//! Strongly-typed identifiers, hex [`Location`]s and the [`Path`] alias.

use smallvec::SmallVec;
use std::fmt;

/// Identifies a side (player slot). Sides are numbered from 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SideId(pub u32);

impl SideId {
    /// Zero-based index into the side table.
    pub fn index(self) -> usize {
        (self.0 as usize).saturating_sub(1)
    }
}

impl fmt::Display for SideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SideId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a unit for its whole lifetime, on the board or on a recall list.
///
/// Allocated sequentially by [`GameState::allocate_unit_id`](crate::GameState::allocate_unit_id).
/// The next id to be handed out is part of the synchronized state and is
/// compared by the out-of-sync checker after every action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UnitId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// A hex on the map in axial coordinates (`x` = column q, `y` = row r).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    /// Column (axial q).
    pub x: i32,
    /// Row (axial r).
    pub y: i32,
}

impl Location {
    /// Create a location from axial coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Cube distance to `other`.
    pub fn distance(self, other: Location) -> u32 {
        let dq = other.x - self.x;
        let dr = other.y - self.y;
        dq.unsigned_abs()
            .max(dr.unsigned_abs())
            .max((dq + dr).unsigned_abs())
    }

    /// Whether `other` is one of the six neighbours of `self`.
    pub fn is_adjacent(self, other: Location) -> bool {
        self.distance(other) == 1
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// A sequence of hexes traversed by a move, starting at the unit's origin.
///
/// Most moves are short; eight inline slots cover them without a heap
/// allocation.
pub type Path = SmallVec<[Location; 8]>;

/// The direction a unit faces on a pointy-top hex grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Facing {
    /// East.
    East,
    /// North-east.
    NorthEast,
    /// North-west.
    NorthWest,
    /// West.
    West,
    /// South-west.
    SouthWest,
    /// South-east.
    #[default]
    SouthEast,
}

impl Facing {
    /// All facings in axial-offset order (E, NE, NW, W, SW, SE).
    pub const ALL: [Facing; 6] = [
        Facing::East,
        Facing::NorthEast,
        Facing::NorthWest,
        Facing::West,
        Facing::SouthWest,
        Facing::SouthEast,
    ];

    /// The facing a unit takes when moving from `from` towards `to`.
    ///
    /// Returns `None` when the two hexes coincide.
    pub fn towards(from: Location, to: Location) -> Option<Facing> {
        let dq = (to.x - from.x).signum();
        let dr = (to.y - from.y).signum();
        let facing = match (dq, dr) {
            (0, 0) => return None,
            (1, -1) => Facing::NorthEast,
            (1, 0) => Facing::East,
            (1, 1) | (0, 1) => Facing::SouthEast,
            (0, -1) | (-1, -1) => Facing::NorthWest,
            (-1, 0) => Facing::West,
            (-1, 1) => Facing::SouthWest,
            _ => unreachable!("signum is always -1, 0 or 1"),
        };
        Some(facing)
    }

    /// Stable numeric code, used when recording facings.
    pub fn code(self) -> u8 {
        match self {
            Facing::East => 0,
            Facing::NorthEast => 1,
            Facing::NorthWest => 2,
            Facing::West => 3,
            Facing::SouthWest => 4,
            Facing::SouthEast => 5,
        }
    }

    /// Inverse of [`code`](Facing::code).
    pub fn from_code(code: u8) -> Option<Facing> {
        Facing::ALL.get(code as usize).copied()
    }
}
