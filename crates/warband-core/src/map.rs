//! Hexagonal game map with axial coordinates (pointy-top orientation).

use smallvec::SmallVec;
use std::collections::{BTreeSet, VecDeque};

use crate::error::MapError;
use crate::id::Location;

/// Pointy-top hex offsets in axial `(dq, dr)` order: E, NE, NW, W, SW, SE.
const HEX_OFFSETS: [(i32, i32); 6] = [
    (1, 0),  // E
    (1, -1), // NE
    (0, -1), // NW
    (-1, 0), // W
    (-1, 1), // SW
    (0, 1),  // SE
];

/// Terrain of a single hex.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Terrain {
    /// Open grassland.
    #[default]
    Flat,
    /// Woods.
    Forest,
    /// Hills.
    Hills,
    /// Deep water; impassable for land units.
    Water,
    /// Castle; recruits and recalls are placed here.
    Castle,
    /// Keep; a leader standing here can recruit into connected castles.
    Keep,
    /// Village; can be captured for income.
    Village,
}

impl Terrain {
    /// Movement points needed to enter this hex, or `None` if impassable.
    pub fn move_cost(self) -> Option<u32> {
        match self {
            Terrain::Flat | Terrain::Castle | Terrain::Keep | Terrain::Village => Some(1),
            Terrain::Forest | Terrain::Hills => Some(2),
            Terrain::Water => None,
        }
    }

    /// Percentage chance that a unit standing here is hit by a strike.
    pub fn hit_chance(self) -> u32 {
        match self {
            Terrain::Flat => 60,
            Terrain::Forest | Terrain::Hills => 50,
            Terrain::Castle | Terrain::Keep | Terrain::Village => 40,
            Terrain::Water => 80,
        }
    }

    /// Castle-like terrain (castle or keep).
    pub fn is_castle(self) -> bool {
        matches!(self, Terrain::Castle | Terrain::Keep)
    }
}

/// A two-dimensional hex map with axial coordinates.
///
/// Each hex has coordinate `(x, y)` where `0 <= x < cols` and
/// `0 <= y < rows`. Edge hexes simply have fewer neighbours.
///
/// # Examples
///
/// ```
/// use warband_core::{HexMap, Location, Terrain};
///
/// let mut map = HexMap::new(5, 5).unwrap();
/// map.set_terrain(Location::new(2, 2), Terrain::Keep).unwrap();
/// assert_eq!(map.terrain(Location::new(2, 2)), Some(Terrain::Keep));
/// assert_eq!(map.neighbours(Location::new(2, 2)).len(), 6);
/// assert_eq!(map.neighbours(Location::new(0, 0)).len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HexMap {
    cols: u32,
    rows: u32,
    terrain: Vec<Terrain>,
}

impl HexMap {
    /// Maximum dimension size: coordinates use `i32`, so each axis must fit.
    pub const MAX_DIM: u32 = i32::MAX as u32;

    /// Create a new map of flat terrain with `cols * rows` hexes.
    pub fn new(cols: u32, rows: u32) -> Result<Self, MapError> {
        if rows == 0 || cols == 0 {
            return Err(MapError::Empty);
        }
        if cols > Self::MAX_DIM {
            return Err(MapError::TooLarge {
                name: "cols",
                value: cols,
                max: Self::MAX_DIM,
            });
        }
        if rows > Self::MAX_DIM {
            return Err(MapError::TooLarge {
                name: "rows",
                value: rows,
                max: Self::MAX_DIM,
            });
        }
        Ok(Self {
            cols,
            rows,
            terrain: vec![Terrain::Flat; cols as usize * rows as usize],
        })
    }

    /// Number of columns.
    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Number of rows.
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Whether `loc` lies on the map.
    pub fn contains(&self, loc: Location) -> bool {
        loc.x >= 0 && loc.y >= 0 && (loc.x as u32) < self.cols && (loc.y as u32) < self.rows
    }

    fn index(&self, loc: Location) -> Option<usize> {
        self.contains(loc)
            .then(|| loc.y as usize * self.cols as usize + loc.x as usize)
    }

    /// Terrain at `loc`, or `None` if off the map.
    pub fn terrain(&self, loc: Location) -> Option<Terrain> {
        self.index(loc).map(|i| self.terrain[i])
    }

    /// Set the terrain of a hex.
    pub fn set_terrain(&mut self, loc: Location, terrain: Terrain) -> Result<(), MapError> {
        let i = self.index(loc).ok_or(MapError::OffMap(loc))?;
        self.terrain[i] = terrain;
        Ok(())
    }

    /// On-map neighbours of `loc` in E, NE, NW, W, SW, SE order.
    pub fn neighbours(&self, loc: Location) -> SmallVec<[Location; 6]> {
        HEX_OFFSETS
            .iter()
            .map(|&(dq, dr)| Location::new(loc.x + dq, loc.y + dr))
            .filter(|&n| self.contains(n))
            .collect()
    }

    /// Hexes within `radius` of `center`, in canonical (row, column) order.
    pub fn within(&self, center: Location, radius: u32) -> Vec<Location> {
        let r = radius as i32;
        let mut out = Vec::new();
        for y in (center.y - r).max(0)..=(center.y + r) {
            for x in (center.x - r).max(0)..=(center.x + r) {
                let loc = Location::new(x, y);
                if self.contains(loc) && center.distance(loc) <= radius {
                    out.push(loc);
                }
            }
        }
        out
    }

    /// Every village hex, in canonical order.
    pub fn villages(&self) -> impl Iterator<Item = Location> + '_ {
        self.locations()
            .filter(move |&loc| self.terrain(loc) == Some(Terrain::Village))
    }

    /// Every hex on the map, row by row.
    pub fn locations(&self) -> impl Iterator<Item = Location> + '_ {
        (0..self.rows as i32)
            .flat_map(move |y| (0..self.cols as i32).map(move |x| Location::new(x, y)))
    }

    /// Castle hexes connected to the keep at `keep` through castle terrain.
    ///
    /// The keep itself is excluded. Returned in breadth-first order, which
    /// makes "nearest free castle hex" a simple linear scan.
    pub fn castle_network(&self, keep: Location) -> Vec<Location> {
        if self.terrain(keep) != Some(Terrain::Keep) {
            return Vec::new();
        }
        let mut seen = BTreeSet::from([keep]);
        let mut queue = VecDeque::from([keep]);
        let mut out = Vec::new();
        while let Some(loc) = queue.pop_front() {
            for n in self.neighbours(loc) {
                if self.terrain(n).is_some_and(Terrain::is_castle) && seen.insert(n) {
                    out.push(n);
                    queue.push_back(n);
                }
            }
        }
        out
    }
}
