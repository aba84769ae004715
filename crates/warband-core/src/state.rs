//! The synchronized game state aggregate.
//!
//! Everything in [`GameState`] must be identical on every peer after each
//! synced action. Unit placement is indexed both by id and by hex; the two
//! indexes are kept consistent by routing every board mutation through
//! [`place_unit`](GameState::place_unit), [`remove_unit`](GameState::remove_unit)
//! and [`relocate`](GameState::relocate).

use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};

use crate::error::CommandError;
use crate::id::{Location, SideId, UnitId};
use crate::map::HexMap;
use crate::side::{Controller, Side};
use crate::unit::{Unit, UnitCatalog};

/// Scenario-wide economic rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rules {
    /// Gold every side receives at the start of its turn.
    pub base_income: i32,
    /// Additional gold per owned village.
    pub village_income: i32,
    /// Default recall cost for units without an override.
    pub recall_cost: i32,
    /// Whether capturing a village extends the turn timer.
    pub village_time_bonus: bool,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            base_income: 2,
            village_income: 2,
            recall_cost: 20,
            village_time_bonus: true,
        }
    }
}

/// The full synchronized state of one scenario.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameState {
    /// Terrain.
    pub map: HexMap,
    /// Known unit types.
    pub catalog: UnitCatalog,
    /// Economic rules.
    pub rules: Rules,
    /// Current turn number, starting at 1.
    pub turn: u32,
    /// Scenario variables set by events.
    pub variables: IndexMap<String, String>,
    /// Scenario seed for the deterministic random policy.
    pub rng_seed: u64,
    /// Number of deterministic random streams consumed so far.
    pub rng_epoch: u64,
    current_side: SideId,
    sides: Vec<Side>,
    units: BTreeMap<UnitId, Unit>,
    positions: HashMap<Location, UnitId>,
    villages: BTreeMap<Location, SideId>,
    next_unit_id: u64,
}

impl GameState {
    /// A scenario with no sides and no units on turn 1.
    pub fn new(map: HexMap, catalog: UnitCatalog, rules: Rules, rng_seed: u64) -> Self {
        Self {
            map,
            catalog,
            rules,
            turn: 1,
            variables: IndexMap::new(),
            rng_seed,
            rng_epoch: 0,
            current_side: SideId(1),
            sides: Vec::new(),
            units: BTreeMap::new(),
            positions: HashMap::new(),
            villages: BTreeMap::new(),
            next_unit_id: 1,
        }
    }

    // ── Sides ────────────────────────────────────────────────────

    /// Append a side and return its id (sides are numbered from 1).
    pub fn add_side(&mut self, controller: Controller, gold: i32) -> SideId {
        let id = SideId(self.sides.len() as u32 + 1);
        self.sides.push(Side::new(id, controller, gold));
        id
    }

    /// Look up a side.
    pub fn side(&self, id: SideId) -> Option<&Side> {
        self.sides.get(id.index()).filter(|s| s.id == id)
    }

    /// Look up a side mutably.
    pub fn side_mut(&mut self, id: SideId) -> Option<&mut Side> {
        self.sides.get_mut(id.index()).filter(|s| s.id == id)
    }

    /// Look up a side, failing with [`CommandError::UnknownSide`].
    pub fn require_side(&self, id: SideId) -> Result<&Side, CommandError> {
        self.side(id).ok_or(CommandError::UnknownSide(id))
    }

    /// Look up a side mutably, failing with [`CommandError::UnknownSide`].
    pub fn require_side_mut(&mut self, id: SideId) -> Result<&mut Side, CommandError> {
        self.side_mut(id).ok_or(CommandError::UnknownSide(id))
    }

    /// All sides in id order.
    pub fn sides(&self) -> &[Side] {
        &self.sides
    }

    /// The side whose turn it is.
    pub fn current_side(&self) -> SideId {
        self.current_side
    }

    /// Set the side whose turn it is.
    pub fn set_current_side(&mut self, side: SideId) {
        self.current_side = side;
    }

    /// Move to the next side, wrapping to side 1 and bumping the turn.
    pub fn next_side(&mut self) -> SideId {
        let next = self.current_side.0 + 1;
        if next as usize > self.sides.len() {
            self.current_side = SideId(1);
            self.turn += 1;
        } else {
            self.current_side = SideId(next);
        }
        self.current_side
    }

    // ── Units ────────────────────────────────────────────────────

    /// Look up a unit on the board.
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Look up a unit on the board mutably.
    ///
    /// Do not change `location` through this; use [`relocate`](Self::relocate).
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// The unit standing at `loc`.
    pub fn unit_at(&self, loc: Location) -> Option<&Unit> {
        self.positions.get(&loc).and_then(|id| self.units.get(id))
    }

    /// All units on the board, in id order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Units on the board belonging to `side`.
    pub fn units_of(&self, side: SideId) -> impl Iterator<Item = &Unit> {
        self.units.values().filter(move |u| u.side == side)
    }

    /// The first leader (unit that can recruit) of `side`.
    pub fn leader_of(&self, side: SideId) -> Option<&Unit> {
        self.units_of(side).find(|u| u.can_recruit)
    }

    /// Put a unit on the board at its `location`.
    pub fn place_unit(&mut self, unit: Unit) -> Result<(), CommandError> {
        if !self.map.contains(unit.location) {
            return Err(CommandError::OffMap(unit.location));
        }
        if self.positions.contains_key(&unit.location) {
            return Err(CommandError::Occupied(unit.location));
        }
        self.positions.insert(unit.location, unit.id);
        self.units.insert(unit.id, unit);
        Ok(())
    }

    /// Take a unit off the board.
    pub fn remove_unit(&mut self, id: UnitId) -> Option<Unit> {
        let unit = self.units.remove(&id)?;
        self.positions.remove(&unit.location);
        Some(unit)
    }

    /// Move a unit to `to` without any game-rule checks beyond occupancy.
    pub fn relocate(&mut self, id: UnitId, to: Location) -> Result<(), CommandError> {
        if !self.map.contains(to) {
            return Err(CommandError::OffMap(to));
        }
        let from = self
            .units
            .get(&id)
            .map(|u| u.location)
            .ok_or(CommandError::UnitNotFound(id))?;
        if from == to {
            return Ok(());
        }
        if self.positions.contains_key(&to) {
            return Err(CommandError::Occupied(to));
        }
        self.positions.remove(&from);
        self.positions.insert(to, id);
        if let Some(u) = self.units.get_mut(&id) {
            u.location = to;
        }
        Ok(())
    }

    // ── Villages ─────────────────────────────────────────────────

    /// Owner of the village at `loc`.
    pub fn village_owner(&self, loc: Location) -> Option<SideId> {
        self.villages.get(&loc).copied()
    }

    /// Set or clear village ownership, returning the previous owner.
    pub fn set_village_owner(&mut self, loc: Location, owner: Option<SideId>) -> Option<SideId> {
        match owner {
            Some(side) => self.villages.insert(loc, side),
            None => self.villages.remove(&loc),
        }
    }

    /// Number of villages owned by `side`.
    pub fn village_count(&self, side: SideId) -> usize {
        self.villages.values().filter(|&&s| s == side).count()
    }

    /// All owned villages, in location order.
    pub fn villages(&self) -> impl Iterator<Item = (Location, SideId)> + '_ {
        self.villages.iter().map(|(&l, &s)| (l, s))
    }

    // ── Unit ids ─────────────────────────────────────────────────

    /// The id the next created unit will get.
    pub fn next_unit_id(&self) -> u64 {
        self.next_unit_id
    }

    /// Hand out a fresh unit id.
    pub fn allocate_unit_id(&mut self) -> UnitId {
        let id = UnitId(self.next_unit_id);
        self.next_unit_id += 1;
        id
    }

    /// Reset the id counter; used by undo to give back ids.
    pub fn set_next_unit_id(&mut self, next: u64) {
        self.next_unit_id = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::UnitType;

    fn state() -> GameState {
        let mut catalog = UnitCatalog::new();
        catalog.insert(UnitType::new("Spearman", 14, 36, 5));
        let map = HexMap::new(5, 5).unwrap();
        let mut gs = GameState::new(map, catalog, Rules::default(), 42);
        gs.add_side(Controller::Human, 100);
        gs.add_side(Controller::Remote, 100);
        gs
    }

    fn spearman(gs: &mut GameState, at: Location) -> Unit {
        let id = gs.allocate_unit_id();
        let t = gs.catalog.get("Spearman").unwrap().clone();
        Unit::from_type(id, &t, SideId(1), at)
    }

    #[test]
    fn sides_are_numbered_from_one() {
        let gs = state();
        assert_eq!(gs.sides().len(), 2);
        assert_eq!(gs.side(SideId(2)).unwrap().controller, Controller::Remote);
        assert!(gs.side(SideId(0)).is_none());
        assert!(gs.side(SideId(3)).is_none());
    }

    #[test]
    fn next_side_wraps_and_bumps_turn() {
        let mut gs = state();
        assert_eq!(gs.next_side(), SideId(2));
        assert_eq!(gs.turn, 1);
        assert_eq!(gs.next_side(), SideId(1));
        assert_eq!(gs.turn, 2);
    }

    #[test]
    fn place_and_remove_keep_index_consistent() {
        let mut gs = state();
        let at = Location::new(2, 2);
        let u = spearman(&mut gs, at);
        let id = u.id;
        gs.place_unit(u).unwrap();
        assert_eq!(gs.unit_at(at).map(|u| u.id), Some(id));

        let dup = spearman(&mut gs, at);
        assert_eq!(gs.place_unit(dup), Err(CommandError::Occupied(at)));

        let removed = gs.remove_unit(id).unwrap();
        assert_eq!(removed.id, id);
        assert!(gs.unit_at(at).is_none());
    }

    #[test]
    fn relocate_moves_index() {
        let mut gs = state();
        let u = spearman(&mut gs, Location::new(0, 0));
        let id = u.id;
        gs.place_unit(u).unwrap();
        gs.relocate(id, Location::new(1, 0)).unwrap();
        assert!(gs.unit_at(Location::new(0, 0)).is_none());
        assert_eq!(gs.unit(id).unwrap().location, Location::new(1, 0));
        assert_eq!(
            gs.relocate(id, Location::new(9, 9)),
            Err(CommandError::OffMap(Location::new(9, 9)))
        );
    }

    #[test]
    fn village_owner_returns_previous() {
        let mut gs = state();
        let v = Location::new(3, 3);
        assert_eq!(gs.set_village_owner(v, Some(SideId(1))), None);
        assert_eq!(gs.set_village_owner(v, Some(SideId(2))), Some(SideId(1)));
        assert_eq!(gs.village_count(SideId(2)), 1);
        assert_eq!(gs.set_village_owner(v, None), Some(SideId(2)));
        assert_eq!(gs.village_owner(v), None);
    }

    #[test]
    fn unit_ids_are_sequential() {
        let mut gs = state();
        assert_eq!(gs.allocate_unit_id(), UnitId(1));
        assert_eq!(gs.allocate_unit_id(), UnitId(2));
        gs.set_next_unit_id(2);
        assert_eq!(gs.allocate_unit_id(), UnitId(2));
    }
}
