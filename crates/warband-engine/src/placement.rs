//! Default placement: free castle hexes connected to a leader's keep.

use warband_core::{GameState, Location, SideId, Terrain};

use crate::hooks::{Placement, PlacementPurpose};

/// Places units on the castle network around a side's leaders.
///
/// Every leader of the side that stands on a keep is considered, in unit
/// id order. A hint inside one of their castles is used when it is free;
/// otherwise the first free castle hex of the first leader with room is
/// returned together with that leader.
#[derive(Clone, Copy, Debug, Default)]
pub struct CastlePlacement;

impl Placement for CastlePlacement {
    fn find_placement(
        &self,
        game: &GameState,
        side: SideId,
        hint: Option<Location>,
        purpose: PlacementPurpose,
    ) -> Option<(Location, Location)> {
        let mut fallback = None;
        let leaders = game
            .units_of(side)
            .filter(|u| u.can_recruit)
            .filter(|u| game.map.terrain(u.location) == Some(Terrain::Keep));
        for leader in leaders {
            let castle = game.map.castle_network(leader.location);
            if let Some(hint) = hint {
                if castle.contains(&hint) && game.unit_at(hint).is_none() {
                    return Some((hint, leader.location));
                }
            }
            // Placement and leader are only taken together, from a leader
            // that actually has room.
            if fallback.is_none() {
                if let Some(free) = castle.into_iter().find(|&h| game.unit_at(h).is_none()) {
                    fallback = Some((free, leader.location));
                }
            }
        }
        if fallback.is_none() {
            log::debug!("no free castle hex for side {side} ({purpose:?})");
        }
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warband_core::{Controller, HexMap, Rules, UnitCatalog, UnitId, UnitType};

    fn game() -> GameState {
        let mut map = HexMap::new(5, 5).unwrap();
        map.set_terrain(Location::new(1, 1), Terrain::Keep).unwrap();
        map.set_terrain(Location::new(2, 1), Terrain::Castle).unwrap();
        map.set_terrain(Location::new(1, 2), Terrain::Castle).unwrap();
        let mut gs = GameState::new(map, UnitCatalog::new(), Rules::default(), 1);
        let side = gs.add_side(Controller::Human, 100);
        let t = UnitType::new("Lord", 20, 40, 5);
        let id = gs.allocate_unit_id();
        gs.place_unit(warband_core::Unit::from_type(id, &t, side, Location::new(1, 1)).leader())
            .unwrap();
        gs
    }

    #[test]
    fn free_hint_is_used() {
        let gs = game();
        let got = CastlePlacement.find_placement(
            &gs,
            SideId(1),
            Some(Location::new(1, 2)),
            PlacementPurpose::Recruit,
        );
        assert_eq!(got, Some((Location::new(1, 2), Location::new(1, 1))));
    }

    #[test]
    fn occupied_hint_falls_back_to_first_free() {
        let mut gs = game();
        let t = UnitType::new("Spearman", 14, 36, 5);
        gs.place_unit(warband_core::Unit::from_type(
            UnitId(50),
            &t,
            SideId(1),
            Location::new(2, 1),
        ))
        .unwrap();
        let got = CastlePlacement.find_placement(
            &gs,
            SideId(1),
            Some(Location::new(2, 1)),
            PlacementPurpose::Recall,
        );
        assert_eq!(got, Some((Location::new(1, 2), Location::new(1, 1))));
    }

    #[test]
    fn leader_off_keep_cannot_place() {
        let mut gs = game();
        let leader = gs.leader_of(SideId(1)).unwrap().id;
        gs.relocate(leader, Location::new(3, 3)).unwrap();
        assert_eq!(
            CastlePlacement.find_placement(&gs, SideId(1), None, PlacementPurpose::Recruit),
            None
        );
    }

    #[test]
    fn hint_outside_castle_is_ignored() {
        let gs = game();
        let got = CastlePlacement.find_placement(
            &gs,
            SideId(1),
            Some(Location::new(4, 4)),
            PlacementPurpose::Recruit,
        );
        assert_eq!(got, Some((Location::new(2, 1), Location::new(1, 1))));
    }
}
