//! Default vision: every hex within a unit's vision range.

use warband_core::{GameState, Location, UnitId};

use crate::hooks::{Reveal, Vision};

/// Clears hexes within `unit.vision` of where the unit stands.
#[derive(Clone, Copy, Debug, Default)]
pub struct RadiusVision;

impl Vision for RadiusVision {
    fn reveal(&self, game: &GameState, unit: UnitId, at: Location) -> Reveal {
        let Some(u) = game.unit(unit) else {
            return Reveal::default();
        };
        let Some(side) = game.side(u.side) else {
            return Reveal::default();
        };
        let cleared: Vec<Location> = game
            .map
            .within(at, u.vision)
            .into_iter()
            .filter(|loc| !side.cleared.contains(loc))
            .collect();
        let sighted = cleared
            .iter()
            .filter_map(|&loc| game.unit_at(loc))
            .filter(|other| other.side != u.side)
            .map(|other| other.id)
            .collect();
        Reveal { cleared, sighted }
    }
}
