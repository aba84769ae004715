//! Built-in command handlers and the helpers they share.
//!
//! Every handler validates its record completely before it changes
//! anything, so a rejection never leaves a half-applied command behind.

use warband_core::{GameState, Location, SideId, Terrain, UnitId};

use crate::error::SyncError;
use crate::hooks::GameEvent;
use crate::registry::CommandHandler;
use crate::session::{FiredEvent, SyncSession};
use crate::undo::VillageCapture;

mod attack;
mod disband;
mod events;
mod movement;
mod recall;
mod recruit;
mod shroud;
mod turn;

use warband_replay::tags;

/// Every built-in handler with its tag, in registration order.
pub(crate) fn builtins() -> Vec<(&'static str, Box<dyn CommandHandler>)> {
    fn entry(
        tag: &'static str,
        handler: impl CommandHandler + 'static,
    ) -> (&'static str, Box<dyn CommandHandler>) {
        (tag, Box::new(handler))
    }
    vec![
        entry(tags::RECRUIT, recruit::recruit),
        entry(tags::RECALL, recall::recall),
        entry(tags::MOVE, movement::move_unit),
        entry(tags::DISBAND, disband::disband),
        entry(tags::ATTACK, attack::attack),
        entry(tags::FIRE_EVENT, events::fire_event),
        entry(tags::AUTO_SHROUD, shroud::auto_shroud),
        entry(tags::UPDATE_SHROUD, shroud::update_shroud),
        entry(tags::INIT_SIDE, turn::init_side),
        entry(tags::END_TURN, turn::end_turn),
    ]
}

// ── Shared helpers ─────────────────────────────────────────────────

/// Take the village at `loc` for `side`, if there is one it does not own.
pub(crate) fn capture_village(
    game: &mut GameState,
    side: SideId,
    loc: Location,
) -> Option<VillageCapture> {
    if game.map.terrain(loc) != Some(Terrain::Village) || game.village_owner(loc) == Some(side) {
        return None;
    }
    let previous_owner = game.set_village_owner(loc, Some(side));
    let time_bonus = game.rules.village_time_bonus;
    if time_bonus {
        if let Some(s) = game.side_mut(side) {
            s.action_bonus_count += 1;
        }
    }
    log::debug!("side {side} captured village {loc}");
    Some(VillageCapture {
        location: loc,
        previous_owner,
        time_bonus,
    })
}

/// What a unit saw from one hex.
#[derive(Debug, Default)]
pub(crate) struct Sight {
    /// Hexes cleared for the unit's side.
    pub revealed: Vec<Location>,
    /// Enemy units spotted.
    pub sighted: Vec<UnitId>,
    /// Clearing was deferred to a later shroud update.
    pub deferred: bool,
}

/// Clear fog and shroud around `unit` standing at `at`.
///
/// A side with shroud and automatic updates turned off only remembers
/// that clearing is owed.
pub(crate) fn clear_vision(session: &mut SyncSession, unit: UnitId, at: Location) -> Sight {
    let Some(side_id) = session.game.unit(unit).map(|u| u.side) else {
        return Sight::default();
    };
    let Some(side) = session.game.side(side_id) else {
        return Sight::default();
    };
    if !side.tracks_vision() {
        return Sight::default();
    }
    if side.shroud && !side.auto_shroud {
        return Sight {
            deferred: true,
            ..Sight::default()
        };
    }
    let reveal = session.hooks.vision.reveal(&session.game, unit, at);
    // Only newly cleared hexes, so undo never re-shrouds what was seen before.
    let revealed = match session.game.side_mut(side_id) {
        Some(side) => reveal
            .cleared
            .into_iter()
            .filter(|&loc| side.clear_hex(loc))
            .collect(),
        None => Vec::new(),
    };
    Sight {
        revealed,
        sighted: reveal.sighted,
        deferred: false,
    }
}

/// Fire `sighted` for every newly spotted unit.
pub(crate) fn announce_sightings(
    session: &mut SyncSession,
    seen_from: Location,
    sighted: &[UnitId],
    show: bool,
) -> Result<FiredEvent, SyncError> {
    let mut fired = FiredEvent::default();
    for &id in sighted {
        let Some(at) = session.game.unit(id).map(|u| u.location) else {
            continue;
        };
        let f = session.fire_event(&GameEvent::between("sighted", at, seen_from), show)?;
        fired.mutated |= f.mutated;
        fired.flow = fired.flow.merge(f.flow);
    }
    Ok(fired)
}
