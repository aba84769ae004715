//! `[recruit type= side= x= y=]` with an optional `[from x= y=]` child
//! naming the recruiting leader.

use smallvec::SmallVec;
use warband_core::{CommandError, Facing, Location, Trait, Unit};
use warband_replay::{tags, unit_checksum, ActionRecord};

use crate::error::ActionError;
use crate::hooks::{GameEvent, PlacementPurpose};
use crate::registry::{CommandOutcome, RunOptions, UndoEffect};
use crate::rng::RandomSource;
use crate::session::SyncSession;
use crate::undo::UndoAction;

use super::{announce_sightings, capture_village, clear_vision};

/// Random traits a unit with `random_traits` gets.
const TRAIT_DRAWS: usize = 2;

pub(crate) fn recruit(
    session: &mut SyncSession,
    record: &ActionRecord,
    opts: RunOptions,
) -> Result<CommandOutcome, ActionError> {
    let side_id = record.require_side("side")?;
    let type_id = record.require_str("type")?;
    let hint = record.location()?;
    let from = record.child(tags::FROM).map(ActionRecord::location).transpose()?;

    let game = &session.game;
    let side = game.require_side(side_id)?;
    let unit_type = game
        .catalog
        .get(type_id)
        .ok_or_else(|| CommandError::UnknownUnitType(type_id.to_string()))?
        .clone();
    if !side.can_recruit(type_id) {
        return Err(CommandError::NotRecruitable {
            side: side_id,
            unit_type: type_id.to_string(),
        }
        .into());
    }
    if side.gold < unit_type.cost {
        return Err(CommandError::InsufficientGold {
            side: side_id,
            needed: unit_type.cost,
            available: side.gold,
        }
        .into());
    }
    let (placed_at, leader_at) = session
        .hooks
        .placement
        .find_placement(game, side_id, Some(hint), PlacementPurpose::Recruit)
        .ok_or(CommandError::NoPlacement(side_id))?;
    if placed_at != hint {
        log::warn!("recruit of {type_id} placed at {placed_at} instead of {hint}");
    }
    if from.is_some_and(|f| f != leader_at) {
        log::warn!("recruit of {type_id} made by the leader at {leader_at}");
    }

    // Validation done; from here on the command applies.
    let id = session.game.allocate_unit_id();
    let mut unit = Unit::from_type(id, &unit_type, side_id, placed_at);
    if unit_type.random_traits {
        draw_traits(&mut *session, &mut unit)?;
    }
    unit.moves = 0;
    unit.facing = facing_away(leader_at, placed_at, unit.facing);
    let checksum = unit_checksum(&unit);
    session.game.place_unit(unit.clone())?;
    let side = session.game.require_side_mut(side_id)?;
    side.gold -= unit_type.cost;
    side.stats.record_recruit(unit_type.cost);
    log::debug!("side {side_id} recruited {type_id} as unit {id} at {placed_at}");

    let village = capture_village(&mut session.game, side_id, placed_at);
    let sight = clear_vision(session, id, placed_at);
    let mut fired = session.fire_event(
        &GameEvent::between("recruit", placed_at, leader_at),
        opts.show,
    )?;
    let spotted = announce_sightings(session, placed_at, &sight.sighted, opts.show)?;
    fired.flow = fired.flow.merge(spotted.flow);

    let undo = if fired.mutated || !sight.sighted.is_empty() {
        UndoEffect::Commit
    } else {
        UndoEffect::Add(UndoAction::Recruit {
            unit,
            placed_at,
            leader_at,
            cost: unit_type.cost,
            village,
            revealed: sight.revealed,
        })
    };
    Ok(CommandOutcome::new(undo)
        .with_flow(fired.flow)
        .with_checksum(checksum)
        .with_vision_pending(sight.deferred))
}

/// Draw distinct traits from the synced provider.
fn draw_traits(rng: &mut dyn RandomSource, unit: &mut Unit) -> Result<(), ActionError> {
    let mut pool: SmallVec<[Trait; 4]> = Trait::ALL.into_iter().collect();
    for _ in 0..TRAIT_DRAWS.min(pool.len()) {
        let pick = rng.random_below(pool.len() as u32)? as usize;
        unit.apply_trait(pool.remove(pick));
    }
    Ok(())
}

/// New units face away from the leader that placed them.
pub(super) fn facing_away(leader_at: Location, placed_at: Location, default: Facing) -> Facing {
    Facing::towards(leader_at, placed_at).unwrap_or(default)
}
