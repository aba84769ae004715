//! `[recall side= unit= x= y=]` with an optional `[from]` leader child.

use warband_core::CommandError;
use warband_replay::{tags, ActionRecord};

use crate::error::ActionError;
use crate::hooks::{GameEvent, PlacementPurpose};
use crate::registry::{CommandOutcome, RunOptions, UndoEffect};
use crate::session::SyncSession;
use crate::undo::UndoAction;

use super::recruit::facing_away;
use super::{announce_sightings, capture_village, clear_vision};

pub(crate) fn recall(
    session: &mut SyncSession,
    record: &ActionRecord,
    opts: RunOptions,
) -> Result<CommandOutcome, ActionError> {
    let side_id = record.require_side("side")?;
    let unit_id = record.require_unit("unit")?;
    let hint = record.location()?;
    let from = record.child(tags::FROM).map(ActionRecord::location).transpose()?;

    let game = &session.game;
    let side = game.require_side(side_id)?;
    let roster_index = side
        .recall_index(unit_id)
        .ok_or(CommandError::RosterEntryMissing {
            side: side_id,
            unit: unit_id,
        })?;
    let roster_copy = side.recall_list[roster_index].clone();
    let cost = roster_copy.recall_cost.unwrap_or(game.rules.recall_cost);
    if side.gold < cost {
        return Err(CommandError::InsufficientGold {
            side: side_id,
            needed: cost,
            available: side.gold,
        }
        .into());
    }
    let (placed_at, leader_at) = session
        .hooks
        .placement
        .find_placement(game, side_id, Some(hint), PlacementPurpose::Recall)
        .ok_or(CommandError::NoPlacement(side_id))?;
    if placed_at != hint {
        log::warn!("recall of unit {unit_id} placed at {placed_at} instead of {hint}");
    }
    if from.is_some_and(|f| f != leader_at) {
        log::warn!("recall of unit {unit_id} made by the leader at {leader_at}");
    }

    let mut unit = roster_copy.clone();
    unit.location = placed_at;
    unit.moves = 0;
    unit.facing = facing_away(leader_at, placed_at, unit.facing);
    let side = session.game.require_side_mut(side_id)?;
    side.recall_list.remove(roster_index);
    side.gold -= cost;
    side.stats.record_recall(cost);
    session.game.place_unit(unit)?;
    log::debug!("side {side_id} recalled unit {unit_id} to {placed_at} for {cost}");

    let village = capture_village(&mut session.game, side_id, placed_at);
    let sight = clear_vision(session, unit_id, placed_at);
    let mut fired = session.fire_event(
        &GameEvent::between("recall", placed_at, leader_at),
        opts.show,
    )?;
    let spotted = announce_sightings(session, placed_at, &sight.sighted, opts.show)?;
    fired.flow = fired.flow.merge(spotted.flow);

    let undo = if fired.mutated || !sight.sighted.is_empty() {
        UndoEffect::Commit
    } else {
        UndoEffect::Add(UndoAction::Recall {
            unit: roster_copy,
            roster_index,
            placed_at,
            leader_at,
            cost,
            village,
            revealed: sight.revealed,
        })
    };
    Ok(CommandOutcome::new(undo)
        .with_flow(fired.flow)
        .with_vision_pending(sight.deferred))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use warband_core::{SideId, UnitId};
    use warband_test_utils::fixtures;

    fn order(unit: UnitId) -> ActionRecord {
        ActionRecord::new(tags::RECALL)
            .with("side", SideId(1))
            .with("unit", unit.0)
            .with_location(fixtures::CASTLE_1)
    }

    #[test]
    fn recall_uses_rules_cost_unless_overridden() {
        let mut gs = fixtures::skirmish();
        let veteran = fixtures::add_veteran(&mut gs, SideId(1));
        let mut s = SyncSession::new(SessionConfig::default(), gs).unwrap();
        assert!(s.run(order(veteran)).unwrap());
        let side = s.game().side(SideId(1)).unwrap();
        assert_eq!(side.gold, 100 - s.game().rules.recall_cost);
        assert!(side.recall_list.is_empty());
        assert_eq!(s.game().unit(veteran).unwrap().location, fixtures::CASTLE_1);
        assert_eq!(side.stats.recalls, 1);

        let mut gs = fixtures::skirmish();
        let veteran = fixtures::add_veteran(&mut gs, SideId(1));
        gs.require_side_mut(SideId(1)).unwrap().recall_list[0].recall_cost = Some(5);
        let mut s = SyncSession::new(SessionConfig::default(), gs).unwrap();
        s.run(order(veteran)).unwrap();
        assert_eq!(s.game().side(SideId(1)).unwrap().gold, 95);
    }

    #[test]
    fn missing_roster_entry_is_heavy() {
        let mut s = SyncSession::new(SessionConfig::default(), fixtures::skirmish()).unwrap();
        let r = s.run_and_store(order(UnitId(77)), RunOptions::default()).unwrap();
        let err = r.error.unwrap();
        assert_eq!(err.severity(), warband_core::Severity::Heavy);
    }

    #[test]
    fn negative_unit_id_is_rejected() {
        let mut gs = fixtures::skirmish();
        fixtures::add_veteran(&mut gs, SideId(1));
        let mut s = SyncSession::new(SessionConfig::default(), gs).unwrap();
        let r = s
            .run_and_store(order(UnitId(0)).with("unit", -1i64), RunOptions::default())
            .unwrap();
        assert!(matches!(
            r.error,
            Some(CommandError::InvalidAttribute { ref key, .. }) if key == "unit"
        ));
        assert!(s.log().is_empty());
        assert_eq!(s.game().side(SideId(1)).unwrap().recall_list.len(), 1);
    }
}
