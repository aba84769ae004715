//! Side-turn boundaries: `[init_side side=]` and `[end_turn side=]`.

use warband_core::{CommandError, ControlFlow};
use warband_replay::ActionRecord;

use crate::error::ActionError;
use crate::registry::{CommandOutcome, RunOptions, UndoEffect};
use crate::session::SyncSession;

/// Income, movement reset and a fresh undo stack for the side.
///
/// No income is paid on the first turn.
pub(crate) fn init_side(
    session: &mut SyncSession,
    record: &ActionRecord,
    _opts: RunOptions,
) -> Result<CommandOutcome, ActionError> {
    let side_id = record.require_side("side")?;
    let game = &mut session.game;
    let villages = game.village_count(side_id) as i32;
    let income = if game.turn > 1 {
        game.rules.base_income + game.rules.village_income * villages
    } else {
        0
    };
    let side = game.require_side_mut(side_id)?;
    side.gold += income;
    side.action_bonus_count = 0;
    game.set_current_side(side_id);
    let ids: Vec<_> = game.units_of(side_id).map(|u| u.id).collect();
    for id in ids {
        if let Some(u) = game.unit_mut(id) {
            u.moves = u.max_moves;
        }
    }
    session.undo.new_side_turn(side_id);
    log::info!("turn {} side {side_id} starts, income {income}", session.game.turn);
    Ok(CommandOutcome::new(UndoEffect::Commit))
}

/// Hand the turn to the next side.
pub(crate) fn end_turn(
    session: &mut SyncSession,
    record: &ActionRecord,
    _opts: RunOptions,
) -> Result<CommandOutcome, ActionError> {
    let current = session.game.current_side();
    if record.get("side").is_some() {
        let side = record.require_side("side")?;
        if side != current {
            return Err(CommandError::InvalidAttribute {
                key: "side".into(),
                value: side.to_string(),
            }
            .into());
        }
    }
    let next = session.game.next_side();
    log::debug!("side {current} ended its turn, side {next} is next");
    Ok(CommandOutcome::new(UndoEffect::Commit).with_flow(ControlFlow::EndTurn))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use warband_core::SideId;
    use warband_replay::tags;
    use warband_test_utils::fixtures;

    #[test]
    fn turn_cycle_pays_income_after_the_first_turn() {
        let mut gs = fixtures::skirmish();
        gs.set_village_owner(fixtures::VILLAGE, Some(SideId(1)));
        let mut s = SyncSession::new(SessionConfig::default(), gs).unwrap();

        assert!(s.init_side(SideId(1)).unwrap().success);
        assert_eq!(s.game().side(SideId(1)).unwrap().gold, 100);

        let r = s.end_turn().unwrap();
        assert_eq!(r.flow, ControlFlow::EndTurn);
        assert_eq!(s.game().current_side(), SideId(2));
        s.end_turn().unwrap();
        assert_eq!(s.game().current_side(), SideId(1));
        assert_eq!(s.game().turn, 2);

        s.init_side(SideId(1)).unwrap();
        let rules = s.game().rules;
        assert_eq!(
            s.game().side(SideId(1)).unwrap().gold,
            100 + rules.base_income + rules.village_income
        );
    }

    #[test]
    fn init_side_restores_moves_and_resets_undo() {
        let mut s = SyncSession::new(SessionConfig::default(), fixtures::skirmish()).unwrap();
        let leader = s.game().leader_of(SideId(1)).unwrap().id;
        s.game_mut().unit_mut(leader).unwrap().moves = 0;
        s.init_side(SideId(1)).unwrap();
        let u = s.game().unit(leader).unwrap();
        assert_eq!(u.moves, u.max_moves);
        assert!(!s.undo_stack().can_undo());
        assert_eq!(s.undo_stack().side(), SideId(1));
    }

    #[test]
    fn ending_someone_elses_turn_is_rejected() {
        let mut s = SyncSession::new(SessionConfig::default(), fixtures::skirmish()).unwrap();
        let r = s
            .run_and_store(
                ActionRecord::new(tags::END_TURN).with("side", SideId(2)),
                RunOptions::no_undo(),
            )
            .unwrap();
        assert!(matches!(r.error, Some(CommandError::InvalidAttribute { .. })));
        assert_eq!(s.game().current_side(), SideId(1));
    }
}
