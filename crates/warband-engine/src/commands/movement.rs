//! `[move x="1,2,3" y="1,1,2"]`: walk the unit at the first hex along the
//! path.
//!
//! The path is validated up front. The walk itself may stop early: at an
//! occupied or impassable hex, when movement runs out, after capturing a
//! village, or when an enemy comes into view. Stopping early is not an
//! error; the unit stays where it got to.

use warband_core::{CommandError, Facing, Path};
use warband_replay::ActionRecord;

use crate::error::ActionError;
use crate::hooks::GameEvent;
use crate::registry::{CommandOutcome, RunOptions, UndoEffect};
use crate::session::SyncSession;
use crate::undo::UndoAction;

use super::{announce_sightings, capture_village, clear_vision};

pub(crate) fn move_unit(
    session: &mut SyncSession,
    record: &ActionRecord,
    opts: RunOptions,
) -> Result<CommandOutcome, ActionError> {
    let path = record.path()?;
    if path.len() < 2 {
        return Err(CommandError::InvalidPath(format!("{} hexes", path.len())).into());
    }
    for pair in path.windows(2) {
        if !session.game.map.contains(pair[1]) {
            return Err(CommandError::OffMap(pair[1]).into());
        }
        if !pair[0].is_adjacent(pair[1]) {
            return Err(CommandError::InvalidPath(format!("{} to {} is not a step", pair[0], pair[1])).into());
        }
    }
    let start = path[0];
    let unit = session
        .game
        .unit_at(start)
        .ok_or(CommandError::UnitMissing(start))?;
    let (id, side, starting_moves, starting_facing) = (unit.id, unit.side, unit.moves, unit.facing);
    let destination = path[path.len() - 1];
    if session.game.unit_at(destination).is_some() {
        log::warn!("move of unit {id}: destination {destination} is occupied");
    }

    let mut walked: Path = Path::new();
    walked.push(start);
    let mut moves = starting_moves;
    let mut facing = starting_facing;
    let mut village = None;
    let mut revealed = Vec::new();
    let mut sighted = Vec::new();
    let mut deferred = false;
    for &step in &path[1..] {
        if session.game.unit_at(step).is_some() {
            break;
        }
        let Some(cost) = session.game.map.terrain(step).and_then(|t| t.move_cost()) else {
            break;
        };
        if cost > moves {
            break;
        }
        let from = walked[walked.len() - 1];
        session.game.relocate(id, step)?;
        moves -= cost;
        facing = Facing::towards(from, step).unwrap_or(facing);
        walked.push(step);

        let sight = clear_vision(session, id, step);
        revealed.extend(sight.revealed);
        deferred |= sight.deferred;
        if !sight.sighted.is_empty() {
            log::debug!("unit {id} sighted {:?} from {step}", sight.sighted);
            sighted = sight.sighted;
            break;
        }
        if let Some(capture) = capture_village(&mut session.game, side, step) {
            village = Some(capture);
            moves = 0;
            break;
        }
    }

    if walked.len() == 1 {
        log::warn!("move of unit {id} from {start} could not take a step");
        return Ok(CommandOutcome::new(UndoEffect::Keep));
    }
    let reached = walked[walked.len() - 1];
    if let Some(u) = session.game.unit_mut(id) {
        u.moves = moves;
        u.facing = facing;
    }

    let mut fired = session.fire_event(&GameEvent::between("moveto", reached, start), opts.show)?;
    let spotted = announce_sightings(session, reached, &sighted, opts.show)?;
    fired.flow = fired.flow.merge(spotted.flow);

    let undo = if fired.mutated || !sighted.is_empty() {
        UndoEffect::Commit
    } else {
        UndoEffect::Add(UndoAction::Move {
            unit: id,
            path: walked,
            starting_moves,
            starting_facing,
            village,
            revealed,
        })
    };
    Ok(CommandOutcome::new(undo)
        .with_flow(fired.flow)
        .with_vision_pending(deferred))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use warband_core::{Location, SideId};
    use warband_replay::tags;
    use warband_test_utils::fixtures;

    fn walk(path: &[Location]) -> ActionRecord {
        ActionRecord::new(tags::MOVE).with_path(path)
    }

    fn session() -> SyncSession {
        SyncSession::new(SessionConfig::default(), fixtures::skirmish()).unwrap()
    }

    #[test]
    fn leader_walks_and_spends_moves() {
        let mut s = session();
        let leader = s.game().leader_of(SideId(1)).unwrap().id;
        let path = [fixtures::KEEP_1, Location::new(2, 1), Location::new(3, 0)];
        assert!(s.run(walk(&path)).unwrap());
        let u = s.game().unit(leader).unwrap();
        assert_eq!(u.location, Location::new(3, 0));
        assert_eq!(u.moves, u.max_moves - 2);
        assert_eq!(u.facing, Facing::NorthEast);
        assert!(s.undo_stack().can_undo());
    }

    #[test]
    fn village_capture_stops_the_walk() {
        let mut s = session();
        let leader = s.game().leader_of(SideId(1)).unwrap().id;
        let path = [
            fixtures::KEEP_1,
            Location::new(2, 1),
            fixtures::VILLAGE,
            Location::new(4, 1),
        ];
        s.run(walk(&path)).unwrap();
        let u = s.game().unit(leader).unwrap();
        assert_eq!(u.location, fixtures::VILLAGE);
        assert_eq!(u.moves, 0);
        assert_eq!(s.game().village_owner(fixtures::VILLAGE), Some(SideId(1)));
    }

    #[test]
    fn broken_paths_are_rejected() {
        let mut s = session();
        let r = s
            .run_and_store(walk(&[fixtures::KEEP_1, Location::new(3, 1)]), RunOptions::default())
            .unwrap();
        assert!(matches!(r.error, Some(CommandError::InvalidPath(_))));

        let r = s
            .run_and_store(walk(&[Location::new(4, 4), Location::new(4, 3)]), RunOptions::default())
            .unwrap();
        assert!(matches!(r.error, Some(CommandError::UnitMissing(_))));
        assert!(s.log().is_empty());
    }

    #[test]
    fn blocked_first_step_changes_nothing() {
        let mut s = session();
        s.run(
            ActionRecord::new(tags::RECRUIT)
                .with("type", "Spearman")
                .with("side", SideId(1))
                .with_location(fixtures::CASTLE_1),
        )
        .unwrap();
        let undo_len = s.undo_stack().undos().len();
        assert!(s.run(walk(&[fixtures::KEEP_1, fixtures::CASTLE_1])).unwrap());
        assert_eq!(s.game().leader_of(SideId(1)).unwrap().location, fixtures::KEEP_1);
        assert_eq!(s.undo_stack().undos().len(), undo_len);
    }
}
