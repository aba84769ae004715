//! Shroud bookkeeping: `[auto_shroud active=]` and `[update_shroud]`.
//!
//! Both land on the undo stack without clearing redo. Undo steps over
//! them to the entry below.

use warband_core::{CommandError, Location, SideId};
use warband_replay::ActionRecord;

use crate::error::ActionError;
use crate::registry::{CommandOutcome, RunOptions, UndoEffect};
use crate::session::SyncSession;
use crate::undo::UndoAction;

fn side_of(session: &SyncSession, record: &ActionRecord) -> Result<SideId, CommandError> {
    if record.get("side").is_some() {
        record.require_side("side")
    } else {
        Ok(session.game.current_side())
    }
}

/// Turn automatic shroud updates on or off for a side.
pub(crate) fn auto_shroud(
    session: &mut SyncSession,
    record: &ActionRecord,
    _opts: RunOptions,
) -> Result<CommandOutcome, ActionError> {
    let side_id = side_of(session, record)?;
    let enabled = record
        .get_bool("active")
        .ok_or_else(|| CommandError::MissingAttribute {
            tag: record.tag.clone(),
            key: "active".into(),
        })?;
    let side = session.game.require_side_mut(side_id)?;
    if side.auto_shroud == enabled {
        return Ok(CommandOutcome::new(UndoEffect::Keep));
    }
    side.auto_shroud = enabled;
    log::debug!("side {side_id} auto shroud {}", if enabled { "on" } else { "off" });

    // Switching back on settles whatever was deferred while it was off.
    if enabled && session.undo.undos().iter().any(|e| e.vision_pending) {
        return Ok(CommandOutcome::new(UndoEffect::Commit));
    }
    Ok(CommandOutcome::new(UndoEffect::Add(
        UndoAction::AutoShroudToggle { enabled },
    )))
}

/// Clear shroud around every unit of a side now.
pub(crate) fn update_shroud(
    session: &mut SyncSession,
    record: &ActionRecord,
    _opts: RunOptions,
) -> Result<CommandOutcome, ActionError> {
    let side_id = side_of(session, record)?;
    let side = session.game.require_side(side_id)?;
    if !side.tracks_vision() {
        return Ok(CommandOutcome::new(UndoEffect::Keep));
    }
    let posts: Vec<_> = session
        .game
        .units_of(side_id)
        .map(|u| (u.id, u.location))
        .collect();
    let mut cleared: Vec<Location> = Vec::new();
    for (id, at) in posts {
        cleared.extend(session.hooks.vision.reveal(&session.game, id, at).cleared);
    }
    let side = session.game.require_side_mut(side_id)?;
    let fresh = cleared.into_iter().filter(|&loc| side.clear_hex(loc)).count();
    session.undo.take_pending_vision();
    log::debug!("side {side_id} shroud update cleared {fresh} hexes");
    Ok(CommandOutcome::new(UndoEffect::Add(UndoAction::ShroudUpdate)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use warband_replay::tags;
    use warband_test_utils::fixtures;

    fn shrouded() -> SyncSession {
        let mut gs = fixtures::skirmish();
        gs.require_side_mut(SideId(1)).unwrap().shroud = true;
        SyncSession::new(SessionConfig::default(), gs).unwrap()
    }

    fn recruit_spearman(s: &mut SyncSession) {
        s.run(
            ActionRecord::new(tags::RECRUIT)
                .with("type", "Spearman")
                .with("side", SideId(1))
                .with_location(fixtures::CASTLE_1),
        )
        .unwrap();
    }

    #[test]
    fn toggle_is_bookkeeping_and_keeps_redo() {
        let mut s = shrouded();
        recruit_spearman(&mut s);
        s.undo().unwrap();
        assert!(s.undo_stack().can_redo());

        let off = ActionRecord::new(tags::AUTO_SHROUD).with("active", false);
        assert!(s.run(off.clone()).unwrap());
        assert!(!s.game().side(SideId(1)).unwrap().auto_shroud);
        assert!(s.undo_stack().can_redo());
        assert_eq!(s.undo_stack().undos().len(), 1);

        // Same value again changes nothing.
        s.run(off).unwrap();
        assert_eq!(s.undo_stack().undos().len(), 1);
    }

    #[test]
    fn deferred_vision_is_settled_by_update() {
        let mut s = shrouded();
        s.run(ActionRecord::new(tags::AUTO_SHROUD).with("active", false))
            .unwrap();
        let cleared_before = s.game().side(SideId(1)).unwrap().cleared.len();
        recruit_spearman(&mut s);
        assert_eq!(s.game().side(SideId(1)).unwrap().cleared.len(), cleared_before);
        assert!(s.undo_stack().undos().iter().any(|e| e.vision_pending));

        assert!(s.run(ActionRecord::new(tags::UPDATE_SHROUD)).unwrap());
        assert!(s.game().side(SideId(1)).unwrap().cleared.len() > cleared_before);
        assert!(!s.undo_stack().undos().iter().any(|e| e.vision_pending));
    }

    #[test]
    fn update_without_shroud_is_a_no_op() {
        let mut s = SyncSession::new(SessionConfig::default(), fixtures::skirmish()).unwrap();
        assert!(s.run(ActionRecord::new(tags::UPDATE_SHROUD)).unwrap());
        assert!(s.undo_stack().undos().is_empty());
    }

    #[test]
    fn missing_active_is_heavy() {
        let mut s = shrouded();
        let r = s
            .run_and_store(ActionRecord::new(tags::AUTO_SHROUD), RunOptions::default())
            .unwrap();
        assert!(matches!(r.error, Some(CommandError::MissingAttribute { .. })));
    }
}
