//! `[fire_event raise=]` with optional `x=`/`y=` and any number of
//! `[set_variable name= value=]` children.
//!
//! Used by menu items and other UI-triggered scripts. Variables are bound
//! before the event fires so its handlers can read them.

use warband_core::CommandError;
use warband_replay::{tags, ActionRecord};

use crate::error::ActionError;
use crate::hooks::GameEvent;
use crate::registry::{CommandOutcome, RunOptions, UndoEffect};
use crate::session::SyncSession;

pub(crate) fn fire_event(
    session: &mut SyncSession,
    record: &ActionRecord,
    opts: RunOptions,
) -> Result<CommandOutcome, ActionError> {
    let name = record.require_str("raise")?.to_string();
    let at = if record.get("x").is_some() {
        Some(record.location()?)
    } else {
        None
    };
    let mut bindings = Vec::new();
    for child in record.children_named(tags::SET_VARIABLE) {
        let key = child.require_str("name")?;
        if key.is_empty() {
            return Err(CommandError::InvalidAttribute {
                key: "name".into(),
                value: String::new(),
            }
            .into());
        }
        let value = child.get_str("value").unwrap_or_default();
        bindings.push((key.to_string(), value.to_string()));
    }

    let bound = !bindings.is_empty();
    for (key, value) in bindings {
        session.game.variables.insert(key, value);
    }
    let event = match at {
        Some(loc) => GameEvent::at(&name, loc),
        None => GameEvent::new(&name),
    };
    let fired = session.fire_event(&event, opts.show)?;
    log::debug!("fired [{name}] (mutated: {})", fired.mutated);

    let undo = if fired.mutated || bound {
        UndoEffect::Commit
    } else {
        UndoEffect::Keep
    };
    Ok(CommandOutcome::new(undo).with_flow(fired.flow))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use warband_test_utils::fixtures;

    fn session() -> SyncSession {
        SyncSession::new(SessionConfig::default(), fixtures::skirmish()).unwrap()
    }

    #[test]
    fn variables_are_bound_and_commit() {
        let mut s = session();
        let rec = ActionRecord::new(tags::FIRE_EVENT)
            .with("raise", "menu_item_rally")
            .with_child(
                ActionRecord::new(tags::SET_VARIABLE)
                    .with("name", "rallied")
                    .with("value", "yes"),
            );
        assert!(s.run(rec).unwrap());
        assert_eq!(s.game().variables.get("rallied").map(String::as_str), Some("yes"));
        assert!(!s.undo_stack().can_undo());
    }

    #[test]
    fn cosmetic_event_keeps_undo_stack() {
        let mut s = session();
        s.run(
            ActionRecord::new(tags::RECRUIT)
                .with("type", "Spearman")
                .with("side", warband_core::SideId(1))
                .with_location(fixtures::CASTLE_1),
        )
        .unwrap();
        assert!(s
            .run(ActionRecord::new(tags::FIRE_EVENT).with("raise", "nothing_happens"))
            .unwrap());
        assert!(s.undo_stack().can_undo());
    }

    #[test]
    fn nameless_variable_is_rejected() {
        let mut s = session();
        let rec = ActionRecord::new(tags::FIRE_EVENT)
            .with("raise", "x")
            .with_child(ActionRecord::new(tags::SET_VARIABLE).with("name", ""));
        let r = s.run_and_store(rec, RunOptions::default()).unwrap();
        assert!(matches!(r.error, Some(CommandError::InvalidAttribute { .. })));
        assert!(s.game().variables.is_empty());
    }
}
