//! `[attack weapon= defender_weapon=]` with `[source]` and `[destination]`
//! children naming the two hexes.
//!
//! Attacks draw randomness, so they are never undoable.

use warband_core::{CommandError, Facing, Location, UnitId};
use warband_replay::{tags, ActionRecord};

use crate::error::ActionError;
use crate::hooks::{Engagement, GameEvent};
use crate::registry::{CommandOutcome, RunOptions, UndoEffect};
use crate::session::SyncSession;

/// `defender_weapon` value meaning "no retaliation".
const NO_COUNTER: i64 = -1;

pub(crate) fn attack(
    session: &mut SyncSession,
    record: &ActionRecord,
    opts: RunOptions,
) -> Result<CommandOutcome, ActionError> {
    let source = hex_of(record, tags::SOURCE)?;
    let destination = hex_of(record, tags::DESTINATION)?;
    let weapon = record.require_int("weapon")?;
    let defender_weapon = record.get_int("defender_weapon").unwrap_or(NO_COUNTER);

    let game = &session.game;
    let attacker = game
        .unit_at(source)
        .ok_or(CommandError::UnitMissing(source))?;
    let defender = game
        .unit_at(destination)
        .ok_or(CommandError::UnitMissing(destination))?;
    let weapon = weapon_index(weapon, attacker.attacks.len())?;
    let defender_weapon = if defender_weapon == NO_COUNTER {
        None
    } else {
        Some(weapon_index(defender_weapon, defender.attacks.len())?)
    };
    if !source.is_adjacent(destination) {
        return Err(CommandError::InvalidAttribute {
            key: tags::DESTINATION.into(),
            value: destination.to_string(),
        }
        .into());
    }
    let engagement = Engagement {
        attacker: attacker.id,
        defender: defender.id,
        weapon,
        defender_weapon,
    };

    let mut fired = session.fire_event(
        &GameEvent::between("attack", source, destination),
        opts.show,
    )?;
    if !fired.flow.is_continue() {
        return Ok(CommandOutcome::new(UndoEffect::Commit).with_flow(fired.flow));
    }
    if !still_standing(session, engagement.attacker, source)
        || !still_standing(session, engagement.defender, destination)
    {
        log::warn!("attack from {source} on {destination} called off by its event");
        return Ok(CommandOutcome::new(UndoEffect::Commit).with_flow(fired.flow));
    }

    let result = session
        .hooks
        .combat
        .resolve(&session.game, &engagement, &mut session.core)?;
    log::debug!(
        "attack {source} -> {destination}: {} of {} strikes hit",
        result.hits,
        result.strikes
    );
    if let Some(u) = session.game.unit_mut(engagement.attacker) {
        u.hitpoints = result.attacker_hp;
        u.experience += 1;
        u.facing = Facing::towards(source, destination).unwrap_or(u.facing);
    }
    if let Some(u) = session.game.unit_mut(engagement.defender) {
        u.hitpoints = result.defender_hp;
        u.experience += 1;
        u.facing = Facing::towards(destination, source).unwrap_or(u.facing);
    }

    for (id, at, killer) in [
        (engagement.defender, destination, source),
        (engagement.attacker, source, destination),
    ] {
        if session.game.unit(id).is_some_and(|u| u.is_dead()) {
            session.game.remove_unit(id);
            log::debug!("unit {id} died at {at}");
            let f = session.fire_event(&GameEvent::between("die", at, killer), opts.show)?;
            fired.flow = fired.flow.merge(f.flow);
        }
    }

    Ok(CommandOutcome::new(UndoEffect::Commit).with_flow(fired.flow))
}

fn hex_of(record: &ActionRecord, child: &str) -> Result<Location, CommandError> {
    record
        .child(child)
        .ok_or_else(|| CommandError::MissingAttribute {
            tag: record.tag.clone(),
            key: child.to_string(),
        })?
        .location()
}

fn weapon_index(index: i64, count: usize) -> Result<usize, CommandError> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < count)
        .ok_or(CommandError::InvalidWeapon { index, count })
}

fn still_standing(session: &SyncSession, unit: UnitId, at: Location) -> bool {
    session.game.unit(unit).is_some_and(|u| u.location == at)
}
