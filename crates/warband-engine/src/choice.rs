//! The user-choice synchronizer.
//!
//! Game logic running inside a synced action sometimes needs an answer
//! that only one peer can give: a dialog on the side's owner's screen, an
//! AI decision. [`resolve`] gets exactly one answer per requested side and
//! makes every peer see the same one:
//!
//! - a peer replaying a log that already holds the answer extracts it;
//! - the peer that controls the side asks locally and records the answer;
//! - sides controlled by another peer are waited for over the link;
//! - sides controlled by nobody get a random answer from the synced
//!   provider, so every peer computes the same one.
//!
//! Answers are dependent records tagged with the choice name and stamped
//! with the answering side.

use std::collections::{BTreeMap, BTreeSet};

use warband_core::{Controller, GameState, SideId};
use warband_replay::ActionRecord;

use crate::context::{LocalChoiceScope, SyncCore, SyncedState};
use crate::error::{OosError, OosKind, SyncError};
use crate::rng::RandomSource;

/// A question that may be put to a side.
pub trait UserChoice {
    /// Ask the local controller of `side`.
    ///
    /// Random values drawn from `rng` are local and do not replicate; only
    /// the returned answer does.
    fn query_user(&mut self, side: SideId, rng: &mut dyn RandomSource) -> ActionRecord;

    /// Answer on behalf of a side nobody controls, from a synced roll.
    fn random_choice(&mut self, side: SideId, roll: u64) -> ActionRecord;

    /// Short text for logs.
    fn description(&self) -> String {
        "user choice".to_string()
    }
}

/// Get one answer from each of `sides` for the choice called `name`.
///
/// Outside a synced action nothing is replicated and every side is asked
/// locally. Inside a local choice this is an error.
pub fn resolve(
    core: &mut SyncCore,
    game: &GameState,
    name: &str,
    sides: &[SideId],
    choice: &mut dyn UserChoice,
) -> Result<BTreeMap<SideId, ActionRecord>, SyncError> {
    let mut answers = BTreeMap::new();
    match core.state {
        SyncedState::LocalChoice => return Err(SyncError::InLocalChoice),
        SyncedState::Unsynced => {
            for &side in sides {
                answers.insert(side, choice.query_user(side, &mut *core));
            }
            return Ok(answers);
        }
        SyncedState::Synced => {}
    }

    log::debug!("resolving [{name}] ({}) for {sides:?}", choice.description());
    let mut pending = BTreeSet::new();
    for &side in sides {
        match game.side(side).map(|s| s.controller) {
            None | Some(Controller::Empty) => {
                let roll = core.next_random()?;
                answers.insert(side, choice.random_choice(side, roll));
                core.metrics.choices_random += 1;
            }
            Some(_) => {
                pending.insert(side);
            }
        }
    }

    let mut waited = false;
    while !pending.is_empty() {
        if let Some(rec) = core.log.next().cloned() {
            let position = core.log.position();
            let is_answer = rec.dependent && rec.tag == name;
            let side = match rec.from_side {
                Some(side) => Some(side).filter(|s| pending.contains(s)),
                // Answers from older peers carry no side; accept them only
                // when the side is unambiguous.
                None if pending.len() == 1 => pending.first().copied(),
                None => None,
            };
            if let (true, Some(side), false) = (is_answer, side, rec.side_invalid) {
                core.log.advance()?;
                pending.remove(&side);
                if waited {
                    core.metrics.choices_remote += 1;
                } else {
                    core.metrics.choices_from_log += 1;
                }
                answers.insert(side, rec);
                continue;
            }
            core.report_oos(OosError {
                kind: if is_answer {
                    OosKind::ChoiceSide
                } else {
                    OosKind::UnexpectedRecord
                },
                expected: format!("[{name}] from one of {pending:?}"),
                actual: rec.to_string(),
                position,
            })?;
            fall_back_locally(core, &pending, choice, &mut answers);
            break;
        }

        if let Some(side) = pending.iter().copied().find(|&s| is_local(game, s)) {
            let answer = {
                let mut scope = LocalChoiceScope::enter(core);
                choice.query_user(side, &mut *scope)
            };
            let rec = stamp(answer, name, side);
            core.log.append(rec.clone())?;
            core.metrics.choices_local += 1;
            pending.remove(&side);
            answers.insert(side, rec);
            continue;
        }

        if core.link.is_none() {
            core.protocol_error(format!(
                "no peer can answer [{name}] for {pending:?}; answering locally"
            ))?;
            fall_back_locally(core, &pending, choice, &mut answers);
            break;
        }
        core.flush_for_wait()?;
        core.wait_for_remote(name)?;
        waited = true;
    }
    Ok(answers)
}

/// [`resolve`] for a single side.
pub fn resolve_one(
    core: &mut SyncCore,
    game: &GameState,
    name: &str,
    side: SideId,
    choice: &mut dyn UserChoice,
) -> Result<ActionRecord, SyncError> {
    resolve(core, game, name, &[side], choice)?
        .remove(&side)
        .ok_or_else(|| SyncError::Protocol(format!("no answer from side {side} to [{name}]")))
}

fn is_local(game: &GameState, side: SideId) -> bool {
    game.side(side).is_some_and(|s| s.controller.is_local())
}

fn stamp(mut answer: ActionRecord, name: &str, side: SideId) -> ActionRecord {
    answer.tag = name.to_string();
    answer.dependent = true;
    answer.from_side = Some(side);
    answer.side_invalid = false;
    answer
}

/// Answer every pending side here without recording anything.
fn fall_back_locally(
    core: &mut SyncCore,
    pending: &BTreeSet<SideId>,
    choice: &mut dyn UserChoice,
    answers: &mut BTreeMap<SideId, ActionRecord>,
) {
    let mut scope = LocalChoiceScope::enter(core);
    for &side in pending {
        answers.insert(side, choice.query_user(side, &mut *scope));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OosPolicy, SessionConfig};
    use crate::rng::DeterministicRandom;
    use warband_core::{HexMap, Rules, UnitCatalog};
    use warband_replay::ActionLog;

    struct Pick {
        queries: u32,
    }

    impl UserChoice for Pick {
        fn query_user(&mut self, side: SideId, _rng: &mut dyn RandomSource) -> ActionRecord {
            self.queries += 1;
            ActionRecord::new("answer").with("value", side.0 * 10)
        }

        fn random_choice(&mut self, _side: SideId, roll: u64) -> ActionRecord {
            ActionRecord::new("answer").with("value", roll % 3)
        }
    }

    fn game(controllers: &[Controller]) -> GameState {
        let mut gs = GameState::new(HexMap::new(3, 3).unwrap(), UnitCatalog::new(), Rules::default(), 1);
        for &c in controllers {
            gs.add_side(c, 0);
        }
        gs
    }

    fn synced(config: SessionConfig) -> SyncCore {
        let mut core = SyncCore::new(config);
        core.state = SyncedState::Synced;
        core.rng = Box::new(DeterministicRandom::new(1, 0));
        core
    }

    #[test]
    fn unsynced_asks_locally_and_records_nothing() {
        let gs = game(&[Controller::Human]);
        let mut core = SyncCore::new(SessionConfig::default());
        let mut pick = Pick { queries: 0 };
        let got = resolve(&mut core, &gs, "pick", &[SideId(1)], &mut pick).unwrap();
        assert_eq!(got[&SideId(1)].get_int("value"), Some(10));
        assert!(core.log.is_empty());
    }

    #[test]
    fn local_answer_is_stamped_and_recorded() {
        let gs = game(&[Controller::Human]);
        let mut core = synced(SessionConfig::default());
        let mut pick = Pick { queries: 0 };
        let got = resolve_one(&mut core, &gs, "pick", SideId(1), &mut pick).unwrap();

        assert_eq!(got.tag, "pick");
        assert!(got.dependent);
        assert_eq!(got.from_side, Some(SideId(1)));
        assert_eq!(core.log.records(), &[got]);
        assert_eq!(core.metrics.choices_local, 1);
        // Asking locally draws nothing from the synced provider.
        assert_eq!(core.call_count(), 0);
        assert_eq!(core.state(), SyncedState::Synced);
    }

    #[test]
    fn replay_extracts_without_asking() {
        let gs = game(&[Controller::Human]);
        let mut core = synced(SessionConfig::default());
        core.log = ActionLog::from_records(vec![stamp(
            ActionRecord::new("x").with("value", 7),
            "pick",
            SideId(1),
        )]);
        let mut pick = Pick { queries: 0 };
        let got = resolve_one(&mut core, &gs, "pick", SideId(1), &mut pick).unwrap();
        assert_eq!(got.get_int("value"), Some(7));
        assert_eq!(pick.queries, 0);
        assert_eq!(core.metrics.choices_from_log, 1);
    }

    #[test]
    fn empty_side_gets_a_synced_random_answer() {
        let gs = game(&[Controller::Empty]);
        let mut a = synced(SessionConfig::default());
        let mut b = synced(SessionConfig::default());
        let mut pick = Pick { queries: 0 };
        let x = resolve_one(&mut a, &gs, "pick", SideId(1), &mut pick).unwrap();
        let y = resolve_one(&mut b, &gs, "pick", SideId(1), &mut pick).unwrap();
        assert_eq!(x, y);
        assert_eq!(a.call_count(), 1);
        assert_eq!(pick.queries, 0);
        assert!(a.log.is_empty());
    }

    #[test]
    fn answer_from_wrong_side_is_oos() {
        let gs = game(&[Controller::Human, Controller::Human]);
        let mut core = synced(SessionConfig::default());
        core.log = ActionLog::from_records(vec![stamp(ActionRecord::new("x"), "pick", SideId(2))]);
        let err = resolve_one(&mut core, &gs, "pick", SideId(1), &mut Pick { queries: 0 }).unwrap_err();
        assert!(matches!(err, SyncError::Oos(OosError { kind: OosKind::ChoiceSide, .. })));
    }

    #[test]
    fn continue_anyway_falls_back_to_local_answer() {
        let gs = game(&[Controller::Human]);
        let mut core = synced(SessionConfig {
            oos_policy: OosPolicy::ContinueAnyway,
            ..SessionConfig::default()
        });
        core.log = ActionLog::from_records(vec![ActionRecord::new("move")]);
        let mut pick = Pick { queries: 0 };
        let got = resolve_one(&mut core, &gs, "pick", SideId(1), &mut pick).unwrap();
        assert_eq!(got.get_int("value"), Some(10));
        assert_eq!(pick.queries, 1);
        // The next command stays where it was.
        assert_eq!(core.log.position(), 0);
    }

    #[test]
    fn remote_side_without_link() {
        let gs = game(&[Controller::Remote]);
        let mut solo = synced(SessionConfig::default());
        let mut pick = Pick { queries: 0 };
        assert!(resolve_one(&mut solo, &gs, "pick", SideId(1), &mut pick).is_ok());
        assert_eq!(pick.queries, 1);

        let mut net = synced(SessionConfig {
            networked: true,
            ..SessionConfig::default()
        });
        assert!(matches!(
            resolve_one(&mut net, &gs, "pick", SideId(1), &mut pick),
            Err(SyncError::Protocol(_))
        ));
    }

    #[test]
    fn nested_in_local_choice_is_rejected() {
        let gs = game(&[Controller::Human]);
        let mut core = synced(SessionConfig::default());
        let mut scope = LocalChoiceScope::enter(&mut core);
        assert!(matches!(
            resolve_one(&mut scope, &gs, "pick", SideId(1), &mut Pick { queries: 0 }),
            Err(SyncError::InLocalChoice)
        ));
    }
}
