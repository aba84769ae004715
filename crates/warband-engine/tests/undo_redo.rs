//! Integration test: undo takes local actions back exactly, redo runs them
//! again, and nothing that drew synced randomness can be undone.

use proptest::prelude::*;

use warband_core::{GameState, Location, SideId, UnitId};
use warband_engine::{SessionConfig, SyncSession};
use warband_replay::{tags, ActionRecord};
use warband_test_utils::fixtures;

const CASTLES: [Location; 3] = [fixtures::CASTLE_1, fixtures::CASTLE_2, fixtures::CASTLE_3];

fn session(game: GameState) -> SyncSession {
    SyncSession::new(SessionConfig::default(), game).unwrap()
}

fn recruit(unit_type: &str, at: Location) -> ActionRecord {
    ActionRecord::new(tags::RECRUIT)
        .with("type", unit_type)
        .with("side", SideId(1))
        .with_location(at)
}

fn recall(unit: UnitId, at: Location) -> ActionRecord {
    ActionRecord::new(tags::RECALL)
        .with("side", SideId(1))
        .with("unit", unit.0)
        .with_location(at)
}

fn disband(unit: UnitId) -> ActionRecord {
    ActionRecord::new(tags::DISBAND)
        .with("side", SideId(1))
        .with("unit", unit.0)
}

fn walk(path: &[Location]) -> ActionRecord {
    ActionRecord::new(tags::MOVE).with_path(path)
}

fn auto_shroud(active: bool) -> ActionRecord {
    ActionRecord::new(tags::AUTO_SHROUD).with("active", active)
}

#[test]
fn recruit_undo_redo() {
    let mut s = session(fixtures::skirmish());
    let before = s.game().clone();
    assert!(s.run(recruit("Spearman", fixtures::CASTLE_1)).unwrap());
    let id = s.game().unit_at(fixtures::CASTLE_1).unwrap().id;
    assert_eq!(s.game().side(SideId(1)).unwrap().gold, 86);

    let report = s.undo().unwrap().unwrap();
    assert_eq!(report.action, "recruit");
    assert_eq!(report.depth, 0);
    assert_eq!(s.game(), &before);
    assert!(s.log().is_empty());
    assert!(s.undo_stack().can_redo());

    let redone = s.redo().unwrap().unwrap();
    assert!(redone.success);
    assert_eq!(s.game().side(SideId(1)).unwrap().gold, 86);
    assert_eq!(s.game().unit_at(fixtures::CASTLE_1).unwrap().id, id);
    assert!(!s.undo_stack().can_redo());
    assert_eq!(s.metrics().undos, 1);
    assert_eq!(s.metrics().redos, 1);
}

#[test]
fn move_undo_restores_village_and_bonus() {
    let mut s = session(fixtures::skirmish());
    let before = s.game().clone();
    let path = [fixtures::KEEP_1, fixtures::CASTLE_1, fixtures::VILLAGE];
    assert!(s.run(walk(&path)).unwrap());
    assert_eq!(s.game().village_owner(fixtures::VILLAGE), Some(SideId(1)));
    assert_eq!(s.game().side(SideId(1)).unwrap().action_bonus_count, 1);
    let leader = s.game().unit_at(fixtures::VILLAGE).unwrap();
    assert_eq!(leader.moves, 0);

    s.undo().unwrap().unwrap();
    assert_eq!(s.game(), &before);
    assert_eq!(s.game().village_owner(fixtures::VILLAGE), None);
}

#[test]
fn recall_undo_returns_unit_to_roster() {
    let mut game = fixtures::skirmish();
    let vet = fixtures::add_veteran(&mut game, SideId(1));
    let mut s = session(game);
    let before = s.game().clone();

    assert!(s.run(recall(vet, fixtures::CASTLE_2)).unwrap());
    let side = s.game().side(SideId(1)).unwrap();
    assert_eq!(side.gold, 80);
    assert_eq!(side.stats.recalls, 1);
    assert!(side.recall_list.is_empty());
    assert_eq!(s.game().unit(vet).unwrap().experience, 12);

    s.undo().unwrap().unwrap();
    assert_eq!(s.game(), &before);
    assert_eq!(s.game().side(SideId(1)).unwrap().stats.recall_spend, 0);
}

/// Undo the last action, redo it, and expect to land where it left off.
fn undo_then_redo(s: &mut SyncSession) {
    let after = s.game().clone();
    s.undo().unwrap().unwrap();
    assert_ne!(s.game(), &after);
    let redone = s.redo().unwrap().unwrap();
    assert!(redone.success);
    assert_eq!(s.game(), &after);
    assert!(s.undo_stack().can_undo());
    assert!(!s.undo_stack().can_redo());
}

#[test]
fn move_redo_captures_village_again() {
    let mut s = session(fixtures::skirmish());
    let path = [fixtures::KEEP_1, fixtures::CASTLE_1, fixtures::VILLAGE];
    assert!(s.run(walk(&path)).unwrap());
    undo_then_redo(&mut s);
    assert_eq!(s.game().village_owner(fixtures::VILLAGE), Some(SideId(1)));
    assert_eq!(s.game().side(SideId(1)).unwrap().action_bonus_count, 1);
}

#[test]
fn recall_redo_takes_unit_off_roster_again() {
    let mut game = fixtures::skirmish();
    let vet = fixtures::add_veteran(&mut game, SideId(1));
    let mut s = session(game);
    assert!(s.run(recall(vet, fixtures::CASTLE_2)).unwrap());
    undo_then_redo(&mut s);
    assert_eq!(s.game().unit_at(fixtures::CASTLE_2).map(|u| u.id), Some(vet));
    assert_eq!(s.game().side(SideId(1)).unwrap().gold, 80);
}

#[test]
fn disband_redo_drops_unit_again() {
    let mut game = fixtures::skirmish();
    let vet = fixtures::add_veteran(&mut game, SideId(1));
    let mut s = session(game);
    assert!(s.run(disband(vet)).unwrap());
    assert!(s.game().side(SideId(1)).unwrap().recall_list.is_empty());
    undo_then_redo(&mut s);
    assert!(s.game().side(SideId(1)).unwrap().recall_list.is_empty());
    assert_eq!(s.metrics().redos, 1);
}

#[test]
fn random_recruit_cannot_be_undone() {
    let mut s = session(fixtures::skirmish());
    assert!(s.run(recruit("Spearman", fixtures::CASTLE_1)).unwrap());
    assert!(s.run(recruit("Thief", fixtures::CASTLE_2)).unwrap());
    // The thief's traits came from a synced seed, which commits everything.
    assert!(!s.undo_stack().can_undo());
    assert_eq!(s.undo().unwrap(), None);
    assert_eq!(s.game().side(SideId(1)).unwrap().gold, 100 - 14 - 13);
    assert_eq!(s.log().unsent_len(), 0);
}

#[test]
fn undo_steps_over_shroud_toggles() {
    let mut s = session(fixtures::skirmish());
    assert!(s.run(recruit("Spearman", fixtures::CASTLE_1)).unwrap());
    assert!(s.run(auto_shroud(false)).unwrap());
    assert!(s.run(auto_shroud(true)).unwrap());
    assert_eq!(s.undo_stack().undos().len(), 3);

    let report = s.undo().unwrap().unwrap();
    assert_eq!(report.depth, 2);
    assert_eq!(report.action, "recruit");
    assert!(s.game().unit_at(fixtures::CASTLE_1).is_none());
    let tags_left: Vec<_> = s
        .log()
        .records()
        .iter()
        .filter(|r| !r.dependent)
        .map(|r| r.tag.as_str())
        .collect();
    assert_eq!(tags_left, [tags::AUTO_SHROUD, tags::AUTO_SHROUD]);

    // Only bookkeeping is left, and it is put back untouched.
    assert_eq!(s.undo().unwrap(), None);
    assert_eq!(s.undo_stack().undos().len(), 2);
}

#[test]
fn new_action_clears_redo() {
    let mut s = session(fixtures::skirmish());
    assert!(s.run(recruit("Spearman", fixtures::CASTLE_1)).unwrap());
    s.undo().unwrap().unwrap();
    assert!(s.undo_stack().can_redo());
    assert!(s.run(recruit("Elvish Fighter", fixtures::CASTLE_2)).unwrap());
    assert!(!s.undo_stack().can_redo());
    assert_eq!(s.redo().unwrap(), None);
}

#[test]
fn end_turn_commits() {
    let mut s = session(fixtures::skirmish());
    assert!(s.run(recruit("Spearman", fixtures::CASTLE_1)).unwrap());
    s.end_turn().unwrap();
    assert!(!s.undo_stack().can_undo());
    assert_eq!(s.game().current_side(), SideId(2));
}

// ── Property: undo everything, then redo everything ────────────────

#[derive(Clone, Debug)]
enum Op {
    Recruit { fighter: bool, castle: usize },
    StepLeader { direction: usize },
    Recall { castle: usize },
    Disband,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<bool>(), 0..CASTLES.len())
            .prop_map(|(fighter, castle)| Op::Recruit { fighter, castle }),
        (0usize..6).prop_map(|direction| Op::StepLeader { direction }),
        (0..CASTLES.len()).prop_map(|castle| Op::Recall { castle }),
        Just(Op::Disband),
    ]
}

fn apply(s: &mut SyncSession, op: &Op, vet: UnitId) {
    let command = match *op {
        Op::Recruit { fighter, castle } => {
            let unit_type = if fighter { "Elvish Fighter" } else { "Spearman" };
            recruit(unit_type, CASTLES[castle])
        }
        Op::StepLeader { direction } => {
            let Some(at) = s.game().leader_of(SideId(1)).map(|u| u.location) else {
                return;
            };
            let around = s.game().map.neighbours(at);
            let Some(&to) = around.get(direction % around.len().max(1)) else {
                return;
            };
            walk(&[at, to])
        }
        Op::Recall { castle } => recall(vet, CASTLES[castle]),
        Op::Disband => disband(vet),
    };
    // Rejections are fine; they must leave no trace either way.
    s.run(command).unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn undo_all_then_redo_all_round_trips(ops in prop::collection::vec(op(), 1..12)) {
        let mut game = fixtures::skirmish();
        let vet = fixtures::add_veteran(&mut game, SideId(1));
        let mut s = session(game);
        let start = s.game().clone();

        for op in &ops {
            apply(&mut s, op, vet);
        }
        let after = s.game().clone();
        let mut undone = 0;
        while s.undo().unwrap().is_some() {
            undone += 1;
            prop_assert!(undone <= ops.len());
        }
        prop_assert_eq!(s.game(), &start);
        prop_assert_eq!(s.metrics().undos as usize, undone);

        let mut redone = 0;
        while let Some(result) = s.redo().unwrap() {
            prop_assert!(result.success);
            redone += 1;
            prop_assert!(redone <= undone);
        }
        prop_assert_eq!(redone, undone);
        prop_assert_eq!(s.game(), &after);
    }
}
