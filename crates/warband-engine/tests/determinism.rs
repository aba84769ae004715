//! Integration test: a follower replaying an originator's log ends up in
//! the same state, through memory and through a replay file.
//!
//! The script mixes commands that draw randomness (a random-trait recruit,
//! an attack with retaliation) with ones that do not, so both the seed
//! records and the checkups are exercised.

use warband_core::{ControlFlow, GameState, Location, SideId, Unit};
use warband_engine::{OosKind, OosPolicy, RunOptions, SessionConfig, SyncError, SyncSession};
use warband_replay::{
    config_hash, state_checksum, tags, ActionLog, ActionRecord, BuildMetadata, ReplayReader,
    ReplayWriter, RngPolicy, ScenarioDescriptor,
};
use warband_test_utils::{fixtures, init_logging};

/// Where side 2's spearman waits to be attacked.
const TARGET: Location = Location::new(2, 0);

fn scenario() -> GameState {
    let mut gs = fixtures::skirmish();
    let spear = gs.catalog.get("Spearman").unwrap().clone();
    let id = gs.allocate_unit_id();
    gs.place_unit(Unit::from_type(id, &spear, SideId(2), TARGET))
        .unwrap();
    gs
}

fn recruit(unit_type: &str, at: Location) -> ActionRecord {
    ActionRecord::new(tags::RECRUIT)
        .with("type", unit_type)
        .with("side", SideId(1))
        .with_location(at)
}

fn attack(from: Location, to: Location) -> ActionRecord {
    ActionRecord::new(tags::ATTACK)
        .with("weapon", 0i64)
        .with("defender_weapon", 0i64)
        .with_child(ActionRecord::new(tags::SOURCE).with_location(from))
        .with_child(ActionRecord::new(tags::DESTINATION).with_location(to))
}

/// Play side 1's first turn.
fn play(config: SessionConfig) -> SyncSession {
    let mut s = SyncSession::new(config, scenario()).unwrap();
    assert!(s.init_side(SideId(1)).unwrap().success);
    assert!(s.run(recruit("Thief", fixtures::CASTLE_1)).unwrap());
    assert!(s.run(recruit("Elvish Fighter", fixtures::CASTLE_2)).unwrap());
    assert!(s.run(attack(fixtures::KEEP_1, TARGET)).unwrap());
    let end = s.end_turn().unwrap();
    assert_eq!(end.flow, ControlFlow::EndTurn);
    s
}

fn follower(config: SessionConfig, records: Vec<ActionRecord>) -> SyncSession {
    SyncSession::new(config, scenario())
        .unwrap()
        .with_log(ActionLog::from_records(records))
}

#[test]
fn follower_reproduces_originator_state() {
    init_logging();
    let original = play(SessionConfig::default());
    assert!(original.metrics().seeds_generated >= 2);

    let mut copy = follower(SessionConfig::default(), original.log().records().to_vec());
    assert_eq!(copy.replay_all().unwrap(), ControlFlow::EndTurn);
    assert!(copy.log().at_end());
    assert_eq!(copy.game(), original.game());
    assert_eq!(state_checksum(copy.game()), state_checksum(original.game()));
    assert_eq!(copy.metrics().commands_replayed, 5);
    assert_eq!(copy.metrics().seeds_from_log, original.metrics().seeds_generated);
    assert_eq!(copy.metrics().oos_detected, 0);
    assert!(copy.metrics().checkups_passed >= 4);
}

#[test]
fn replay_file_round_trip() {
    let original = play(SessionConfig::default());
    let meta = BuildMetadata {
        toolchain: "test".into(),
        target_triple: "test".into(),
        warband_version: env!("CARGO_PKG_VERSION").into(),
        compile_flags: "debug".into(),
    };
    let start = scenario();
    let descriptor = ScenarioDescriptor {
        seed: start.rng_seed,
        rng_policy: RngPolicy::SyncedNetwork,
        scenario_id: "skirmish".into(),
        config_hash: config_hash(&start),
    };

    let mut buf = Vec::new();
    let mut writer = ReplayWriter::new(&mut buf, &meta, &descriptor).unwrap();
    writer.write_log(original.log()).unwrap();
    writer.flush().unwrap();
    drop(writer);

    let reader = ReplayReader::open(buf.as_slice()).unwrap();
    assert_eq!(reader.scenario().config_hash, config_hash(&scenario()));
    let log = reader.into_log().unwrap();
    assert_eq!(log.records(), original.log().records());

    let mut copy = SyncSession::new(SessionConfig::default(), scenario())
        .unwrap()
        .with_log(log);
    copy.replay_all().unwrap();
    assert_eq!(state_checksum(copy.game()), state_checksum(original.game()));
}

#[test]
fn deterministic_policy_needs_no_seed_records() {
    let config = SessionConfig {
        rng_policy: RngPolicy::Deterministic,
        ..SessionConfig::default()
    };
    let a = play(config.clone());
    let b = play(config.clone());
    assert_eq!(a.game(), b.game());
    assert!(a
        .log()
        .records()
        .iter()
        .all(|r| r.tag != tags::RANDOM_SEED));
    // One stream per command that drew randomness.
    assert_eq!(a.game().rng_epoch, 2);

    let mut copy = follower(config, a.log().records().to_vec());
    copy.replay_all().unwrap();
    assert_eq!(copy.game(), a.game());
}

#[test]
fn missing_seed_is_out_of_sync() {
    let original = play(SessionConfig::default());
    let records: Vec<_> = original
        .log()
        .records()
        .iter()
        .filter(|r| r.tag != tags::RANDOM_SEED)
        .cloned()
        .collect();

    let mut copy = follower(SessionConfig::default(), records);
    let err = copy.replay_all().unwrap_err();
    match err {
        SyncError::Oos(oos) => assert_eq!(oos.kind, OosKind::RandomSeed),
        other => panic!("expected OOS, got {other}"),
    }
}

#[test]
fn continue_anyway_counts_divergence() {
    let original = play(SessionConfig::default());
    let mut records = original.log().records().to_vec();
    // Corrupt the first checkup's draw count.
    let checkup = records
        .iter_mut()
        .find(|r| r.tag == tags::CHECKUP && r.get_int("random_calls") == Some(0))
        .unwrap();
    checkup.set("random_calls", 99i64);

    let config = SessionConfig {
        oos_policy: OosPolicy::ContinueAnyway,
        ..SessionConfig::default()
    };
    let mut copy = follower(config, records);
    copy.replay_all().unwrap();
    assert_eq!(copy.metrics().oos_detected, 1);
    assert_eq!(copy.metrics().oos_ignored, 1);
    assert_eq!(copy.game(), original.game());
}

#[test]
fn replayed_commands_are_not_undoable() {
    let original = play(SessionConfig::default());
    let mut copy = follower(SessionConfig::default(), original.log().records().to_vec());
    copy.replay_next().unwrap().unwrap();
    assert!(!copy.undo_stack().can_undo());

    // Unread records remain, so this peer may not originate anything.
    let r = copy
        .run_if_not_already(recruit("Spearman", fixtures::CASTLE_3), RunOptions::default())
        .unwrap();
    assert!(!r.success);
    assert_eq!(r.error, None);
    assert_eq!(copy.log().len(), original.log().len());
}
