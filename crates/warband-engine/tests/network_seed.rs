//! Integration test: in networked play the seed for a random command comes
//! from the authority, and the log alone is enough to replay it later.

use std::thread;
use std::time::Duration;

use warband_core::SideId;
use warband_engine::{NetworkLink, SeedServer, SessionConfig, SyncSession};
use warband_replay::{tags, ActionLog, ActionRecord};
use warband_test_utils::{fixtures, init_logging};

fn recruit(unit_type: &str) -> ActionRecord {
    ActionRecord::new(tags::RECRUIT)
        .with("type", unit_type)
        .with("side", SideId(1))
        .with_location(fixtures::CASTLE_1)
}

#[test]
fn seed_comes_from_authority() {
    init_logging();
    let (client, authority) = NetworkLink::pair();
    let server = thread::spawn(move || SeedServer::new(authority).run());

    let config = SessionConfig {
        choice_poll_interval: Duration::from_millis(5),
        choice_timeout: Some(Duration::from_secs(5)),
        ..SessionConfig::default()
    };
    let mut s = SyncSession::new(config, fixtures::skirmish())
        .unwrap()
        .with_link(client);
    assert!(s.run(recruit("Thief")).unwrap());
    assert_eq!(s.metrics().seeds_requested, 1);
    assert_eq!(s.metrics().seeds_generated, 0);
    assert!(!s.undo_stack().can_undo());

    let game = s.game().clone();
    let records = s.log().records().to_vec();
    // Hanging up stops the server.
    drop(s);
    let server = server.join().unwrap().unwrap();
    assert_eq!(server.answered(), 1);
    assert_eq!(server.received(), records.as_slice());

    let seeds: Vec<_> = records
        .iter()
        .filter(|r| r.tag == tags::RANDOM_SEED)
        .collect();
    assert_eq!(seeds.len(), 1);
    assert!(seeds[0].dependent);
    assert_eq!(seeds[0].get_u64("request_id"), Some(1));

    // No link: everything the replay needs is in the log.
    let mut copy = SyncSession::new(SessionConfig::default(), fixtures::skirmish())
        .unwrap()
        .with_log(ActionLog::from_records(records));
    copy.replay_all().unwrap();
    assert_eq!(copy.metrics().seeds_from_log, 1);
    assert_eq!(copy.metrics().seeds_requested, 0);
    assert_eq!(copy.game(), &game);
}

#[test]
fn commands_without_randomness_never_ask() {
    let (client, authority) = NetworkLink::pair();
    let server = thread::spawn(move || SeedServer::new(authority).run());

    let mut s = SyncSession::new(SessionConfig::default(), fixtures::skirmish())
        .unwrap()
        .with_link(client);
    assert!(s.run(recruit("Spearman")).unwrap());
    // Still undoable, so nothing has gone out yet.
    assert!(s.undo_stack().can_undo());
    assert_eq!(s.log().unsent_len(), 2);
    s.end_turn().unwrap();
    assert_eq!(s.log().unsent_len(), 0);
    drop(s);

    let server = server.join().unwrap().unwrap();
    assert_eq!(server.answered(), 0);
    let sent: Vec<_> = server
        .received()
        .iter()
        .filter(|r| !r.dependent)
        .map(|r| r.tag.as_str())
        .collect();
    assert_eq!(sent, [tags::RECRUIT, tags::END_TURN]);
}
