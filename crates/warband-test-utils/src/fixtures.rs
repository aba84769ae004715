//! Small scenarios with known geometry.
//!
//! The skirmish map is 7x7, flat unless listed here:
//!
//! ```text
//! side 1: keep (1,1), castles (2,1) (1,2) (2,2)
//! side 2: keep (5,5), castles (4,5) (5,4)
//! village (3,1), forest (4,2), water (0,6)
//! ```

use warband_core::{
    Attack, Controller, GameState, HexMap, Location, Rules, SideId, Terrain, Unit, UnitCatalog,
    UnitId, UnitType,
};

pub const KEEP_1: Location = Location::new(1, 1);
pub const CASTLE_1: Location = Location::new(2, 1);
pub const CASTLE_2: Location = Location::new(1, 2);
pub const CASTLE_3: Location = Location::new(2, 2);
pub const KEEP_2: Location = Location::new(5, 5);
pub const CASTLE_2_A: Location = Location::new(4, 5);
pub const CASTLE_2_B: Location = Location::new(5, 4);
pub const VILLAGE: Location = Location::new(3, 1);
pub const FOREST: Location = Location::new(4, 2);
pub const WATER: Location = Location::new(0, 6);

/// Seed every fixture scenario uses.
pub const SEED: u64 = 0x5eed;

/// The unit types every fixture knows.
pub fn catalog() -> UnitCatalog {
    let mut c = UnitCatalog::new();
    c.insert(
        UnitType::new("Elvish Fighter", 14, 33, 5)
            .with_attack(Attack::melee("sword", 5, 4))
            .with_attack(Attack::ranged("bow", 3, 3)),
    );
    c.insert(UnitType::new("Spearman", 14, 36, 5).with_attack(Attack::melee("spear", 7, 3)));
    c.insert(
        UnitType::new("Thief", 13, 24, 6)
            .with_attack(Attack::melee("dagger", 4, 3))
            .with_random_traits(),
    );
    c.insert(UnitType::new("Lord", 40, 48, 5).with_attack(Attack::melee("sword", 8, 4)));
    c
}

fn map() -> HexMap {
    let mut m = HexMap::new(7, 7).expect("7x7 map");
    let terrain = [
        (KEEP_1, Terrain::Keep),
        (CASTLE_1, Terrain::Castle),
        (CASTLE_2, Terrain::Castle),
        (CASTLE_3, Terrain::Castle),
        (KEEP_2, Terrain::Keep),
        (CASTLE_2_A, Terrain::Castle),
        (CASTLE_2_B, Terrain::Castle),
        (VILLAGE, Terrain::Village),
        (FOREST, Terrain::Forest),
        (WATER, Terrain::Water),
    ];
    for (loc, t) in terrain {
        m.set_terrain(loc, t).expect("fixture hex on map");
    }
    m
}

/// Two sides, each with 100 gold and a leader on its keep.
///
/// Side 1 is a local human who may recruit every catalog type except the
/// leader's; side 2 is a local AI recruiting spearmen.
pub fn skirmish() -> GameState {
    with_controllers(Controller::Human, Controller::Ai)
}

/// [`skirmish`] seen from one peer of a two-player game: `local` is
/// human, the other side is remote.
pub fn two_player(local: SideId) -> GameState {
    if local == SideId(1) {
        with_controllers(Controller::Human, Controller::Remote)
    } else {
        with_controllers(Controller::Remote, Controller::Human)
    }
}

fn with_controllers(one: Controller, two: Controller) -> GameState {
    let mut gs = GameState::new(map(), catalog(), Rules::default(), SEED);
    let s1 = gs.add_side(one, 100);
    let s2 = gs.add_side(two, 100);
    gs.side_mut(s1).expect("side 1").recruits = vec![
        "Elvish Fighter".into(),
        "Spearman".into(),
        "Thief".into(),
    ];
    gs.side_mut(s2).expect("side 2").recruits = vec!["Spearman".into()];
    let lord = gs.catalog.get("Lord").expect("lord").clone();
    for (side, keep) in [(s1, KEEP_1), (s2, KEEP_2)] {
        let id = gs.allocate_unit_id();
        gs.place_unit(Unit::from_type(id, &lord, side, keep).leader())
            .expect("keep is free");
    }
    gs
}

/// Put an experienced spearman on `side`'s recall list.
pub fn add_veteran(gs: &mut GameState, side: SideId) -> UnitId {
    let spear = gs.catalog.get("Spearman").expect("spearman").clone();
    let id = gs.allocate_unit_id();
    let mut unit = Unit::from_type(id, &spear, side, Location::new(0, 0));
    unit.experience = 12;
    gs.side_mut(side).expect("side exists").recall_list.push(unit);
    id
}
