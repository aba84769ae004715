//! Units, unit types and the unit-type catalog.

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::id::{Facing, Location, SideId, UnitId};

/// One weapon a unit can attack with.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Attack {
    /// Weapon name, e.g. `"sword"`.
    pub name: String,
    /// Damage per successful strike.
    pub damage: u32,
    /// Number of strikes per round of combat.
    pub strikes: u32,
    /// Ranged weapons are answered only by ranged weapons.
    pub ranged: bool,
}

impl Attack {
    /// A melee weapon.
    pub fn melee(name: &str, damage: u32, strikes: u32) -> Self {
        Self {
            name: name.to_string(),
            damage,
            strikes,
            ranged: false,
        }
    }

    /// A ranged weapon.
    pub fn ranged(name: &str, damage: u32, strikes: u32) -> Self {
        Self {
            ranged: true,
            ..Self::melee(name, damage, strikes)
        }
    }
}

/// A randomly assigned unit trait.
///
/// Traits are the canonical "randomly resolved object state": a freshly
/// recruited unit draws them from the synced random provider, which is why
/// recruits are covered by the content checksum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Trait {
    /// +1 movement, -5% hitpoints.
    Quick,
    /// +1 melee damage, +1 hitpoint.
    Strong,
    /// +4 hitpoints.
    Resilient,
    /// Faster advancement; no effect on synced combat state here.
    Intelligent,
}

impl Trait {
    /// Every trait, in draw order.
    pub const ALL: [Trait; 4] = [
        Trait::Quick,
        Trait::Strong,
        Trait::Resilient,
        Trait::Intelligent,
    ];

    /// Stable numeric code, used by checksums.
    pub fn code(self) -> u8 {
        match self {
            Trait::Quick => 0,
            Trait::Strong => 1,
            Trait::Resilient => 2,
            Trait::Intelligent => 3,
        }
    }
}

/// Static description of a recruitable unit type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitType {
    /// Catalog key, e.g. `"Elvish Fighter"`.
    pub id: String,
    /// Recruit cost in gold.
    pub cost: i32,
    /// Base hitpoints.
    pub hitpoints: u32,
    /// Movement points per turn.
    pub movement: u32,
    /// Vision range; defaults to `movement` when `None`.
    pub vision: Option<u32>,
    /// Weapons.
    pub attacks: Vec<Attack>,
    /// Whether new units of this type draw random traits.
    pub random_traits: bool,
}

impl UnitType {
    /// A type with no attacks and no random traits.
    pub fn new(id: &str, cost: i32, hitpoints: u32, movement: u32) -> Self {
        Self {
            id: id.to_string(),
            cost,
            hitpoints,
            movement,
            vision: None,
            attacks: Vec::new(),
            random_traits: false,
        }
    }

    /// Builder: add a weapon.
    pub fn with_attack(mut self, attack: Attack) -> Self {
        self.attacks.push(attack);
        self
    }

    /// Builder: enable random traits.
    pub fn with_random_traits(mut self) -> Self {
        self.random_traits = true;
        self
    }
}

/// The set of unit types known to a scenario, in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnitCatalog {
    types: IndexMap<String, UnitType>,
}

impl UnitCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a unit type.
    pub fn insert(&mut self, unit_type: UnitType) {
        self.types.insert(unit_type.id.clone(), unit_type);
    }

    /// Look up a unit type by id.
    pub fn get(&self, id: &str) -> Option<&UnitType> {
        self.types.get(id)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// All types in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &UnitType> {
        self.types.values()
    }
}

/// A unit on the board or on a side's recall list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unit {
    /// Lifetime identity.
    pub id: UnitId,
    /// Catalog key of the unit's type.
    pub type_id: String,
    /// Owning side.
    pub side: SideId,
    /// Current hex. Meaningless while on a recall list.
    pub location: Location,
    /// Current hitpoints.
    pub hitpoints: u32,
    /// Maximum hitpoints.
    pub max_hitpoints: u32,
    /// Movement points left this turn.
    pub moves: u32,
    /// Movement points at turn start.
    pub max_moves: u32,
    /// Vision range.
    pub vision: u32,
    /// Direction the unit faces.
    pub facing: Facing,
    /// Accumulated experience.
    pub experience: u32,
    /// Traits, in the order they were drawn.
    pub traits: SmallVec<[Trait; 2]>,
    /// Weapons.
    pub attacks: Vec<Attack>,
    /// Leaders can recruit and recall from a keep.
    pub can_recruit: bool,
    /// Per-unit recall cost override.
    pub recall_cost: Option<i32>,
}

impl Unit {
    /// A fresh, trait-less unit of `unit_type` at `location`.
    pub fn from_type(id: UnitId, unit_type: &UnitType, side: SideId, location: Location) -> Self {
        Self {
            id,
            type_id: unit_type.id.clone(),
            side,
            location,
            hitpoints: unit_type.hitpoints,
            max_hitpoints: unit_type.hitpoints,
            moves: unit_type.movement,
            max_moves: unit_type.movement,
            vision: unit_type.vision.unwrap_or(unit_type.movement),
            facing: Facing::default(),
            experience: 0,
            traits: SmallVec::new(),
            attacks: unit_type.attacks.clone(),
            can_recruit: false,
            recall_cost: None,
        }
    }

    /// Builder: mark this unit as a leader.
    pub fn leader(mut self) -> Self {
        self.can_recruit = true;
        self
    }

    /// Add a trait and apply its stat effects.
    pub fn apply_trait(&mut self, t: Trait) {
        match t {
            Trait::Quick => {
                self.max_moves += 1;
                self.max_hitpoints -= self.max_hitpoints / 20;
            }
            Trait::Strong => {
                self.max_hitpoints += 1;
                for a in self.attacks.iter_mut().filter(|a| !a.ranged) {
                    a.damage += 1;
                }
            }
            Trait::Resilient => self.max_hitpoints += 4,
            Trait::Intelligent => {}
        }
        self.hitpoints = self.max_hitpoints;
        self.moves = self.max_moves;
        self.vision = self.vision.max(self.max_moves);
        self.traits.push(t);
    }

    /// Whether the unit has run out of hitpoints.
    pub fn is_dead(&self) -> bool {
        self.hitpoints == 0
    }
}
