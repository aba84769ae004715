//! Collaborator interfaces consumed by the command handlers.
//!
//! Placement, scripted events, vision and combat are owned by the host
//! game. Each sits behind a trait so a session can run with the defaults
//! in this crate or with whatever the host plugs in.

use std::collections::BTreeMap;
use std::fmt;

use warband_core::{ControlFlow, GameState, Location, SideId, UnitId};
use warband_replay::ActionRecord;

use crate::choice::{self, UserChoice};
use crate::combat::StrikeCombat;
use crate::context::SyncCore;
use crate::error::{ActionError, SyncError};
use crate::placement::CastlePlacement;
use crate::rng::RandomSource;
use crate::vision::RadiusVision;

// ── Placement ──────────────────────────────────────────────────────

/// Why a hex is being looked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlacementPurpose {
    /// A unit bought from the catalog.
    Recruit,
    /// A unit brought back from the roster.
    Recall,
}

/// Chooses where a new unit appears.
pub trait Placement: Send {
    /// Returns the placement hex and the hex of the leader doing the
    /// recruiting, or `None` if the side cannot place anything.
    ///
    /// `hint` is where the player asked for the unit. An implementation
    /// may return a different hex when the hint is no longer usable.
    fn find_placement(
        &self,
        game: &GameState,
        side: SideId,
        hint: Option<Location>,
        purpose: PlacementPurpose,
    ) -> Option<(Location, Location)>;
}

// ── Events ─────────────────────────────────────────────────────────

/// A scripted event trigger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameEvent {
    /// Event name, e.g. `moveto`.
    pub name: String,
    /// First location argument.
    pub primary: Option<Location>,
    /// Second location argument.
    pub secondary: Option<Location>,
}

impl GameEvent {
    /// An event with no locations.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            primary: None,
            secondary: None,
        }
    }

    /// An event at one location.
    pub fn at(name: &str, primary: Location) -> Self {
        Self {
            primary: Some(primary),
            ..Self::new(name)
        }
    }

    /// An event between two locations.
    pub fn between(name: &str, primary: Location, secondary: Location) -> Self {
        Self {
            primary: Some(primary),
            secondary: Some(secondary),
            ..Self::new(name)
        }
    }
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(p) = self.primary {
            write!(f, " at {p}")?;
        }
        if let Some(s) = self.secondary {
            write!(f, " to {s}")?;
        }
        Ok(())
    }
}

/// What firing an event did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventOutcome {
    /// Game state changed. The triggering action can no longer be undone.
    pub mutated: bool,
    /// Actions the event asks for, run as nested synced actions.
    pub follow_ups: Vec<ActionRecord>,
    /// Early exit requested by the event.
    pub flow: ControlFlow,
}

impl EventOutcome {
    /// Nothing happened.
    pub fn cosmetic() -> Self {
        Self::default()
    }

    /// The event changed game state.
    pub fn mutated() -> Self {
        Self {
            mutated: true,
            ..Self::default()
        }
    }
}

/// What an event handler may touch while it runs.
pub struct EventContext<'a> {
    core: &'a mut SyncCore,
    game: &'a mut GameState,
    show: bool,
}

impl<'a> EventContext<'a> {
    pub(crate) fn new(core: &'a mut SyncCore, game: &'a mut GameState, show: bool) -> Self {
        Self { core, game, show }
    }

    /// The game state.
    pub fn game(&self) -> &GameState {
        self.game
    }

    /// The game state, mutably. Report `mutated` if you change it.
    pub fn game_mut(&mut self) -> &mut GameState {
        self.game
    }

    /// Whether effects should be animated.
    pub fn show(&self) -> bool {
        self.show
    }

    /// Ask one or more sides a synchronized question.
    pub fn choose(
        &mut self,
        name: &str,
        sides: &[SideId],
        choice: &mut dyn UserChoice,
    ) -> Result<BTreeMap<SideId, ActionRecord>, SyncError> {
        choice::resolve(self.core, self.game, name, sides, choice)
    }

    /// Ask one side a synchronized question.
    pub fn choose_one(
        &mut self,
        name: &str,
        side: SideId,
        choice: &mut dyn UserChoice,
    ) -> Result<ActionRecord, SyncError> {
        choice::resolve_one(self.core, self.game, name, side, choice)
    }
}

impl RandomSource for EventContext<'_> {
    fn next_random(&mut self) -> Result<u64, SyncError> {
        self.core.next_random()
    }
}

/// Runs scripted events.
pub trait EventHooks: Send {
    /// Fire `event`. Handlers run inside the current synced action.
    fn fire(
        &mut self,
        ctx: &mut EventContext<'_>,
        event: &GameEvent,
    ) -> Result<EventOutcome, SyncError>;
}

/// A scenario without scripted events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoEvents;

impl EventHooks for NoEvents {
    fn fire(
        &mut self,
        _ctx: &mut EventContext<'_>,
        _event: &GameEvent,
    ) -> Result<EventOutcome, SyncError> {
        Ok(EventOutcome::cosmetic())
    }
}

// ── Vision ─────────────────────────────────────────────────────────

/// Hexes a unit would reveal and enemy units it would spot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reveal {
    /// Hexes not yet cleared for the unit's side.
    pub cleared: Vec<Location>,
    /// Enemy units standing on those hexes.
    pub sighted: Vec<UnitId>,
}

/// Computes fog and shroud reveals.
pub trait Vision: Send {
    /// What `unit` would reveal standing at `at`. Pure; the caller
    /// applies the result.
    fn reveal(&self, game: &GameState, unit: UnitId, at: Location) -> Reveal;
}

// ── Combat ─────────────────────────────────────────────────────────

/// Who fights whom with what.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Engagement {
    /// Attacking unit.
    pub attacker: UnitId,
    /// Defending unit.
    pub defender: UnitId,
    /// Index into the attacker's attacks.
    pub weapon: usize,
    /// Index into the defender's attacks, if it retaliates.
    pub defender_weapon: Option<usize>,
}

/// End state of a fight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CombatResult {
    /// Attacker hitpoints afterwards.
    pub attacker_hp: u32,
    /// Defender hitpoints afterwards.
    pub defender_hp: u32,
    /// Strikes that hit, both sides.
    pub hits: u32,
    /// Strikes made, both sides.
    pub strikes: u32,
}

/// Resolves a fight using synced randomness.
pub trait Combat: Send {
    /// Simulate `engagement`. Does not modify the game state.
    fn resolve(
        &self,
        game: &GameState,
        engagement: &Engagement,
        rng: &mut dyn RandomSource,
    ) -> Result<CombatResult, ActionError>;
}

// ── Collaborators ──────────────────────────────────────────────────

/// The full set of collaborators a session calls out to.
pub struct Collaborators {
    /// Placement resolver.
    pub placement: Box<dyn Placement>,
    /// Scripted events.
    pub events: Box<dyn EventHooks>,
    /// Fog and shroud.
    pub vision: Box<dyn Vision>,
    /// Fights.
    pub combat: Box<dyn Combat>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            placement: Box::new(CastlePlacement),
            events: Box::new(NoEvents),
            vision: Box::new(RadiusVision),
            combat: Box::new(StrikeCombat),
        }
    }
}

impl Collaborators {
    /// Builder: replace the event hooks.
    pub fn with_events(mut self, events: impl EventHooks + 'static) -> Self {
        self.events = Box::new(events);
        self
    }

    /// Builder: replace the placement resolver.
    pub fn with_placement(mut self, placement: impl Placement + 'static) -> Self {
        self.placement = Box::new(placement);
        self
    }

    /// Builder: replace vision.
    pub fn with_vision(mut self, vision: impl Vision + 'static) -> Self {
        self.vision = Box::new(vision);
        self
    }

    /// Builder: replace combat.
    pub fn with_combat(mut self, combat: impl Combat + 'static) -> Self {
        self.combat = Box::new(combat);
        self
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
