//! Warband: synchronized-action replication for turn-based multiplayer
//! games.
//!
//! This is the top-level facade crate that re-exports the public API of
//! the Warband sub-crates. For most users, adding `warband` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use warband::prelude::*;
//!
//! let mut map = HexMap::new(4, 4).unwrap();
//! map.set_terrain(Location::new(1, 1), Terrain::Keep).unwrap();
//! map.set_terrain(Location::new(2, 1), Terrain::Castle).unwrap();
//! let mut catalog = UnitCatalog::new();
//! catalog.insert(UnitType::new("Lord", 40, 48, 5));
//! catalog.insert(UnitType::new("Spearman", 14, 36, 5));
//!
//! let mut game = GameState::new(map, catalog, Rules::default(), 7);
//! let side = game.add_side(Controller::Human, 100);
//! game.side_mut(side).unwrap().recruits.push("Spearman".into());
//! let lord = game.catalog.get("Lord").unwrap().clone();
//! let id = game.allocate_unit_id();
//! game.place_unit(Unit::from_type(id, &lord, side, Location::new(1, 1)).leader())
//!     .unwrap();
//!
//! let mut session = SyncSession::new(SessionConfig::default(), game).unwrap();
//! let recruit = ActionRecord::new(tags::RECRUIT)
//!     .with("type", "Spearman")
//!     .with("side", side)
//!     .with_location(Location::new(2, 1));
//! assert!(session.run(recruit).unwrap());
//! assert_eq!(session.game().side(side).unwrap().gold, 86);
//!
//! // Nothing random happened and nothing was sent, so it can be undone.
//! session.undo().unwrap();
//! assert_eq!(session.game().side(side).unwrap().gold, 100);
//! assert!(session.log().is_empty());
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `warband-core` | IDs, hex map, units, sides, game state, domain errors |
//! | [`replay`] | `warband-replay` | Action records, the action log, replay files, checksums |
//! | [`engine`] | `warband-engine` | Synced session, random providers, commands, choices, undo |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core game model (`warband-core`).
///
/// Everything every peer must agree on: [`types::GameState`] and the
/// types it is built from, plus [`types::ControlFlow`] and
/// [`types::CommandError`].
pub use warband_core as types;

/// Action records, logs and replay persistence (`warband-replay`).
///
/// Save a session's log with [`replay::ReplayWriter`] and load it back
/// with [`replay::ReplayReader`].
pub use warband_replay as replay;

/// Synchronized execution (`warband-engine`).
///
/// [`engine::SyncSession`] is the entry point.
pub use warband_engine as engine;

/// Common imports for typical Warband usage.
///
/// ```rust
/// use warband::prelude::*;
/// ```
pub mod prelude {
    // Game model
    pub use warband_core::{
        Attack, Controller, ControlFlow, Facing, GameState, HexMap, Location, Rules,
        ScenarioOutcome, SideId, Terrain, Unit, UnitCatalog, UnitId, UnitType,
    };

    // Errors
    pub use warband_core::{CommandError, Severity};
    pub use warband_engine::{ConfigError, OosError, SyncError};

    // Records and logs
    pub use warband_replay::{tags, ActionLog, ActionRecord, RngPolicy};

    // Session
    pub use warband_engine::{
        ActionResult, Collaborators, CommandRegistry, EventHooks, GameEvent, NetworkLink,
        RunOptions, SessionConfig, SessionMetrics, SyncSession, UserChoice,
    };
}
