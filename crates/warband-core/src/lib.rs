//! Core types for the Warband synchronized-action engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! synchronized game model every peer must agree on: identifiers, the hex
//! map, units, sides, the [`GameState`] aggregate, structured
//! [`ControlFlow`] for end-of-turn / end-of-scenario exits, and the domain
//! error types reported by command handlers.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod flow;
pub mod id;
pub mod map;
pub mod side;
pub mod state;
pub mod unit;

pub use error::{CommandError, MapError, Severity};
pub use flow::{ControlFlow, ScenarioOutcome};
pub use id::{Facing, Location, Path, SideId, UnitId};
pub use map::{HexMap, Terrain};
pub use side::{Controller, Side, SideStatistics};
pub use state::{GameState, Rules};
pub use unit::{Attack, Trait, Unit, UnitCatalog, UnitType};
