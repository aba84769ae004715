//! Synchronized-action execution for Warband.
//!
//! A [`SyncSession`] lets several peers, and solitary replay playback,
//! execute the same sequence of game-altering commands and end up with
//! identical state. Commands are [`ActionRecord`](warband_replay::ActionRecord)s
//! dispatched through a [`CommandRegistry`]; randomness and user choices
//! made while a command runs are recorded as dependent records so that
//! followers reproduce them instead of computing their own.
//!
//! # Architecture
//!
//! ```text
//! caller ── run_and_store ──► SyncedScope ──► CommandRegistry ──► handler
//!   ▲                            │                                  │
//!   │                            ▼                                  ▼
//!   └── ActionResult ◄── checkup / undo stack ◄── RandomSource, UserChoice
//! ```
//!
//! - [`context`] holds the sync state machine and its scope guards
//! - [`rng`] has the random providers behind one [`RandomSource`] seam
//! - [`choice`] synchronizes answers to user questions across peers
//! - [`undo`] keeps the local undo/redo stack and its inverse operations
//! - [`hooks`] defines the collaborators the built-in commands call out to
//! - [`net`] moves records between peers over channels

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod checkup;
pub mod choice;
pub mod combat;
mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod hooks;
pub mod metrics;
pub mod net;
pub mod placement;
pub mod registry;
pub mod rng;
pub mod session;
pub mod undo;
pub mod vision;

pub use choice::{resolve, resolve_one, UserChoice};
pub use combat::StrikeCombat;
pub use config::{CheckupMode, ConfigError, OosPolicy, SessionConfig};
pub use context::{LocalChoiceScope, SyncCore, SyncedScope, SyncedState};
pub use error::{ActionError, OosError, OosKind, SyncError};
pub use hooks::{
    Collaborators, Combat, CombatResult, Engagement, EventContext, EventHooks, EventOutcome,
    GameEvent, NoEvents, Placement, PlacementPurpose, Reveal, Vision,
};
pub use metrics::SessionMetrics;
pub use net::{NetMessage, NetworkLink, SeedServer};
pub use placement::CastlePlacement;
pub use registry::{
    CommandHandler, CommandOutcome, CommandRegistry, RegistryError, RunOptions, UndoEffect,
};
pub use rng::{
    action_seed, fresh_seed, DeterministicRandom, ProviderKind, RandomProvider, RandomSource,
    SyncedRandom, UnsyncedRandom,
};
pub use session::{ActionResult, FiredEvent, SyncSession};
pub use undo::{UndoAction, UndoEntry, UndoReport, UndoStack, VillageCapture};
pub use vision::RadiusVision;
