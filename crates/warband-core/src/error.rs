//! Domain error types reported by command handlers and the map.
//!
//! Command errors are local to a single command: they are returned to the
//! caller as a failure and never desynchronize peers, because the
//! preconditions they check are themselves synchronized state.

use thiserror::Error;

use crate::id::{Location, SideId, UnitId};

/// How bad a [`CommandError`] is for the command that raised it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// A referenced entity (unit type, roster entry, hex, attribute) is
    /// missing or invalid. The command cannot continue.
    Heavy,
    /// An ordinary rule check failed (not enough gold, not recruitable here).
    Validation,
}

/// Why a command handler refused to apply a command.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The unit type is not in the catalog.
    #[error("unknown unit type '{0}'")]
    UnknownUnitType(String),
    /// The side does not exist.
    #[error("side {0} does not exist")]
    UnknownSide(SideId),
    /// No unit stands at the given hex.
    #[error("no unit at {0}")]
    UnitMissing(Location),
    /// The unit id is not on the board.
    #[error("unit {0} not found")]
    UnitNotFound(UnitId),
    /// The unit is not on the side's recall list.
    #[error("unit {unit} is not on the recall list of side {side}")]
    RosterEntryMissing {
        /// The side whose roster was searched.
        side: SideId,
        /// The unit that was looked for.
        unit: UnitId,
    },
    /// The hex is outside the map.
    #[error("{0} is not on the map")]
    OffMap(Location),
    /// A weapon index does not name one of the unit's attacks.
    #[error("weapon index {index} out of range ({count} available)")]
    InvalidWeapon {
        /// The requested index.
        index: i64,
        /// The number of attacks the unit has.
        count: usize,
    },
    /// A required attribute is absent from the command record.
    #[error("missing attribute '{key}' in [{tag}]")]
    MissingAttribute {
        /// The record tag.
        tag: String,
        /// The missing key.
        key: String,
    },
    /// An attribute is present but cannot be interpreted.
    #[error("invalid value '{value}' for attribute '{key}'")]
    InvalidAttribute {
        /// The offending key.
        key: String,
        /// The raw value.
        value: String,
    },
    /// The path is empty, leaves the map, or is not contiguous.
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// The unit type is not on the side's recruit list.
    #[error("side {side} cannot recruit '{unit_type}'")]
    NotRecruitable {
        /// The recruiting side.
        side: SideId,
        /// The requested unit type.
        unit_type: String,
    },
    /// The side cannot afford the action.
    #[error("side {side} has {available} gold, needs {needed}")]
    InsufficientGold {
        /// The paying side.
        side: SideId,
        /// Gold required.
        needed: i32,
        /// Gold held.
        available: i32,
    },
    /// No leader on a keep with a free connected castle hex.
    #[error("no free castle hex for side {0}")]
    NoPlacement(SideId),
    /// The hex is already occupied.
    #[error("{0} is occupied")]
    Occupied(Location),
    /// The unit belongs to another side.
    #[error("unit {unit} belongs to side {owner}, not side {side}")]
    WrongSide {
        /// The unit in question.
        unit: UnitId,
        /// Its owner.
        owner: SideId,
        /// The side that tried to act with it.
        side: SideId,
    },
}

impl CommandError {
    /// Classify this error.
    pub fn severity(&self) -> Severity {
        match self {
            Self::UnknownUnitType(_)
            | Self::UnknownSide(_)
            | Self::UnitMissing(_)
            | Self::UnitNotFound(_)
            | Self::RosterEntryMissing { .. }
            | Self::OffMap(_)
            | Self::InvalidWeapon { .. }
            | Self::MissingAttribute { .. }
            | Self::InvalidAttribute { .. }
            | Self::InvalidPath(_) => Severity::Heavy,
            Self::NotRecruitable { .. }
            | Self::InsufficientGold { .. }
            | Self::NoPlacement(_)
            | Self::Occupied(_)
            | Self::WrongSide { .. } => Severity::Validation,
        }
    }
}

/// Errors from constructing or editing a [`HexMap`](crate::HexMap).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MapError {
    /// A dimension is zero.
    #[error("map has zero hexes")]
    Empty,
    /// A dimension does not fit the coordinate type.
    #[error("map dimension {name}={value} exceeds maximum {max}")]
    TooLarge {
        /// Which dimension (`"cols"` or `"rows"`).
        name: &'static str,
        /// The requested size.
        value: u32,
        /// The maximum allowed.
        max: u32,
    },
    /// The hex is outside the map.
    #[error("{0} is not on the map")]
    OffMap(Location),
}
