//! Error types for synced execution.
//!
//! [`SyncError`] is what propagates out of the session to the top-level
//! controller: divergence, protocol violations and transport failures.
//! Domain validation failures never become a `SyncError`; handlers report
//! them as [`ActionError::Rejected`] and the session turns them into a
//! failed [`ActionResult`](crate::ActionResult).

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use warband_core::CommandError;
use warband_replay::{DivergenceKind, LogError, ReplayError};

/// What kind of divergence a follower detected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OosKind {
    /// A checkup component differed.
    Checkup(DivergenceKind),
    /// A random draw found some other record where a seed was expected.
    RandomSeed,
    /// A choice answer came from a side that was not asked, or was marked
    /// `side_invalid`.
    ChoiceSide,
    /// A dependent record was left over after the command finished.
    UnexpectedRecord,
}

impl fmt::Display for OosKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OosKind::Checkup(kind) => write!(f, "checkup {kind}"),
            OosKind::RandomSeed => f.write_str("random seed"),
            OosKind::ChoiceSide => f.write_str("choice side"),
            OosKind::UnexpectedRecord => f.write_str("unexpected record"),
        }
    }
}

/// An out-of-sync report. Always carries both sides of the comparison.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("out of sync ({kind}) at log position {position}: expected {expected}, found {actual}")]
pub struct OosError {
    /// What diverged.
    pub kind: OosKind,
    /// What the log says.
    pub expected: String,
    /// What this peer produced.
    pub actual: String,
    /// Log cursor when the divergence was detected.
    pub position: usize,
}

/// Errors that escape a synced action.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A follower diverged from the log.
    #[error(transparent)]
    Oos(#[from] OosError),
    /// A record in the log cannot be executed as written.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// No handler is registered for a command tag.
    #[error("unknown command [{0}]")]
    UnknownCommand(String),
    /// The log rejected a cursor or append operation.
    #[error("action log: {0}")]
    Log(#[from] LogError),
    /// A record could not be decoded.
    #[error("record: {0}")]
    Record(#[from] ReplayError),
    /// Undo could not restore a stored state.
    #[error("undo: {0}")]
    Undo(#[from] CommandError),
    /// A remote answer did not arrive in time.
    #[error("timed out after {waited:?} waiting for [{name}]")]
    Timeout {
        /// What was being waited for.
        name: String,
        /// How long the session waited.
        waited: Duration,
    },
    /// The network link closed while waiting.
    #[error("network link disconnected")]
    Disconnected,
    /// The operation is not allowed inside a local-choice scope.
    #[error("not allowed inside a local choice")]
    InLocalChoice,
    /// The operation needs the session to be outside any synced scope.
    #[error("not allowed inside a synced action")]
    InSyncedAction,
}

/// Errors a command handler can return.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The command's preconditions failed. Nothing was changed, the
    /// command is rolled back out of the log.
    #[error(transparent)]
    Rejected(#[from] CommandError),
    /// A synchronization failure during the command.
    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl From<LogError> for ActionError {
    fn from(e: LogError) -> Self {
        ActionError::Sync(SyncError::Log(e))
    }
}
