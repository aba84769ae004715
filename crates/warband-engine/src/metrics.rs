//! Cumulative counters for a synced-action session.
//!
//! [`SessionMetrics`] is updated in place by the session as commands run,
//! replay, draw randomness and resolve choices. Consumers read it through
//! [`SyncSession::metrics`](crate::SyncSession::metrics).

/// Counters collected over the lifetime of a session.
///
/// Every field is cumulative. Nothing resets them except constructing a
/// new session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionMetrics {
    /// Commands this peer originated and executed successfully.
    pub commands_executed: u64,
    /// Commands rejected by their handler and rolled back out of the log.
    pub commands_rejected: u64,
    /// Commands executed from the log on behalf of another peer.
    pub commands_replayed: u64,
    /// Synced random values drawn.
    pub random_draws: u64,
    /// Seeds generated locally and recorded as `random_seed`.
    pub seeds_generated: u64,
    /// Seeds read back from the log.
    pub seeds_from_log: u64,
    /// Seeds requested from a remote authority.
    pub seeds_requested: u64,
    /// Checkups compared without divergence.
    pub checkups_passed: u64,
    /// Out-of-sync conditions detected.
    pub oos_detected: u64,
    /// Out-of-sync conditions logged and continued past.
    pub oos_ignored: u64,
    /// Choice answers computed for a local side.
    pub choices_local: u64,
    /// Choice answers received from a remote peer while waiting.
    pub choices_remote: u64,
    /// Choice answers extracted from the log.
    pub choices_from_log: u64,
    /// Choice answers drawn for sides controlled by nobody.
    pub choices_random: u64,
    /// Undo operations applied.
    pub undos: u64,
    /// Redo operations applied.
    pub redos: u64,
}
