//! Session configuration, validation, and error types.
//!
//! [`SessionConfig`] is the constructor input for a
//! [`SyncSession`](crate::SyncSession). [`validate()`](SessionConfig::validate)
//! checks structural invariants before the session is built.

use std::fmt;
use std::time::Duration;

use warband_replay::RngPolicy;

// ── CheckupMode ────────────────────────────────────────────────────

/// Whether commands record and compare fingerprints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CheckupMode {
    /// The originator records a checkup after every command and followers
    /// compare against it.
    #[default]
    Synced,
    /// No checkups are recorded. Followers consume any they find without
    /// comparing.
    Ignored,
}

// ── OosPolicy ──────────────────────────────────────────────────────

/// What to do when a follower detects an out-of-sync condition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OosPolicy {
    /// Surface the divergence as an error and stop.
    #[default]
    Abort,
    /// Log the divergence at error level and keep going.
    ContinueAnyway,
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`SessionConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The choice poll interval is zero.
    #[error("choice_poll_interval must be non-zero")]
    ZeroPollInterval,
    /// The choice timeout is shorter than one poll interval.
    #[error("choice_timeout {timeout:?} is shorter than choice_poll_interval {poll:?}")]
    TimeoutBelowPoll {
        /// Configured timeout.
        timeout: Duration,
        /// Configured poll interval.
        poll: Duration,
    },
    /// A networked session cannot continue past a detected divergence.
    #[error("networked sessions must abort on out-of-sync")]
    NetworkedContinueAnyway,
}

// ── SessionConfig ──────────────────────────────────────────────────

/// Complete configuration for a synced-action session.
#[derive(Clone)]
pub struct SessionConfig {
    /// How synced random values are seeded. Default: `SyncedNetwork`.
    pub rng_policy: RngPolicy,
    /// Whether fingerprints are recorded and compared. Default: `Synced`.
    pub checkup: CheckupMode,
    /// Reaction to a detected divergence. Default: `Abort`.
    pub oos_policy: OosPolicy,
    /// Strict protocol handling. Protocol errors that a local session
    /// downgrades to warnings are fatal when this is set. Default: false.
    pub networked: bool,
    /// How long one wait for a remote answer blocks before re-checking.
    /// Default: 50 ms.
    pub choice_poll_interval: Duration,
    /// Upper bound on waiting for remote answers. `None` waits forever.
    /// Default: `None`.
    pub choice_timeout: Option<Duration>,
    /// Accept checkups without a recorded `next_unit_id`. Default: false.
    pub legacy_checkups_without_unit_id: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rng_policy: RngPolicy::SyncedNetwork,
            checkup: CheckupMode::Synced,
            oos_policy: OosPolicy::Abort,
            networked: false,
            choice_poll_interval: Duration::from_millis(50),
            choice_timeout: None,
            legacy_checkups_without_unit_id: false,
        }
    }
}

impl SessionConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. Polling must make progress.
        if self.choice_poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        // 2. A timeout must allow at least one poll.
        if let Some(timeout) = self.choice_timeout {
            if timeout < self.choice_poll_interval {
                return Err(ConfigError::TimeoutBelowPoll {
                    timeout,
                    poll: self.choice_poll_interval,
                });
            }
        }
        // 3. Divergence is never tolerated across the network.
        if self.networked && self.oos_policy == OosPolicy::ContinueAnyway {
            return Err(ConfigError::NetworkedContinueAnyway);
        }
        Ok(())
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("rng_policy", &self.rng_policy)
            .field("checkup", &self.checkup)
            .field("oos_policy", &self.oos_policy)
            .field("networked", &self.networked)
            .field("choice_poll_interval", &self.choice_poll_interval)
            .field("choice_timeout", &self.choice_timeout)
            .field("legacy_checkups", &self.legacy_checkups_without_unit_id)
            .finish()
    }
}
