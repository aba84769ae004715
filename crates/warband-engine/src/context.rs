//! The synced-context state machine and its scope guards.
//!
//! A session is always in one of three [`SyncedState`]s. Game logic that
//! must replicate runs inside a [`SyncedScope`]; local decisions taken in
//! the middle of a synced action run inside a [`LocalChoiceScope`]. Both
//! guards swap the active random provider on entry and put the previous
//! one back when dropped, on every exit path.
//!
//! # Ownership model
//!
//! [`SyncCore`] owns everything the replication machinery touches: the
//! state, the action log, the active provider and the network link. It is
//! a separate value from the game state so that code holding `&mut` to the
//! game can still draw random values and resolve choices through the core.

use std::mem;
use std::ops::{Deref, DerefMut};
use std::time::Instant;

use warband_replay::{tags, ActionLog, ActionRecord, RngPolicy};

use crate::config::{OosPolicy, SessionConfig};
use crate::error::{OosError, OosKind, SyncError};
use crate::metrics::SessionMetrics;
use crate::net::{NetMessage, NetworkLink};
use crate::rng::{
    fresh_seed, DeterministicRandom, ProviderKind, RandomProvider, RandomSource, SyncedRandom,
    UnsyncedRandom,
};
use crate::session::SyncSession;

/// Where the session is relative to replicated execution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncedState {
    /// Outside any synced action. Nothing replicates.
    #[default]
    Unsynced,
    /// Inside a synced action. Random values and choices replicate.
    Synced,
    /// Inside a local decision nested in a synced action.
    LocalChoice,
}

// ── SyncCore ───────────────────────────────────────────────────────

/// Replication state shared by every synced action of a session.
pub struct SyncCore {
    pub(crate) config: SessionConfig,
    pub(crate) state: SyncedState,
    pub(crate) log: ActionLog,
    pub(crate) rng: Box<dyn RandomProvider>,
    pub(crate) link: Option<NetworkLink>,
    pub(crate) simultaneous: bool,
    pub(crate) metrics: SessionMetrics,
    next_request_id: u64,
}

impl SyncCore {
    pub(crate) fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SyncedState::Unsynced,
            log: ActionLog::new(),
            rng: Box::new(UnsyncedRandom::new()),
            link: None,
            simultaneous: false,
            metrics: SessionMetrics::default(),
            next_request_id: 1,
        }
    }

    /// Current state.
    pub fn state(&self) -> SyncedState {
        self.state
    }

    /// The action log.
    pub fn log(&self) -> &ActionLog {
        &self.log
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Cumulative counters.
    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    /// Values drawn from the active provider.
    pub fn call_count(&self) -> u64 {
        self.rng.call_count()
    }

    /// Which provider is active.
    pub fn provider_kind(&self) -> ProviderKind {
        self.rng.kind()
    }

    /// Whether the current action has already sent data to other peers.
    pub fn is_simultaneous(&self) -> bool {
        self.simultaneous
    }

    /// Whether the current action could still be undone without other
    /// peers noticing: no randomness drawn and nothing sent.
    ///
    /// Only meaningful inside a synced action.
    pub fn can_undo(&self) -> bool {
        self.rng.call_count() == 0 && !self.simultaneous
    }

    /// Send every unsent record. Without a link the records are only
    /// marked sent. Returns how many there were.
    pub(crate) fn flush(&mut self) -> Result<usize, SyncError> {
        let unsent = self.log.take_unsent();
        let n = unsent.len();
        if n > 0 {
            if let Some(link) = &self.link {
                log::trace!("sending {n} records");
                link.send(NetMessage::Records(unsent))?;
            }
        }
        Ok(n)
    }

    /// Flush ahead of waiting on a peer. The current action can no longer
    /// be undone afterwards.
    pub(crate) fn flush_for_wait(&mut self) -> Result<(), SyncError> {
        self.simultaneous = true;
        self.flush().map(|_| ())
    }

    /// Block until another peer delivers at least one record, then add it
    /// to the log. Returns the number of records added.
    pub(crate) fn wait_for_remote(&mut self, what: &str) -> Result<usize, SyncError> {
        let link = self.link.clone().ok_or_else(|| {
            SyncError::Protocol(format!("no network link to wait for [{what}]"))
        })?;
        let started = Instant::now();
        loop {
            if let Some(limit) = self.config.choice_timeout {
                let waited = started.elapsed();
                if waited >= limit {
                    return Err(SyncError::Timeout {
                        name: what.to_string(),
                        waited,
                    });
                }
            }
            match link.recv_timeout(self.config.choice_poll_interval)? {
                Some(NetMessage::Records(records)) => {
                    let n = self.log.push_remote(records)?;
                    if n > 0 {
                        log::trace!("received {n} records while waiting for [{what}]");
                        return Ok(n);
                    }
                }
                Some(NetMessage::RequestChoice { name, .. }) => {
                    log::warn!("ignoring request for [{name}]: this peer is not an authority");
                }
                None => log::trace!("still waiting for [{what}]"),
            }
        }
    }

    /// Surface a divergence according to the configured policy.
    pub(crate) fn report_oos(&mut self, err: OosError) -> Result<(), SyncError> {
        self.metrics.oos_detected += 1;
        match self.config.oos_policy {
            OosPolicy::Abort => {
                log::error!("{err}");
                Err(err.into())
            }
            OosPolicy::ContinueAnyway => {
                log::error!("{err}; continuing anyway");
                self.metrics.oos_ignored += 1;
                Ok(())
            }
        }
    }

    /// Fatal in a networked session, a warning otherwise.
    pub(crate) fn protocol_error(&self, detail: String) -> Result<(), SyncError> {
        if self.config.networked {
            Err(SyncError::Protocol(detail))
        } else {
            log::warn!("{detail}");
            Ok(())
        }
    }

    /// Seed for the first draw of a `SyncedNetwork` action.
    fn obtain_seed(&mut self) -> Result<u64, SyncError> {
        if !self.log.at_end() {
            let position = self.log.position();
            let rec = self.log.advance()?.clone();
            if rec.dependent && rec.tag == tags::RANDOM_SEED {
                if let Some(seed) = rec.get_u64("seed") {
                    self.metrics.seeds_from_log += 1;
                    return Ok(seed);
                }
            }
            self.log.revert_action()?;
            self.report_oos(OosError {
                kind: OosKind::RandomSeed,
                expected: format!("[{}]", tags::RANDOM_SEED),
                actual: rec.to_string(),
                position,
            })?;
            return Ok(fresh_seed());
        }

        let Some(link) = self.link.clone() else {
            let seed = fresh_seed();
            self.log
                .append(ActionRecord::dependent(tags::RANDOM_SEED).with("seed", seed))?;
            self.metrics.seeds_generated += 1;
            log::debug!("generated seed {seed:#x}");
            return Ok(seed);
        };

        self.flush_for_wait()?;
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        link.send(NetMessage::RequestChoice {
            request_id,
            name: tags::RANDOM_SEED.to_string(),
            params: ActionRecord::new(tags::RANDOM_SEED),
        })?;
        self.metrics.seeds_requested += 1;
        loop {
            match self.log.next() {
                None => {
                    self.wait_for_remote(tags::RANDOM_SEED)?;
                }
                Some(rec) if rec.dependent && rec.tag == tags::RANDOM_SEED => {
                    let seed = rec.get_u64("seed").ok_or_else(|| {
                        SyncError::Protocol(format!("seed answer without a seed: {rec}"))
                    })?;
                    self.log.advance()?;
                    return Ok(seed);
                }
                Some(rec) => {
                    return Err(SyncError::Protocol(format!(
                        "expected a [{}] answer, found {rec}",
                        tags::RANDOM_SEED
                    )));
                }
            }
        }
    }
}

impl RandomSource for SyncCore {
    fn next_random(&mut self) -> Result<u64, SyncError> {
        if self.rng.needs_seed() {
            let seed = self.obtain_seed()?;
            self.rng.provide_seed(seed);
        }
        if self.state == SyncedState::Synced {
            self.metrics.random_draws += 1;
        }
        Ok(self.rng.next_u64())
    }
}

// ── SyncedScope ────────────────────────────────────────────────────

/// Guard for one synced action.
///
/// On entry the session switches to [`SyncedState::Synced`] with a fresh
/// provider for the configured policy and the simultaneous flag cleared.
/// Dropping the guard restores the previous provider and returns to
/// [`SyncedState::Unsynced`].
pub struct SyncedScope<'a> {
    session: &'a mut SyncSession,
    previous: Option<Box<dyn RandomProvider>>,
}

impl<'a> SyncedScope<'a> {
    /// Enter a synced action.
    ///
    /// # Panics
    ///
    /// Panics if the session is not [`SyncedState::Unsynced`]. Nested
    /// actions go through
    /// [`run_if_not_already`](SyncSession::run_if_not_already) instead.
    pub fn enter(session: &'a mut SyncSession) -> Self {
        let state = session.core.state;
        assert!(
            state == SyncedState::Unsynced,
            "synced scope entered while {state:?}"
        );
        let provider: Box<dyn RandomProvider> = match session.core.config.rng_policy {
            RngPolicy::SyncedNetwork => Box::new(SyncedRandom::new()),
            RngPolicy::Deterministic => Box::new(DeterministicRandom::new(
                session.game.rng_seed,
                session.game.rng_epoch,
            )),
        };
        let previous = mem::replace(&mut session.core.rng, provider);
        session.core.state = SyncedState::Synced;
        session.core.simultaneous = false;
        Self {
            session,
            previous: Some(previous),
        }
    }
}

impl Deref for SyncedScope<'_> {
    type Target = SyncSession;

    fn deref(&self) -> &SyncSession {
        self.session
    }
}

impl DerefMut for SyncedScope<'_> {
    fn deref_mut(&mut self) -> &mut SyncSession {
        self.session
    }
}

impl Drop for SyncedScope<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.session.core.rng = previous;
        }
        self.session.core.state = SyncedState::Unsynced;
    }
}

// ── LocalChoiceScope ───────────────────────────────────────────────

/// Guard for a local decision.
///
/// Random values drawn inside come from local entropy and are not
/// counted against the enclosing synced action.
pub struct LocalChoiceScope<'a> {
    core: &'a mut SyncCore,
    previous_rng: Option<Box<dyn RandomProvider>>,
    previous_state: SyncedState,
}

impl<'a> LocalChoiceScope<'a> {
    /// Enter a local decision.
    pub fn enter(core: &'a mut SyncCore) -> Self {
        let previous_rng = mem::replace(&mut core.rng, Box::new(UnsyncedRandom::new()));
        let previous_state = mem::replace(&mut core.state, SyncedState::LocalChoice);
        Self {
            core,
            previous_rng: Some(previous_rng),
            previous_state,
        }
    }
}

impl Deref for LocalChoiceScope<'_> {
    type Target = SyncCore;

    fn deref(&self) -> &SyncCore {
        self.core
    }
}

impl DerefMut for LocalChoiceScope<'_> {
    fn deref_mut(&mut self) -> &mut SyncCore {
        self.core
    }
}

impl Drop for LocalChoiceScope<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous_rng.take() {
            self.core.rng = previous;
        }
        self.core.state = self.previous_state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core() -> SyncCore {
        SyncCore::new(SessionConfig::default())
    }

    #[test]
    fn solo_seed_is_generated_and_recorded() {
        let mut c = core();
        c.state = SyncedState::Synced;
        c.rng = Box::new(SyncedRandom::new());
        let a = c.next_random().unwrap();
        let _ = c.next_random().unwrap();

        assert_eq!(c.log.len(), 1);
        let rec = &c.log.records()[0];
        assert_eq!(rec.tag, tags::RANDOM_SEED);
        assert!(rec.dependent);
        assert_eq!(c.metrics.seeds_generated, 1);
        assert_eq!(c.metrics.random_draws, 2);
        assert_eq!(c.call_count(), 2);

        let mut replay = SyncedRandom::new();
        replay.provide_seed(rec.get_u64("seed").unwrap());
        assert_eq!(replay.next_u64(), a);
    }

    #[test]
    fn recorded_seed_is_reused() {
        let mut c = core();
        c.log = ActionLog::from_records(vec![
            ActionRecord::dependent(tags::RANDOM_SEED).with("seed", 1234u64)
        ]);
        c.state = SyncedState::Synced;
        c.rng = Box::new(SyncedRandom::new());
        let v = c.next_random().unwrap();

        let mut expected = SyncedRandom::new();
        expected.provide_seed(1234);
        assert_eq!(v, expected.next_u64());
        assert!(c.log.at_end());
        assert_eq!(c.metrics.seeds_from_log, 1);
    }

    #[test]
    fn wrong_record_instead_of_seed_is_oos() {
        let mut c = core();
        c.log = ActionLog::from_records(vec![ActionRecord::new(tags::MOVE)]);
        c.state = SyncedState::Synced;
        c.rng = Box::new(SyncedRandom::new());
        match c.next_random() {
            Err(SyncError::Oos(e)) => {
                assert_eq!(e.kind, OosKind::RandomSeed);
                assert_eq!(e.position, 0);
            }
            other => panic!("expected OOS, got {other:?}"),
        }
        // The offending record was put back.
        assert_eq!(c.log.position(), 0);
    }

    #[test]
    fn continue_anyway_falls_back_locally() {
        let mut c = SyncCore::new(SessionConfig {
            oos_policy: OosPolicy::ContinueAnyway,
            ..SessionConfig::default()
        });
        c.log = ActionLog::from_records(vec![ActionRecord::new(tags::MOVE)]);
        c.state = SyncedState::Synced;
        c.rng = Box::new(SyncedRandom::new());
        assert!(c.next_random().is_ok());
        assert_eq!(c.metrics.oos_ignored, 1);
    }

    #[test]
    fn local_choice_scope_restores_state_and_provider() {
        let mut c = core();
        c.state = SyncedState::Synced;
        c.rng = Box::new(SyncedRandom::new());
        {
            let mut scope = LocalChoiceScope::enter(&mut c);
            assert_eq!(scope.state(), SyncedState::LocalChoice);
            assert_eq!(scope.provider_kind(), ProviderKind::Unsynced);
            scope.next_random().unwrap();
        }
        assert_eq!(c.state, SyncedState::Synced);
        assert_eq!(c.provider_kind(), ProviderKind::SyncedNetwork);
        assert_eq!(c.call_count(), 0);
        assert!(c.log.is_empty());
    }

    #[test]
    fn protocol_errors_are_fatal_only_when_networked() {
        let local = core();
        assert!(local.protocol_error("odd".into()).is_ok());
        let net = SyncCore::new(SessionConfig {
            networked: true,
            ..SessionConfig::default()
        });
        assert!(matches!(
            net.protocol_error("odd".into()),
            Err(SyncError::Protocol(_))
        ));
    }

    #[test]
    fn can_undo_tracks_draws_and_simultaneous() {
        let mut c = core();
        c.state = SyncedState::Synced;
        c.rng = Box::new(DeterministicRandom::new(1, 0));
        assert!(c.can_undo());
        c.next_random().unwrap();
        assert!(!c.can_undo());

        c.rng = Box::new(DeterministicRandom::new(1, 0));
        c.simultaneous = true;
        assert!(!c.can_undo());
    }
}
