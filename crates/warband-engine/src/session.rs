//! The synced-action session.
//!
//! [`SyncSession`] is the one value that owns everything a peer needs to
//! take part in a synchronized game: the game state, the action log, the
//! active random provider, the command registry, the undo stack and the
//! network link. Every game-altering change goes through it.
//!
//! # Execution
//!
//! A command either *originates* here ([`run_and_store`]) or is *replayed*
//! from the log ([`replay_next`]). Both run the handler inside a
//! [`SyncedScope`], then compare or record a checkup fingerprint. A
//! command started while another is already running is *nested*: it runs
//! directly inside the outer scope and records nothing of its own
//! ([`run_if_not_already`]).
//!
//! # Ownership model
//!
//! `SyncSession` is [`Send`], so a peer can run on its own thread. Handlers
//! receive `&mut SyncSession` and may call back into it; the registry is
//! shared behind an [`Arc`] so it stays reachable while a handler holds
//! the session.
//!
//! [`run_and_store`]: SyncSession::run_and_store
//! [`replay_next`]: SyncSession::replay_next
//! [`run_if_not_already`]: SyncSession::run_if_not_already

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use warband_core::{CommandError, ControlFlow, GameState, Severity, SideId};
use warband_replay::{tags, ActionLog, ActionRecord, Fingerprint, RngPolicy};

use crate::checkup;
use crate::choice::{self, UserChoice};
use crate::config::{ConfigError, SessionConfig};
use crate::context::{SyncCore, SyncedScope, SyncedState};
use crate::error::{ActionError, OosError, OosKind, SyncError};
use crate::hooks::{Collaborators, EventContext, GameEvent};
use crate::metrics::SessionMetrics;
use crate::net::{NetMessage, NetworkLink};
use crate::registry::{CommandOutcome, CommandRegistry, RunOptions, UndoEffect};
use crate::rng::{ProviderKind, RandomSource};
use crate::undo::{UndoEntry, UndoStack};

// Compile-time assertion: a session can be moved to another thread.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<SyncSession>();
    }
};

// ── ActionResult ───────────────────────────────────────────────────

/// What happened to one command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionResult {
    /// The handler applied the command.
    pub success: bool,
    /// Early exit requested by the command or anything it triggered.
    pub flow: ControlFlow,
    /// Why the handler refused, if it did.
    pub error: Option<CommandError>,
}

impl ActionResult {
    /// The command was applied.
    pub fn applied(flow: ControlFlow) -> Self {
        Self {
            success: true,
            flow,
            error: None,
        }
    }

    /// The handler refused the command.
    pub fn rejected(error: CommandError) -> Self {
        Self {
            success: false,
            flow: ControlFlow::Continue,
            error: Some(error),
        }
    }

    /// The command could not be started at all.
    pub fn failed() -> Self {
        Self {
            success: false,
            flow: ControlFlow::Continue,
            error: None,
        }
    }
}

/// What firing an event amounted to, follow-up actions included.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FiredEvent {
    /// Early exit requested by the event or its follow-ups.
    pub flow: ControlFlow,
    /// Game state changed.
    pub mutated: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Origin {
    /// Appended at `start` by this peer.
    Local { start: usize },
    /// Read from the log.
    Replay,
}

// ── SyncSession ────────────────────────────────────────────────────

/// One peer's view of a synchronized game.
pub struct SyncSession {
    pub(crate) core: SyncCore,
    pub(crate) game: GameState,
    pub(crate) undo: UndoStack,
    pub(crate) hooks: Collaborators,
    registry: Arc<CommandRegistry>,
    /// Fingerprint of the last replayed command whose checkup has not
    /// arrived yet.
    pending_checkup: Option<Fingerprint>,
}

impl SyncSession {
    /// A session over `game` with the built-in commands and default
    /// collaborators.
    pub fn new(config: SessionConfig, game: GameState) -> Result<Self, ConfigError> {
        config.validate()?;
        let side = game.current_side();
        Ok(Self {
            core: SyncCore::new(config),
            game,
            undo: UndoStack::new(side),
            hooks: Collaborators::default(),
            registry: Arc::new(CommandRegistry::with_builtins()),
            pending_checkup: None,
        })
    }

    /// Builder: replace the command registry.
    pub fn with_registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Builder: replace the collaborators.
    pub fn with_collaborators(mut self, hooks: Collaborators) -> Self {
        self.hooks = hooks;
        self
    }

    /// Builder: start from an existing log, to be replayed.
    pub fn with_log(mut self, log: ActionLog) -> Self {
        self.core.log = log;
        self
    }

    /// Builder: connect to other peers.
    pub fn with_link(mut self, link: NetworkLink) -> Self {
        self.core.link = Some(link);
        self
    }

    // ── Accessors ──────────────────────────────────────────────────

    /// The game state.
    pub fn game(&self) -> &GameState {
        &self.game
    }

    /// The game state, mutably. Changes made here outside a command do
    /// not replicate.
    pub fn game_mut(&mut self) -> &mut GameState {
        &mut self.game
    }

    /// The action log.
    pub fn log(&self) -> &ActionLog {
        &self.core.log
    }

    /// Current synced state.
    pub fn state(&self) -> SyncedState {
        self.core.state
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.core.config
    }

    /// Cumulative counters.
    pub fn metrics(&self) -> &SessionMetrics {
        &self.core.metrics
    }

    /// The undo/redo stack.
    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo
    }

    /// The command registry.
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Values drawn from the active provider.
    pub fn call_count(&self) -> u64 {
        self.core.call_count()
    }

    /// Which provider is active.
    pub fn provider_kind(&self) -> ProviderKind {
        self.core.provider_kind()
    }

    /// Whether the running action could still be undone.
    pub fn can_undo(&self) -> bool {
        self.core.can_undo()
    }

    /// Whether the running action has already sent data to other peers.
    pub fn is_simultaneous(&self) -> bool {
        self.core.is_simultaneous()
    }

    // ── Running commands ───────────────────────────────────────────

    /// Originate `command`: append it to the log and execute it.
    ///
    /// A rejected command is taken back out of the log, together with
    /// anything it appended. Returns [`SyncError::UnknownCommand`] without
    /// touching the log if no handler is registered for the tag.
    ///
    /// # Panics
    ///
    /// Panics if called while a synced action is already running. Use
    /// [`run_if_not_already`](Self::run_if_not_already) from code that may
    /// be nested.
    pub fn run_and_store(
        &mut self,
        command: ActionRecord,
        opts: RunOptions,
    ) -> Result<ActionResult, SyncError> {
        if !self.registry.contains(&command.tag) {
            log::error!("unknown command {command}");
            return Err(SyncError::UnknownCommand(command.tag));
        }
        let start = self.core.log.append(command.clone())?;
        self.execute(command, opts, Origin::Local { start })
    }

    /// Originate `command` with default options. Returns whether it was
    /// applied.
    pub fn run(&mut self, command: ActionRecord) -> Result<bool, SyncError> {
        Ok(self.run_and_store(command, RunOptions::default())?.success)
    }

    /// Run `command` as a new synced action, or as part of the running one.
    ///
    /// - `Unsynced`: originate it, provided this peer is at the end of the
    ///   log. A peer still replaying fails the call instead.
    /// - `Synced`: dispatch directly, without undo and without recording.
    /// - `LocalChoice`: fail the call.
    pub fn run_if_not_already(
        &mut self,
        command: ActionRecord,
        opts: RunOptions,
    ) -> Result<ActionResult, SyncError> {
        match self.core.state {
            SyncedState::Unsynced if self.core.log.at_end() => self.run_and_store(command, opts),
            SyncedState::Unsynced => {
                log::warn!("not originating {command}: log has unread records");
                Ok(ActionResult::failed())
            }
            SyncedState::Synced => self.run_nested(command, opts),
            SyncedState::LocalChoice => {
                log::error!("{command} requested inside a local choice");
                Ok(ActionResult::failed())
            }
        }
    }

    /// Execute the next command in the log on behalf of whoever produced
    /// it. Returns `None` once the log is exhausted.
    ///
    /// Dependent records met between commands are matched against the
    /// previous command's late checkup, or reported as divergence.
    pub fn replay_next(&mut self) -> Result<Option<ActionResult>, SyncError> {
        if self.core.state != SyncedState::Unsynced {
            return Err(SyncError::InSyncedAction);
        }
        loop {
            let Some(rec) = self.core.log.next().cloned() else {
                return Ok(None);
            };
            let position = self.core.log.position();
            self.core.log.advance()?;
            if !rec.dependent {
                self.pending_checkup = None;
                return self.execute(rec, RunOptions::no_undo(), Origin::Replay).map(Some);
            }
            if rec.tag == tags::CHECKUP {
                if let Some(expected) = self.pending_checkup.take() {
                    checkup::compare(&mut self.core, &rec, &expected, position)?;
                    continue;
                }
            }
            self.core.report_oos(OosError {
                kind: OosKind::UnexpectedRecord,
                expected: "a command".to_string(),
                actual: rec.to_string(),
                position,
            })?;
        }
    }

    /// Replay until the log is exhausted or a command ends the turn or
    /// the scenario. Returns the last flow seen.
    pub fn replay_all(&mut self) -> Result<ControlFlow, SyncError> {
        while let Some(result) = self.replay_next()? {
            if !result.flow.is_continue() {
                return Ok(result.flow);
            }
        }
        Ok(ControlFlow::Continue)
    }

    /// Start `side`'s turn: income, movement reset and a fresh undo stack.
    pub fn init_side(&mut self, side: SideId) -> Result<ActionResult, SyncError> {
        self.commit_undo()?;
        self.run_and_store(
            ActionRecord::new(tags::INIT_SIDE).with("side", side),
            RunOptions::no_undo(),
        )
    }

    /// Commit pending actions and end the current side's turn.
    pub fn end_turn(&mut self) -> Result<ActionResult, SyncError> {
        self.commit_undo()?;
        let side = self.game.current_side();
        self.run_and_store(
            ActionRecord::new(tags::END_TURN).with("side", side),
            RunOptions::no_undo(),
        )
    }

    // ── Choices and events ─────────────────────────────────────────

    /// Resolve a synchronized choice for `sides`. See [`choice::resolve`].
    pub fn resolve_choice(
        &mut self,
        name: &str,
        sides: &[SideId],
        choice: &mut dyn UserChoice,
    ) -> Result<BTreeMap<SideId, ActionRecord>, SyncError> {
        choice::resolve(&mut self.core, &self.game, name, sides, choice)
    }

    /// Fire a scripted event and run the follow-up actions it asks for.
    pub fn fire_event(&mut self, event: &GameEvent, show: bool) -> Result<FiredEvent, SyncError> {
        let outcome = {
            let SyncSession {
                core, game, hooks, ..
            } = self;
            let mut ctx = EventContext::new(core, game, show);
            hooks.events.fire(&mut ctx, event)?
        };
        log::trace!("fired {event}: mutated={}", outcome.mutated);
        let mut fired = FiredEvent {
            flow: outcome.flow,
            mutated: outcome.mutated,
        };
        for follow_up in outcome.follow_ups {
            if !fired.flow.is_continue() {
                break;
            }
            let result = self.run_if_not_already(follow_up, RunOptions { allow_undo: false, show })?;
            fired.mutated |= result.success;
            fired.flow = fired.flow.merge(result.flow);
        }
        Ok(fired)
    }

    // ── Network ────────────────────────────────────────────────────

    /// Send every record not yet sent. Returns how many there were.
    pub fn flush(&mut self) -> Result<usize, SyncError> {
        self.core.flush()
    }

    /// Take whatever other peers have sent, without blocking. Returns the
    /// number of records added to the log.
    pub fn receive(&mut self) -> Result<usize, SyncError> {
        let Some(link) = self.core.link.clone() else {
            return Ok(0);
        };
        let mut added = 0;
        while let Some(msg) = link.recv_timeout(Duration::ZERO)? {
            match msg {
                NetMessage::Records(records) => added += self.core.log.push_remote(records)?,
                NetMessage::RequestChoice { name, .. } => {
                    log::warn!("ignoring request for [{name}]: this peer is not an authority");
                }
            }
        }
        Ok(added)
    }

    /// Block until another peer sends at least one record.
    pub fn wait_for_records(&mut self) -> Result<usize, SyncError> {
        self.core.wait_for_remote("next command")
    }

    // ── Internals ──────────────────────────────────────────────────

    fn execute(
        &mut self,
        command: ActionRecord,
        opts: RunOptions,
        origin: Origin,
    ) -> Result<ActionResult, SyncError> {
        let registry = Arc::clone(&self.registry);
        let mut scope = SyncedScope::enter(self);
        let ids_before = scope.game.next_unit_id();

        let outcome = match registry.dispatch(&mut scope, &command, opts) {
            Ok(outcome) => outcome,
            Err(ActionError::Sync(e)) => {
                if let Origin::Local { start } = origin {
                    if let Err(le) = scope.core.log.truncate_to(start) {
                        log::error!("{command} failed after its records went out: {le}");
                    }
                }
                return Err(e);
            }
            Err(ActionError::Rejected(e)) => {
                match e.severity() {
                    Severity::Heavy => log::error!("{command} rejected: {e}"),
                    Severity::Validation => log::warn!("{command} rejected: {e}"),
                }
                scope.core.metrics.commands_rejected += 1;
                match origin {
                    Origin::Local { start } => scope.core.log.truncate_to(start)?,
                    Origin::Replay => {
                        // The originator applied this command, or it would
                        // never have been sent.
                        let position = scope.core.log.position().saturating_sub(1);
                        scope.core.report_oos(OosError {
                            kind: OosKind::UnexpectedRecord,
                            expected: "a command this peer can apply".to_string(),
                            actual: command.to_string(),
                            position,
                        })?;
                        while scope.core.log.next_dependent().is_some() {
                            scope.core.log.advance()?;
                        }
                    }
                }
                return Ok(ActionResult::rejected(e));
            }
        };

        let fingerprint = Fingerprint {
            random_calls: scope.core.call_count(),
            next_unit_id: Some(scope.game.next_unit_id()),
            checksum: outcome.checksum,
        };
        match origin {
            Origin::Local { .. } => {
                checkup::record(&mut scope.core, &fingerprint)?;
                scope.core.metrics.commands_executed += 1;
            }
            Origin::Replay => {
                if !checkup::verify(&mut scope.core, &fingerprint)? {
                    scope.pending_checkup = Some(fingerprint);
                }
                scope.core.metrics.commands_replayed += 1;
            }
        }
        let undo_safe = scope.core.can_undo();
        drop(scope);

        if fingerprint.random_calls > 0 && self.core.config.rng_policy == RngPolicy::Deterministic {
            self.game.rng_epoch += 1;
        }
        let ids_used = self.game.next_unit_id().saturating_sub(ids_before);

        let flow = outcome.flow;
        match origin {
            Origin::Local { .. } => self.after_local(command, outcome, opts, undo_safe, ids_used)?,
            // Answers this peer gave during the replayed command.
            Origin::Replay => {
                self.core.flush()?;
            }
        }
        Ok(ActionResult::applied(flow))
    }

    fn run_nested(
        &mut self,
        command: ActionRecord,
        opts: RunOptions,
    ) -> Result<ActionResult, SyncError> {
        let registry = Arc::clone(&self.registry);
        let opts = RunOptions {
            allow_undo: false,
            ..opts
        };
        log::debug!("nested {command}");
        match registry.dispatch(self, &command, opts) {
            Ok(outcome) => {
                self.core.metrics.commands_executed += 1;
                Ok(ActionResult::applied(outcome.flow))
            }
            Err(ActionError::Rejected(e)) => {
                log::warn!("nested {command} rejected: {e}");
                self.core.metrics.commands_rejected += 1;
                Ok(ActionResult::rejected(e))
            }
            Err(ActionError::Sync(e)) => Err(e),
        }
    }

    /// Update the undo stack for a command this peer just originated.
    fn after_local(
        &mut self,
        command: ActionRecord,
        outcome: CommandOutcome,
        opts: RunOptions,
        undo_safe: bool,
        unit_id_diff: u64,
    ) -> Result<(), SyncError> {
        match outcome.undo {
            UndoEffect::Add(action) if opts.allow_undo && undo_safe => {
                let entry = UndoEntry {
                    action,
                    command,
                    unit_id_diff,
                    vision_pending: outcome.vision_pending,
                };
                if entry.action.is_shroud_bookkeeping() {
                    self.undo.add_bookkeeping(entry);
                } else {
                    self.undo.add(entry);
                }
                Ok(())
            }
            UndoEffect::Keep if undo_safe => Ok(()),
            _ => self.commit_undo_with(outcome.vision_pending),
        }
    }

    /// Commit the undo stack. `extra_vision` is set when the command being
    /// committed deferred vision itself.
    pub(crate) fn commit_undo_with(&mut self, extra_vision: bool) -> Result<(), SyncError> {
        let pending = self.undo.take_pending_vision() || extra_vision;
        if pending {
            let side = self.undo.side();
            self.run_if_not_already(
                ActionRecord::new(tags::UPDATE_SHROUD).with("side", side),
                RunOptions::no_undo(),
            )?;
        }
        self.undo.clear();
        self.core.flush()?;
        Ok(())
    }
}

impl RandomSource for SyncSession {
    fn next_random(&mut self) -> Result<u64, SyncError> {
        self.core.next_random()
    }
}

impl std::fmt::Debug for SyncSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSession")
            .field("state", &self.core.state)
            .field("log_len", &self.core.log.len())
            .field("position", &self.core.log.position())
            .field("undo", &self.undo)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
