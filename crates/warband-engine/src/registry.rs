//! The command registry: tag → handler.
//!
//! Built once when the session is constructed and shared read-only after
//! that. Handlers receive the whole session so that consequential actions
//! (events fired by a move, say) can call back into
//! [`run_if_not_already`](crate::SyncSession::run_if_not_already).

use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;
use warband_core::ControlFlow;
use warband_replay::ActionRecord;

use crate::commands;
use crate::error::{ActionError, SyncError};
use crate::session::SyncSession;
use crate::undo::UndoAction;

/// Per-invocation flags passed to every handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunOptions {
    /// Whether the action may go on the undo stack. Off for AI turns and
    /// for nested actions.
    pub allow_undo: bool,
    /// Whether collaborators should animate the action.
    pub show: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            allow_undo: true,
            show: false,
        }
    }
}

impl RunOptions {
    /// Options for an action that must never be undone.
    pub fn no_undo() -> Self {
        Self {
            allow_undo: false,
            show: false,
        }
    }
}

/// What a successful command means for the undo stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UndoEffect {
    /// Leave the stack alone.
    Keep,
    /// Push this entry, if undo is still safe.
    Add(UndoAction),
    /// The action cannot be taken back; commit everything before it.
    Commit,
}

/// Result of a successful handler call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Early exit requested by the action.
    pub flow: ControlFlow,
    /// Checksum of randomly resolved objects, recorded in the checkup.
    pub checksum: Option<u64>,
    /// Effect on the undo stack.
    pub undo: UndoEffect,
    /// Vision changes were deferred to a later `update_shroud`.
    pub vision_pending: bool,
}

impl CommandOutcome {
    /// A plain outcome with the given undo effect.
    pub fn new(undo: UndoEffect) -> Self {
        Self {
            flow: ControlFlow::Continue,
            checksum: None,
            undo,
            vision_pending: false,
        }
    }

    /// Builder: set the flow.
    pub fn with_flow(mut self, flow: ControlFlow) -> Self {
        self.flow = flow;
        self
    }

    /// Builder: set the checksum.
    pub fn with_checksum(mut self, checksum: u64) -> Self {
        self.checksum = Some(checksum);
        self
    }

    /// Builder: mark vision as deferred.
    pub fn with_vision_pending(mut self, pending: bool) -> Self {
        self.vision_pending = pending;
        self
    }
}

/// Executes one command tag.
pub trait CommandHandler: Send + Sync {
    /// Validate and apply `record`.
    ///
    /// Validation failures are returned as
    /// [`ActionError::Rejected`] before anything is changed.
    fn execute(
        &self,
        session: &mut SyncSession,
        record: &ActionRecord,
        opts: RunOptions,
    ) -> Result<CommandOutcome, ActionError>;
}

impl<F> CommandHandler for F
where
    F: Fn(&mut SyncSession, &ActionRecord, RunOptions) -> Result<CommandOutcome, ActionError>
        + Send
        + Sync,
{
    fn execute(
        &self,
        session: &mut SyncSession,
        record: &ActionRecord,
        opts: RunOptions,
    ) -> Result<CommandOutcome, ActionError> {
        self(session, record, opts)
    }
}

/// Errors from [`CommandRegistry::register`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A handler is already registered for this tag.
    #[error("command [{0}] is already registered")]
    Duplicate(String),
}

/// Handlers keyed by command tag, in registration order.
#[derive(Default)]
pub struct CommandRegistry {
    handlers: IndexMap<String, Box<dyn CommandHandler>>,
}

impl CommandRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in command.
    pub fn with_builtins() -> Self {
        Self {
            handlers: commands::builtins()
                .into_iter()
                .map(|(tag, handler)| (tag.to_string(), handler))
                .collect(),
        }
    }

    /// Add a handler for `tag`.
    pub fn register(
        &mut self,
        tag: &str,
        handler: impl CommandHandler + 'static,
    ) -> Result<(), RegistryError> {
        if self.handlers.contains_key(tag) {
            return Err(RegistryError::Duplicate(tag.to_string()));
        }
        self.handlers.insert(tag.to_string(), Box::new(handler));
        Ok(())
    }

    /// The handler for `tag`.
    pub fn get(&self, tag: &str) -> Option<&dyn CommandHandler> {
        self.handlers.get(tag).map(|h| h.as_ref())
    }

    /// Whether `tag` has a handler.
    pub fn contains(&self, tag: &str) -> bool {
        self.handlers.contains_key(tag)
    }

    /// Number of handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered tags in registration order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Run the handler for `record.tag`.
    pub fn dispatch(
        &self,
        session: &mut SyncSession,
        record: &ActionRecord,
        opts: RunOptions,
    ) -> Result<CommandOutcome, ActionError> {
        let handler = self
            .get(&record.tag)
            .ok_or_else(|| SyncError::UnknownCommand(record.tag.clone()))?;
        log::trace!("dispatching {record}");
        handler.execute(session, record, opts)
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("tags", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
