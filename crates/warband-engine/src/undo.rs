//! The per-side-turn undo/redo stack.
//!
//! A command the local player originates can be taken back for as long as
//! nobody else can have seen it: its records are still unsent and it drew
//! no synced randomness. Such commands push an [`UndoEntry`] holding the
//! inverse of what they did and the record that produced them.
//!
//! Undo applies the inverse, removes the command from the log and puts
//! the entry on the redo stack. Redo runs the stored record again.
//!
//! Shroud bookkeeping entries (auto-shroud toggles and shroud updates)
//! cannot be undone themselves. Undoing while one is on top undoes the
//! entry below it instead and puts the bookkeeping entry back.

use std::fmt;

use warband_core::{CommandError, Facing, GameState, Location, Path, SideId, Unit, UnitId};
use warband_replay::ActionRecord;

use crate::context::SyncedState;
use crate::error::SyncError;
use crate::registry::RunOptions;
use crate::session::{ActionResult, SyncSession};

/// A village taken over by an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VillageCapture {
    /// Where the village is.
    pub location: Location,
    /// Who owned it before.
    pub previous_owner: Option<SideId>,
    /// The capture granted the side a time bonus.
    pub time_bonus: bool,
}

/// The inverse of one undoable action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UndoAction {
    /// A unit walked `path`.
    Move {
        /// The unit that moved.
        unit: UnitId,
        /// Hexes actually entered, starting hex first.
        path: Path,
        /// Movement points before the move.
        starting_moves: u32,
        /// Facing before the move.
        starting_facing: Facing,
        /// Village captured at the end of the move.
        village: Option<VillageCapture>,
        /// Hexes the move cleared of fog or shroud.
        revealed: Vec<Location>,
    },
    /// A unit was bought.
    Recruit {
        /// The unit as it was placed.
        unit: Unit,
        /// Where it was placed.
        placed_at: Location,
        /// Where the recruiting leader stood.
        leader_at: Location,
        /// Gold paid.
        cost: i32,
        /// Village captured by the placement.
        village: Option<VillageCapture>,
        /// Hexes the new unit cleared.
        revealed: Vec<Location>,
    },
    /// A unit came back from the recall list.
    Recall {
        /// The roster entry as it was before the recall.
        unit: Unit,
        /// Its index in the recall list.
        roster_index: usize,
        /// Where it was placed.
        placed_at: Location,
        /// Where the recalling leader stood.
        leader_at: Location,
        /// Gold paid.
        cost: i32,
        /// Village captured by the placement.
        village: Option<VillageCapture>,
        /// Hexes the unit cleared.
        revealed: Vec<Location>,
    },
    /// A unit was dismissed from the recall list.
    Dismiss {
        /// The dismissed unit.
        unit: Unit,
        /// Its index in the recall list.
        roster_index: usize,
    },
    /// Automatic shroud updates were switched to `enabled`.
    AutoShroudToggle {
        /// The new setting.
        enabled: bool,
    },
    /// Deferred shroud clearing was applied.
    ShroudUpdate,
}

impl UndoAction {
    /// Short name for logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            UndoAction::Move { .. } => "move",
            UndoAction::Recruit { .. } => "recruit",
            UndoAction::Recall { .. } => "recall",
            UndoAction::Dismiss { .. } => "dismiss",
            UndoAction::AutoShroudToggle { .. } => "auto shroud",
            UndoAction::ShroudUpdate => "shroud update",
        }
    }

    /// Toggles and updates: never undone on their own.
    pub fn is_shroud_bookkeeping(&self) -> bool {
        matches!(
            self,
            UndoAction::AutoShroudToggle { .. } | UndoAction::ShroudUpdate
        )
    }
}

/// One entry of the undo or redo stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UndoEntry {
    /// How to take the action back.
    pub action: UndoAction,
    /// The command that performed it, run again by redo.
    pub command: ActionRecord,
    /// Unit ids the action allocated.
    pub unit_id_diff: u64,
    /// The action's vision changes were deferred to a shroud update.
    pub vision_pending: bool,
}

/// What an undo took back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UndoReport {
    /// Bookkeeping entries skipped over to reach it.
    pub depth: usize,
    /// Label of the undone action.
    pub action: &'static str,
}

/// Undo and redo entries for the current side turn.
pub struct UndoStack {
    undos: Vec<UndoEntry>,
    redos: Vec<UndoEntry>,
    side: SideId,
    committed_actions: u64,
    pub(crate) preserve_redo: bool,
}

impl UndoStack {
    /// An empty stack for `side`.
    pub fn new(side: SideId) -> Self {
        Self {
            undos: Vec::new(),
            redos: Vec::new(),
            side,
            committed_actions: 0,
            preserve_redo: false,
        }
    }

    /// The side whose actions are on the stack.
    pub fn side(&self) -> SideId {
        self.side
    }

    /// Start a new side turn. Anything left over is dropped with a
    /// warning: it should have been committed when the last turn ended.
    pub fn new_side_turn(&mut self, side: SideId) {
        if !self.undos.is_empty() || !self.redos.is_empty() {
            log::warn!(
                "side {side} starts its turn with {} undo and {} redo entries left from side {}",
                self.undos.len(),
                self.redos.len(),
                self.side
            );
        }
        self.undos.clear();
        self.redos.clear();
        self.side = side;
        self.committed_actions = 0;
    }

    /// Push an entry. The redo stack is cleared unless a redo is running.
    pub fn add(&mut self, entry: UndoEntry) {
        if !self.preserve_redo {
            self.redos.clear();
        }
        self.undos.push(entry);
    }

    /// Push a bookkeeping entry, keeping the redo stack.
    pub fn add_bookkeeping(&mut self, entry: UndoEntry) {
        self.undos.push(entry);
    }

    /// Drop every entry, counting the undo entries as committed.
    pub fn clear(&mut self) {
        self.committed_actions += self.undos.len() as u64;
        self.undos.clear();
        self.redos.clear();
    }

    /// Whether anything can be undone.
    pub fn can_undo(&self) -> bool {
        !self.undos.is_empty()
    }

    /// Whether anything can be redone.
    pub fn can_redo(&self) -> bool {
        !self.redos.is_empty()
    }

    /// Undo entries, oldest first.
    pub fn undos(&self) -> &[UndoEntry] {
        &self.undos
    }

    /// Redo entries, oldest first.
    pub fn redos(&self) -> &[UndoEntry] {
        &self.redos
    }

    /// Actions made permanent so far.
    pub fn committed_actions(&self) -> u64 {
        self.committed_actions
    }

    /// Clear every deferred-vision flag. Returns whether any was set.
    pub(crate) fn take_pending_vision(&mut self) -> bool {
        let mut any = false;
        for e in &mut self.undos {
            any |= std::mem::take(&mut e.vision_pending);
        }
        any
    }
}

impl fmt::Debug for UndoStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoStack")
            .field("side", &self.side)
            .field("undos", &self.undos.len())
            .field("redos", &self.redos.len())
            .field("committed_actions", &self.committed_actions)
            .finish()
    }
}

// ── Session operations ─────────────────────────────────────────────

impl SyncSession {
    /// Take back the most recent undoable action.
    ///
    /// Returns `None` if there is nothing to undo. On error the stack is
    /// left as it was.
    pub fn undo(&mut self) -> Result<Option<UndoReport>, SyncError> {
        if self.core.state != SyncedState::Unsynced {
            return Err(SyncError::InSyncedAction);
        }
        self.undo_at_depth(0)
    }

    fn undo_at_depth(&mut self, depth: usize) -> Result<Option<UndoReport>, SyncError> {
        let Some(entry) = self.undo.undos.pop() else {
            return Ok(None);
        };
        if entry.action.is_shroud_bookkeeping() {
            log::debug!("undo skips {} at depth {depth}", entry.action.label());
            let inner = self.undo_at_depth(depth + 1);
            self.undo.undos.push(entry);
            return inner;
        }

        if let Err(e) = self
            .core
            .log
            .revert_last_command(|r| r != &entry.command)
        {
            self.undo.undos.push(entry);
            return Err(e.into());
        }
        let side = self.undo.side;
        if let Err(e) = apply_inverse(&mut self.game, side, &entry.action) {
            // The log no longer has the command; there is no way back.
            log::error!("undo of {} failed: {e}", entry.action.label());
            return Err(e.into());
        }
        let next = self.game.next_unit_id().saturating_sub(entry.unit_id_diff);
        self.game.set_next_unit_id(next);

        let action = entry.action.label();
        log::debug!("undid {action} ({})", entry.command);
        self.undo.redos.push(entry);
        self.core.metrics.undos += 1;
        Ok(Some(UndoReport { depth, action }))
    }

    /// Run the most recently undone action again.
    ///
    /// Returns `None` if there is nothing to redo.
    pub fn redo(&mut self) -> Result<Option<ActionResult>, SyncError> {
        if self.core.state != SyncedState::Unsynced {
            return Err(SyncError::InSyncedAction);
        }
        let Some(entry) = self.undo.redos.pop() else {
            return Ok(None);
        };
        self.undo.preserve_redo = true;
        let result = self.run_and_store(entry.command.clone(), RunOptions::default());
        self.undo.preserve_redo = false;
        match result {
            Ok(r) if r.success => {
                self.core.metrics.redos += 1;
                Ok(Some(r))
            }
            Ok(r) => {
                log::warn!("redo of {} was refused", entry.command);
                self.undo.redos.push(entry);
                Ok(Some(r))
            }
            Err(e) => {
                self.undo.redos.push(entry);
                Err(e)
            }
        }
    }

    /// Make every action on the stack permanent.
    ///
    /// Deferred vision is applied first, through an `update_shroud`
    /// command. Then both stacks are cleared and all records are sent.
    pub fn commit_undo(&mut self) -> Result<(), SyncError> {
        self.commit_undo_with(false)
    }
}

/// Reverse the game-state effects of `action`.
fn apply_inverse(game: &mut GameState, side: SideId, action: &UndoAction) -> Result<(), CommandError> {
    match action {
        UndoAction::Move {
            unit,
            path,
            starting_moves,
            starting_facing,
            village,
            revealed,
        } => {
            let start = *path.first().ok_or_else(|| CommandError::InvalidPath("empty".into()))?;
            game.relocate(*unit, start)?;
            let u = game.unit_mut(*unit).ok_or(CommandError::UnitNotFound(*unit))?;
            u.moves = *starting_moves;
            u.facing = *starting_facing;
            restore_village(game, side, village.as_ref());
            unreveal(game, side, revealed);
        }
        UndoAction::Recruit {
            unit,
            cost,
            village,
            revealed,
            ..
        } => {
            game.remove_unit(unit.id).ok_or(CommandError::UnitNotFound(unit.id))?;
            let s = game.require_side_mut(unit.side)?;
            s.gold += cost;
            s.stats.unrecord_recruit(*cost);
            restore_village(game, side, village.as_ref());
            unreveal(game, side, revealed);
        }
        UndoAction::Recall {
            unit,
            roster_index,
            cost,
            village,
            revealed,
            ..
        } => {
            game.remove_unit(unit.id).ok_or(CommandError::UnitNotFound(unit.id))?;
            let s = game.require_side_mut(unit.side)?;
            let at = (*roster_index).min(s.recall_list.len());
            s.recall_list.insert(at, unit.clone());
            s.gold += cost;
            s.stats.unrecord_recall(*cost);
            restore_village(game, side, village.as_ref());
            unreveal(game, side, revealed);
        }
        UndoAction::Dismiss { unit, roster_index } => {
            let s = game.require_side_mut(unit.side)?;
            let at = (*roster_index).min(s.recall_list.len());
            s.recall_list.insert(at, unit.clone());
        }
        UndoAction::AutoShroudToggle { .. } | UndoAction::ShroudUpdate => {}
    }
    Ok(())
}

fn restore_village(game: &mut GameState, side: SideId, capture: Option<&VillageCapture>) {
    let Some(c) = capture else { return };
    game.set_village_owner(c.location, c.previous_owner);
    if c.time_bonus {
        if let Some(s) = game.side_mut(side) {
            s.action_bonus_count = s.action_bonus_count.saturating_sub(1);
        }
    }
}

fn unreveal(game: &mut GameState, side: SideId, revealed: &[Location]) {
    if let Some(s) = game.side_mut(side) {
        for &loc in revealed {
            s.unclear_hex(loc);
        }
    }
}
