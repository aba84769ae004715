//! `[disband side= unit=]`: drop a unit from the recall list for good.

use warband_core::CommandError;
use warband_replay::ActionRecord;

use crate::error::ActionError;
use crate::registry::{CommandOutcome, RunOptions, UndoEffect};
use crate::session::SyncSession;
use crate::undo::UndoAction;

pub(crate) fn disband(
    session: &mut SyncSession,
    record: &ActionRecord,
    _opts: RunOptions,
) -> Result<CommandOutcome, ActionError> {
    let side_id = record.require_side("side")?;
    let unit_id = record.require_unit("unit")?;
    let side = session.game.require_side_mut(side_id)?;
    let roster_index = side
        .recall_index(unit_id)
        .ok_or(CommandError::RosterEntryMissing {
            side: side_id,
            unit: unit_id,
        })?;
    let unit = side.recall_list.remove(roster_index);
    log::debug!("side {side_id} disbanded unit {unit_id}");
    Ok(CommandOutcome::new(UndoEffect::Add(UndoAction::Dismiss {
        unit,
        roster_index,
    })))
}
