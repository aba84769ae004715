//! Recording and verifying command fingerprints.
//!
//! The peer that originates a command appends a dependent `checkup`
//! record holding its [`Fingerprint`]. A follower executing the same
//! command reads that record back and compares it with its own.

use warband_replay::{compare_fingerprint, tags, ActionRecord, CompareOptions, Fingerprint};

use crate::config::CheckupMode;
use crate::context::SyncCore;
use crate::error::{OosError, OosKind, SyncError};

/// Append the originator's fingerprint.
pub(crate) fn record(core: &mut SyncCore, actual: &Fingerprint) -> Result<(), SyncError> {
    if core.config.checkup == CheckupMode::Synced {
        core.log.append(actual.to_record())?;
    }
    Ok(())
}

/// Consume the dependent records left after a replayed command and
/// compare its checkup, if one is present yet.
///
/// Returns whether a checkup was found. Any other dependent record still
/// pending at this point was not consumed by the command, which means the
/// two executions diverged.
pub(crate) fn verify(core: &mut SyncCore, actual: &Fingerprint) -> Result<bool, SyncError> {
    while let Some(rec) = core.log.next_dependent().cloned() {
        let position = core.log.position();
        core.log.advance()?;
        if rec.tag == tags::CHECKUP {
            compare(core, &rec, actual, position)?;
            return Ok(true);
        }
        core.report_oos(OosError {
            kind: OosKind::UnexpectedRecord,
            expected: format!("[{}] or the next command", tags::CHECKUP),
            actual: rec.to_string(),
            position,
        })?;
    }
    Ok(false)
}

/// Compare one recorded checkup with a fresh fingerprint.
pub(crate) fn compare(
    core: &mut SyncCore,
    rec: &ActionRecord,
    actual: &Fingerprint,
    position: usize,
) -> Result<(), SyncError> {
    if core.config.checkup == CheckupMode::Ignored {
        return Ok(());
    }
    let expected = Fingerprint::from_record(rec)?;
    let options = CompareOptions {
        legacy_checkups_without_unit_id: core.config.legacy_checkups_without_unit_id,
    };
    let divergences = compare_fingerprint(&expected, actual, options);
    let Some(first) = divergences.first() else {
        core.metrics.checkups_passed += 1;
        return Ok(());
    };
    for extra in &divergences[1..] {
        log::error!("also diverged: {extra}");
    }
    let show = |v: Option<u64>| v.map_or_else(|| "<none>".to_string(), |v| v.to_string());
    core.report_oos(OosError {
        kind: OosKind::Checkup(first.kind),
        expected: show(first.expected),
        actual: show(first.actual),
        position,
    })
}
