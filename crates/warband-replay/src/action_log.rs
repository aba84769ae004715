//! The shared action log and its replay cursor.
//!
//! Every peer holds one [`ActionLog`]. Records before the cursor have been
//! executed; records after it were produced by some other peer (or an
//! earlier session) and must be extracted and trusted rather than
//! recomputed. A peer at the end of the log originates new records.
//!
//! Locally appended records stay *unsent* until the owner flushes them with
//! [`take_unsent`](ActionLog::take_unsent). Only unsent records can be
//! removed again, which is what bounds undo.

use crate::error::LogError;
use crate::record::ActionRecord;

/// Ordered, append-only record sequence with a forward-only cursor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActionLog {
    records: Vec<ActionRecord>,
    cursor: usize,
    last_advance: Option<usize>,
    sent: usize,
}

impl ActionLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// A log to be replayed from the start. All records count as sent.
    pub fn from_records(records: Vec<ActionRecord>) -> Self {
        let sent = records.len();
        Self {
            records,
            cursor: 0,
            last_advance: None,
            sent,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the log holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, read or not.
    pub fn records(&self) -> &[ActionRecord] {
        &self.records
    }

    /// Index of the next record to read.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Whether every record has been read, so this peer must originate.
    pub fn at_end(&self) -> bool {
        self.cursor >= self.records.len()
    }

    /// The next record, without advancing.
    pub fn next(&self) -> Option<&ActionRecord> {
        self.records.get(self.cursor)
    }

    /// The next record if it is dependent on the current command.
    pub fn next_dependent(&self) -> Option<&ActionRecord> {
        self.next().filter(|r| r.dependent)
    }

    /// Consume the next record.
    pub fn advance(&mut self) -> Result<&ActionRecord, LogError> {
        if self.at_end() {
            return Err(LogError::Exhausted(self.cursor));
        }
        self.last_advance = Some(self.cursor);
        self.cursor += 1;
        Ok(&self.records[self.cursor - 1])
    }

    /// Undo the most recent [`advance`](Self::advance). Only one step.
    pub fn revert_action(&mut self) -> Result<(), LogError> {
        let prev = self.last_advance.take().ok_or(LogError::NothingToRevert)?;
        self.cursor = prev;
        Ok(())
    }

    /// Record an action this peer originated. Returns its index.
    pub fn append(&mut self, record: ActionRecord) -> Result<usize, LogError> {
        if !self.at_end() {
            return Err(LogError::NotAtEnd {
                cursor: self.cursor,
                len: self.records.len(),
            });
        }
        self.records.push(record);
        self.cursor = self.records.len();
        self.last_advance = None;
        Ok(self.records.len() - 1)
    }

    /// Add records produced by another peer, to be read later.
    ///
    /// Rejected while local records are unsent: the remote peer has not
    /// seen them, so the total order would fork.
    pub fn push_remote(
        &mut self,
        records: impl IntoIterator<Item = ActionRecord>,
    ) -> Result<usize, LogError> {
        if self.unsent_len() > 0 {
            return Err(LogError::UnsentPending(self.unsent_len()));
        }
        let before = self.records.len();
        self.records.extend(records);
        self.sent = self.records.len();
        Ok(self.records.len() - before)
    }

    /// Remove the last record. Used when a handler failed after its record
    /// was appended. The record must be unsent.
    pub fn revert_last(&mut self) -> Result<ActionRecord, LogError> {
        let index = self
            .records
            .len()
            .checked_sub(1)
            .ok_or(LogError::NothingToRevert)?;
        if index < self.sent {
            return Err(LogError::AlreadySent {
                index,
                sent: self.sent,
            });
        }
        let rec = self.records.pop().ok_or(LogError::NothingToRevert)?;
        self.cursor = self.cursor.min(self.records.len());
        self.last_advance = None;
        Ok(rec)
    }

    /// Drop every record from `len` on. None of them may have been sent.
    pub fn truncate_to(&mut self, len: usize) -> Result<(), LogError> {
        if len >= self.records.len() {
            return Ok(());
        }
        if len < self.sent {
            return Err(LogError::AlreadySent {
                index: len,
                sent: self.sent,
            });
        }
        self.records.truncate(len);
        self.cursor = self.cursor.min(len);
        self.last_advance = None;
        Ok(())
    }

    /// Remove the most recent command (and its dependent records) not
    /// matched by `skip`. Later skipped commands stay in place.
    ///
    /// Used by undo. The cursor must be at the end and the command unsent.
    pub fn revert_last_command(
        &mut self,
        skip: impl Fn(&ActionRecord) -> bool,
    ) -> Result<Vec<ActionRecord>, LogError> {
        if !self.at_end() {
            return Err(LogError::NotAtEnd {
                cursor: self.cursor,
                len: self.records.len(),
            });
        }
        let start = self
            .records
            .iter()
            .rposition(|r| !r.dependent && !skip(r))
            .ok_or(LogError::NothingToRevert)?;
        if start < self.sent {
            return Err(LogError::AlreadySent {
                index: start,
                sent: self.sent,
            });
        }
        let end = self.records[start + 1..]
            .iter()
            .position(|r| !r.dependent)
            .map_or(self.records.len(), |off| start + 1 + off);
        let removed: Vec<_> = self.records.drain(start..end).collect();
        self.cursor = self.records.len();
        self.last_advance = None;
        Ok(removed)
    }

    /// Number of locally appended records not yet sent.
    pub fn unsent_len(&self) -> usize {
        self.records.len() - self.sent
    }

    /// Clone out the unsent records and mark them sent.
    pub fn take_unsent(&mut self) -> Vec<ActionRecord> {
        let out = self.records[self.sent..].to_vec();
        self.sent = self.records.len();
        out
    }
}
