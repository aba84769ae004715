//! Replay recording writer.
//!
//! [`ReplayWriter`] streams records to any `Write` sink, encoding the
//! binary replay format. The header is written immediately on construction.

use std::io::Write;

use crate::codec::{encode_header, encode_record};
use crate::error::ReplayError;
use crate::action_log::ActionLog;
use crate::record::ActionRecord;
use crate::types::{BuildMetadata, ScenarioDescriptor};

/// Writes replay data to a byte stream.
///
/// Generic over `W: Write` so tests can use `Vec<u8>` and production
/// code can use `BufWriter<File>`.
///
/// # Examples
///
/// ```
/// use warband_replay::{
///     ActionRecord, BuildMetadata, ReplayReader, ReplayWriter, RngPolicy, ScenarioDescriptor,
/// };
///
/// let meta = BuildMetadata {
///     toolchain: "test".into(),
///     target_triple: "test".into(),
///     warband_version: "0.1.0".into(),
///     compile_flags: "test".into(),
/// };
/// let scenario = ScenarioDescriptor {
///     seed: 42,
///     rng_policy: RngPolicy::SyncedNetwork,
///     scenario_id: "skirmish".into(),
///     config_hash: 0,
/// };
///
/// let mut buf = Vec::new();
/// let mut writer = ReplayWriter::new(&mut buf, &meta, &scenario).unwrap();
/// writer.write_record(&ActionRecord::new("end_turn")).unwrap();
/// assert_eq!(writer.records_written(), 1);
/// drop(writer);
///
/// let mut reader = ReplayReader::open(buf.as_slice()).unwrap();
/// assert_eq!(reader.scenario().seed, 42);
/// assert_eq!(reader.next_record().unwrap().unwrap().tag, "end_turn");
/// assert!(reader.next_record().unwrap().is_none());
/// ```
pub struct ReplayWriter<W: Write> {
    writer: W,
    records_written: u64,
}

impl<W: Write> ReplayWriter<W> {
    /// Create a new replay writer, immediately writing the header.
    pub fn new(
        mut writer: W,
        metadata: &BuildMetadata,
        scenario: &ScenarioDescriptor,
    ) -> Result<Self, ReplayError> {
        encode_header(&mut writer, metadata, scenario)?;
        Ok(Self {
            writer,
            records_written: 0,
        })
    }

    /// Append one record.
    pub fn write_record(&mut self, record: &ActionRecord) -> Result<(), ReplayError> {
        encode_record(&mut self.writer, record)?;
        self.records_written += 1;
        Ok(())
    }

    /// Append every record of `log`, read or not.
    pub fn write_log(&mut self, log: &ActionLog) -> Result<(), ReplayError> {
        for rec in log.records() {
            self.write_record(rec)?;
        }
        Ok(())
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> Result<(), ReplayError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Number of records written so far.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Consume the writer and return the underlying `Write` sink.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
