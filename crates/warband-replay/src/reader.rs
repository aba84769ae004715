//! Replay playback reader.
//!
//! [`ReplayReader`] reads records from any `Read` source, decoding the
//! binary replay format. The header is validated on construction.

use std::io::Read;

use crate::codec::{decode_header, decode_record};
use crate::error::ReplayError;
use crate::action_log::ActionLog;
use crate::record::ActionRecord;
use crate::types::{BuildMetadata, ScenarioDescriptor};

/// Reads replay data from a byte stream.
pub struct ReplayReader<R: Read> {
    reader: R,
    metadata: BuildMetadata,
    scenario: ScenarioDescriptor,
    records_read: u64,
}

impl<R: Read> ReplayReader<R> {
    /// Open a replay stream, reading and validating the header.
    pub fn open(mut reader: R) -> Result<Self, ReplayError> {
        let (metadata, scenario) = decode_header(&mut reader)?;
        Ok(Self {
            reader,
            metadata,
            scenario,
            records_read: 0,
        })
    }

    /// Build metadata from the replay header.
    pub fn metadata(&self) -> &BuildMetadata {
        &self.metadata
    }

    /// Scenario descriptor from the replay header.
    pub fn scenario(&self) -> &ScenarioDescriptor {
        &self.scenario
    }

    /// Read the next record, or `None` if the stream is exhausted.
    pub fn next_record(&mut self) -> Result<Option<ActionRecord>, ReplayError> {
        let rec = decode_record(&mut self.reader)?;
        if rec.is_some() {
            self.records_read += 1;
        }
        Ok(rec)
    }

    /// Number of records read so far.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Convert into a record iterator.
    pub fn records(self) -> RecordIter<R> {
        RecordIter {
            reader: self.reader,
            done: false,
        }
    }

    /// Read every remaining record into a log positioned at its start.
    pub fn into_log(self) -> Result<ActionLog, ReplayError> {
        let records = self.records().collect::<Result<Vec<_>, _>>()?;
        Ok(ActionLog::from_records(records))
    }
}

/// Iterator adapter over replay records.
pub struct RecordIter<R: Read> {
    reader: R,
    done: bool,
}

impl<R: Read> Iterator for RecordIter<R> {
    type Item = Result<ActionRecord, ReplayError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match decode_record(&mut self.reader) {
            Ok(Some(rec)) => Some(Ok(rec)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tags;
    use crate::types::RngPolicy;
    use crate::writer::ReplayWriter;

    fn test_metadata() -> BuildMetadata {
        BuildMetadata {
            toolchain: "test".into(),
            target_triple: "test".into(),
            warband_version: "0.1.0".into(),
            compile_flags: "test".into(),
        }
    }

    fn test_scenario() -> ScenarioDescriptor {
        ScenarioDescriptor {
            seed: 42,
            rng_policy: RngPolicy::SyncedNetwork,
            scenario_id: "test".into(),
            config_hash: 123,
        }
    }

    fn write(records: &[ActionRecord]) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut writer = ReplayWriter::new(&mut buf, &test_metadata(), &test_scenario()).unwrap();
        for r in records {
            writer.write_record(r).unwrap();
        }
        drop(writer);
        buf
    }

    #[test]
    fn roundtrip_write_read_records() {
        let recs = vec![
            ActionRecord::new(tags::INIT_SIDE).with("side", 1),
            ActionRecord::new(tags::RECRUIT).with("type", "Spearman"),
            ActionRecord::dependent(tags::CHECKUP).with("random_calls", 0),
        ];
        let buf = write(&recs);

        let mut reader = ReplayReader::open(buf.as_slice()).unwrap();
        assert_eq!(reader.metadata(), &test_metadata());
        assert_eq!(reader.scenario(), &test_scenario());
        for expected in &recs {
            assert_eq!(&reader.next_record().unwrap().unwrap(), expected);
        }
        assert!(reader.next_record().unwrap().is_none());
        assert_eq!(reader.records_read(), 3);
    }

    #[test]
    fn into_log_starts_at_the_beginning() {
        let buf = write(&[ActionRecord::new("a"), ActionRecord::new("b")]);
        let log = ReplayReader::open(buf.as_slice())
            .unwrap()
            .into_log()
            .unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log.position(), 0);
        assert_eq!(log.unsent_len(), 0);
    }

    #[test]
    fn truncated_stream_errors() {
        let mut buf = write(&[ActionRecord::new(tags::MOVE).with("x", "1,2")]);
        buf.truncate(buf.len() - 3);
        let mut reader = ReplayReader::open(buf.as_slice()).unwrap();
        assert!(reader.next_record().is_err());
    }

    #[test]
    fn bad_magic_on_open() {
        let data = b"XBRP\x01rest of data";
        let result = ReplayReader::open(data.as_slice());
        assert!(matches!(result, Err(ReplayError::InvalidMagic)));
    }

    #[test]
    fn wrong_version_on_open() {
        let mut buf = write(&[]);
        buf[4] = 99;
        let result = ReplayReader::open(buf.as_slice());
        assert!(matches!(
            result,
            Err(ReplayError::UnsupportedVersion { found: 99 })
        ));
    }
}
