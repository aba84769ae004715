//! Error types for the action log and the replay file format.

use std::io;

use thiserror::Error;

/// Errors that can occur while recording or reading a replay file.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// An I/O error occurred during read or write.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The file does not start with the expected `b"WBRP"` magic bytes.
    #[error("invalid magic bytes (expected b\"WBRP\")")]
    InvalidMagic,
    /// The format version is not supported by this build.
    #[error("unsupported format version {found}")]
    UnsupportedVersion {
        /// The version found in the file.
        found: u8,
    },
    /// A record could not be decoded (truncated or corrupt data).
    #[error("malformed record: {detail}")]
    MalformedRecord {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// An attribute value type tag is not recognized.
    #[error("unknown attribute value type tag {tag}")]
    UnknownValueType {
        /// The unrecognized type tag.
        tag: u8,
    },
    /// Child records are nested deeper than the decoder accepts.
    #[error("record nesting exceeds {max} levels")]
    TooDeep {
        /// The maximum depth.
        max: usize,
    },
    /// The replay was recorded for a different scenario configuration.
    #[error("config hash mismatch: recorded={recorded:#018x}, current={current:#018x}")]
    ConfigMismatch {
        /// Hash from the replay file header.
        recorded: u64,
        /// Hash computed from the current configuration.
        current: u64,
    },
}

/// Violations of the action log's cursor and append discipline.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LogError {
    /// Only a peer that has consumed the whole log may append to it.
    #[error("cannot append at position {cursor}: log has {len} records")]
    NotAtEnd {
        /// Current cursor position.
        cursor: usize,
        /// Log length.
        len: usize,
    },
    /// `advance` was called with no record left to read.
    #[error("log exhausted at position {0}")]
    Exhausted(usize),
    /// There is no single most-recent step to undo.
    #[error("nothing to revert")]
    NothingToRevert,
    /// The record has already been sent to other peers.
    #[error("record {index} was already sent (first unsent is {sent})")]
    AlreadySent {
        /// Index of the record that would be removed.
        index: usize,
        /// Index of the first unsent record.
        sent: usize,
    },
    /// Remote records arrived while local records are still unsent.
    #[error("{0} local records not yet sent")]
    UnsentPending(usize),
}
