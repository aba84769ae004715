//! Action records, the shared action log, and replay persistence.
//!
//! Every synced action a peer executes is an [`ActionRecord`] in its
//! [`ActionLog`]. The log is both the input of replay (records before the
//! end were produced elsewhere and are trusted) and the output of local
//! play (records appended at the end are this peer's decisions).
//!
//! # Architecture
//!
//! - [`ActionLog`] holds records plus the replay cursor
//! - [`Fingerprint`] is the checkup payload, compared by [`compare_fingerprint`]
//! - [`ReplayWriter`] / [`ReplayReader`] persist a log to any byte stream
//! - [`state_checksum`] and [`unit_checksum`] hash synchronized state
//!
//! # Format
//!
//! ```text
//! [MAGIC "WBRP"] [VERSION u8] [BuildMetadata] [ScenarioDescriptor]
//! [Record 1] [Record 2] ... [Record N]
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod action_log;
pub mod codec;
pub mod compare;
pub mod error;
pub mod hash;
pub mod reader;
pub mod record;
pub mod types;
pub mod writer;

pub use action_log::ActionLog;
pub use compare::{
    compare_fingerprint, first_divergence, CompareOptions, DivergenceKind, FieldDivergence,
};
pub use error::{LogError, ReplayError};
pub use hash::{config_hash, state_checksum, unit_checksum};
pub use reader::{RecordIter, ReplayReader};
pub use record::{tags, ActionRecord, AttrValue, Fingerprint};
pub use types::{BuildMetadata, RngPolicy, ScenarioDescriptor};
pub use writer::ReplayWriter;

/// Magic bytes at the start of every replay file.
pub const MAGIC: [u8; 4] = *b"WBRP";

/// Current binary format version.
pub const FORMAT_VERSION: u8 = 1;
