//! Header types for replay files.

/// Build environment metadata stored in the replay header.
///
/// # Examples
///
/// ```
/// use warband_replay::BuildMetadata;
///
/// let meta = BuildMetadata {
///     toolchain: "1.87.0".into(),
///     target_triple: "x86_64-unknown-linux-gnu".into(),
///     warband_version: "0.1.0".into(),
///     compile_flags: "release".into(),
/// };
///
/// assert_eq!(meta.warband_version, "0.1.0");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildMetadata {
    /// Rust toolchain version (e.g. `"1.87.0"`).
    pub toolchain: String,
    /// Compilation target triple.
    pub target_triple: String,
    /// Warband crate version.
    pub warband_version: String,
    /// Compilation flags or profile (e.g. `"release"`, `"debug"`).
    pub compile_flags: String,
}

/// How random values are produced inside synced actions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RngPolicy {
    /// The first draw of an action asks an authority for a seed, which is
    /// recorded in the log as a `random_seed` record.
    #[default]
    SyncedNetwork,
    /// Seeds are derived from the scenario seed; no round-trip.
    Deterministic,
}

impl RngPolicy {
    /// Stable wire code.
    pub fn code(self) -> u8 {
        match self {
            RngPolicy::SyncedNetwork => 0,
            RngPolicy::Deterministic => 1,
        }
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(RngPolicy::SyncedNetwork),
            1 => Some(RngPolicy::Deterministic),
            _ => None,
        }
    }
}

/// Scenario parameters stored in the replay header.
///
/// Captures what a fresh peer needs to rebuild the same starting state
/// before replaying the records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScenarioDescriptor {
    /// Scenario seed (the deterministic policy derives its streams from it).
    pub seed: u64,
    /// Random policy the session ran under.
    pub rng_policy: RngPolicy,
    /// Scenario identifier.
    pub scenario_id: String,
    /// Checksum of the starting state.
    pub config_hash: u64,
}
