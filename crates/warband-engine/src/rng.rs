//! Random providers for synced and unsynced code.
//!
//! Exactly one [`RandomProvider`] is active in a session at any time. A
//! synced scope swaps in a fresh provider for its policy and restores the
//! previous one when it ends, so each synced action starts counting from
//! zero and [`call_count`](RandomProvider::call_count) measures what that
//! action consumed.
//!
//! Synced values are ChaCha8 streams. Under `SyncedNetwork` the stream
//! seed is obtained lazily on the first draw (from the log, a remote
//! authority, or local entropy) by the session; under `Deterministic` it is
//! derived from the scenario seed and an epoch counter in the game state.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::SyncError;

/// Which provider is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    /// Local entropy, outside any synced action.
    Unsynced,
    /// Seeded from the game state.
    Deterministic,
    /// Seeded on first draw from the log or an authority.
    SyncedNetwork,
}

/// A source of random values with a call counter.
pub trait RandomProvider: Send {
    /// Which provider this is.
    fn kind(&self) -> ProviderKind;

    /// Whether a seed must be supplied before the next draw.
    fn needs_seed(&self) -> bool {
        false
    }

    /// Supply the seed requested by [`needs_seed`](Self::needs_seed).
    fn provide_seed(&mut self, _seed: u64) {}

    /// Draw the next value. Only called once [`needs_seed`](Self::needs_seed)
    /// is false.
    fn next_u64(&mut self) -> u64;

    /// Values drawn since this provider was created.
    fn call_count(&self) -> u64;
}

// ── UnsyncedRandom ─────────────────────────────────────────────────

/// Entropy-seeded values for code that is not replicated.
pub struct UnsyncedRandom {
    rng: StdRng,
    calls: u64,
}

impl UnsyncedRandom {
    /// A provider seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            calls: 0,
        }
    }
}

impl Default for UnsyncedRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomProvider for UnsyncedRandom {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Unsynced
    }

    fn next_u64(&mut self) -> u64 {
        self.calls += 1;
        self.rng.next_u64()
    }

    fn call_count(&self) -> u64 {
        self.calls
    }
}

// ── DeterministicRandom ────────────────────────────────────────────

/// A ChaCha8 stream seeded up front from the game state.
pub struct DeterministicRandom {
    rng: ChaCha8Rng,
    calls: u64,
}

impl DeterministicRandom {
    /// Stream for the action at `epoch` of a scenario seeded with `seed`.
    pub fn new(seed: u64, epoch: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(action_seed(seed, epoch)),
            calls: 0,
        }
    }
}

impl RandomProvider for DeterministicRandom {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Deterministic
    }

    fn next_u64(&mut self) -> u64 {
        self.calls += 1;
        self.rng.next_u64()
    }

    fn call_count(&self) -> u64 {
        self.calls
    }
}

// ── SyncedRandom ───────────────────────────────────────────────────

/// A ChaCha8 stream whose seed is supplied on first use.
#[derive(Default)]
pub struct SyncedRandom {
    rng: Option<ChaCha8Rng>,
    calls: u64,
}

impl SyncedRandom {
    /// An unseeded provider.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RandomProvider for SyncedRandom {
    fn kind(&self) -> ProviderKind {
        ProviderKind::SyncedNetwork
    }

    fn needs_seed(&self) -> bool {
        self.rng.is_none()
    }

    fn provide_seed(&mut self, seed: u64) {
        self.rng = Some(ChaCha8Rng::seed_from_u64(seed));
    }

    fn next_u64(&mut self) -> u64 {
        self.calls += 1;
        // Callers seed first; an unseeded draw falls back to seed 0 rather
        // than panicking.
        self.rng
            .get_or_insert_with(|| ChaCha8Rng::seed_from_u64(0))
            .next_u64()
    }

    fn call_count(&self) -> u64 {
        self.calls
    }
}

// ── Seeds ──────────────────────────────────────────────────────────

/// SplitMix64 finalizer.
fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Seed of the deterministic stream for one action.
///
/// Distinct epochs of one scenario seed give unrelated streams.
pub fn action_seed(scenario_seed: u64, epoch: u64) -> u64 {
    splitmix64(scenario_seed ^ splitmix64(epoch))
}

/// A fresh seed from OS entropy, for recording as `random_seed`.
pub fn fresh_seed() -> u64 {
    rand::random()
}

// ── RandomSource ───────────────────────────────────────────────────

/// Something that hands out synced random values.
///
/// Implemented by the session core; collaborators such as combat take it
/// as `&mut dyn RandomSource` so they never see the log or the network.
pub trait RandomSource {
    /// Draw one value.
    fn next_random(&mut self) -> Result<u64, SyncError>;

    /// A value in `0..bound`. `bound` must be non-zero.
    fn random_below(&mut self, bound: u32) -> Result<u32, SyncError> {
        let v = self.next_random()?;
        Ok((v % u64::from(bound.max(1))) as u32)
    }
}
