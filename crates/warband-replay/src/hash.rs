//! Hashing utilities for checkup fingerprints and state comparison.
//!
//! Uses FNV-1a for fast, deterministic hashing of game state. These hashes
//! are not cryptographically secure; they are equality checks between
//! peers that are assumed honest.

use warband_core::{GameState, Side, Unit};

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

#[inline]
fn fnv1a_byte(hash: u64, byte: u8) -> u64 {
    (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
}

#[inline]
fn fnv1a_bytes(mut hash: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        hash = fnv1a_byte(hash, b);
    }
    hash
}

#[inline]
fn fnv1a_u32(hash: u64, v: u32) -> u64 {
    fnv1a_bytes(hash, &v.to_le_bytes())
}

#[inline]
fn fnv1a_i32(hash: u64, v: i32) -> u64 {
    fnv1a_bytes(hash, &v.to_le_bytes())
}

#[inline]
fn fnv1a_u64(hash: u64, v: u64) -> u64 {
    fnv1a_bytes(hash, &v.to_le_bytes())
}

/// Strings are length-prefixed so `("ab", "c")` and `("a", "bc")` differ.
#[inline]
fn fnv1a_str(hash: u64, s: &str) -> u64 {
    fnv1a_bytes(fnv1a_u32(hash, s.len() as u32), s.as_bytes())
}

fn fold_unit(mut hash: u64, unit: &Unit) -> u64 {
    hash = fnv1a_u64(hash, unit.id.0);
    hash = fnv1a_str(hash, &unit.type_id);
    hash = fnv1a_u32(hash, unit.side.0);
    hash = fnv1a_i32(hash, unit.location.x);
    hash = fnv1a_i32(hash, unit.location.y);
    hash = fnv1a_u32(hash, unit.hitpoints);
    hash = fnv1a_u32(hash, unit.max_hitpoints);
    hash = fnv1a_u32(hash, unit.moves);
    hash = fnv1a_u32(hash, unit.max_moves);
    hash = fnv1a_u32(hash, unit.vision);
    hash = fnv1a_byte(hash, unit.facing.code());
    hash = fnv1a_u32(hash, unit.experience);
    hash = fnv1a_u32(hash, unit.traits.len() as u32);
    for t in &unit.traits {
        hash = fnv1a_byte(hash, t.code());
    }
    hash = fnv1a_u32(hash, unit.attacks.len() as u32);
    for a in &unit.attacks {
        hash = fnv1a_str(hash, &a.name);
        hash = fnv1a_u32(hash, a.damage);
        hash = fnv1a_u32(hash, a.strikes);
        hash = fnv1a_byte(hash, u8::from(a.ranged));
    }
    hash = fnv1a_byte(hash, u8::from(unit.can_recruit));
    fnv1a_i32(hash, unit.recall_cost.unwrap_or(-1))
}

fn fold_side(mut hash: u64, side: &Side) -> u64 {
    hash = fnv1a_u32(hash, side.id.0);
    hash = fnv1a_i32(hash, side.gold);
    hash = fnv1a_u32(hash, side.recruits.len() as u32);
    for r in &side.recruits {
        hash = fnv1a_str(hash, r);
    }
    hash = fnv1a_u32(hash, side.recall_list.len() as u32);
    for u in &side.recall_list {
        hash = fold_unit(hash, u);
    }
    hash = fnv1a_byte(hash, u8::from(side.fog));
    hash = fnv1a_byte(hash, u8::from(side.shroud));
    hash = fnv1a_byte(hash, u8::from(side.auto_shroud));
    hash = fnv1a_u32(hash, side.cleared.len() as u32);
    for loc in &side.cleared {
        hash = fnv1a_i32(hash, loc.x);
        hash = fnv1a_i32(hash, loc.y);
    }
    hash = fnv1a_u32(hash, side.action_bonus_count);
    hash = fnv1a_u32(hash, side.stats.recruits);
    hash = fnv1a_u32(hash, side.stats.recalls);
    hash = fnv1a_i32(hash, side.stats.recruit_spend);
    fnv1a_i32(hash, side.stats.recall_spend)
}

/// Byte-level checksum of one unit.
///
/// Used as the content checksum in checkups for commands that create a
/// unit with randomly resolved state.
pub fn unit_checksum(unit: &Unit) -> u64 {
    fold_unit(FNV_OFFSET, unit)
}

/// Checksum of the whole synchronized state.
///
/// Two peers that replayed the same log from the same start must agree on
/// this value. Map terrain and the unit catalog are static and not folded.
pub fn state_checksum(state: &GameState) -> u64 {
    let mut hash = FNV_OFFSET;
    hash = fnv1a_u32(hash, state.turn);
    hash = fnv1a_u32(hash, state.current_side().0);
    hash = fnv1a_u64(hash, state.next_unit_id());
    hash = fnv1a_u64(hash, state.rng_seed);
    hash = fnv1a_u64(hash, state.rng_epoch);
    for side in state.sides() {
        hash = fold_side(hash, side);
    }
    // Units iterate in id order.
    for unit in state.units() {
        hash = fold_unit(hash, unit);
    }
    for (loc, owner) in state.villages() {
        hash = fnv1a_i32(hash, loc.x);
        hash = fnv1a_i32(hash, loc.y);
        hash = fnv1a_u32(hash, owner.0);
    }
    for (k, v) in &state.variables {
        hash = fnv1a_str(hash, k);
        hash = fnv1a_str(hash, v);
    }
    hash
}

/// Hash of a scenario's starting configuration, for the replay header.
pub fn config_hash(state: &GameState) -> u64 {
    let mut hash = state_checksum(state);
    hash = fnv1a_u32(hash, state.map.cols());
    hash = fnv1a_u32(hash, state.map.rows());
    for t in state.catalog.iter() {
        hash = fnv1a_str(hash, &t.id);
        hash = fnv1a_i32(hash, t.cost);
    }
    hash
}
