#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic generator that derives every cell's natural state.
//!
//! The natural state of a cell is a pure function of its identifier: no seed
//! table, cache, or history is consulted, so the same cell produces the same
//! state in every process.

use gridmerge_core::{CellId, CellState, NATURAL_TOKENS, SPAWN_PROBABILITY};
use sha2::{Digest, Sha256};

/// Salt mixed into the roll deciding whether a cell holds a token.
pub const SALT_HAS_TOKEN: &str = "hasToken";

/// Salt mixed into the roll choosing the token value.
pub const SALT_TOKEN: &str = "token";

/// Scale mapping the top 53 bits of a `u64` onto `[0, 1)`.
const UNIT_SCALE: f64 = 1.0 / (1u64 << 53) as f64;

/// Returns the natural (unmodified) state of the provided cell.
#[must_use]
pub fn natural(cell: CellId) -> CellState {
    if luck(cell, SALT_HAS_TOKEN) >= SPAWN_PROBABILITY {
        return CellState::EMPTY;
    }

    let roll = luck(cell, SALT_TOKEN) * NATURAL_TOKENS.len() as f64;
    let index = (roll.floor() as usize).min(NATURAL_TOKENS.len() - 1);
    CellState::holding(NATURAL_TOKENS[index])
}

/// Hashes a cell and salt into a uniformly distributed value in `[0, 1)`.
#[must_use]
pub fn luck(cell: CellId, salt: &str) -> f64 {
    let key = format!("{},{},{}", cell.i(), cell.j(), salt);
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    let value = u64::from_le_bytes(bytes);
    (value >> 11) as f64 * UNIT_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luck_stays_within_unit_interval() {
        for i in -20..20 {
            for j in -20..20 {
                let value = luck(CellId::new(i, j), SALT_TOKEN);
                assert!((0.0..1.0).contains(&value), "luck {value} out of range");
            }
        }
    }

    #[test]
    fn salts_produce_independent_rolls() {
        let cell = CellId::new(12, -7);
        assert_ne!(luck(cell, SALT_HAS_TOKEN), luck(cell, SALT_TOKEN));
    }
}
