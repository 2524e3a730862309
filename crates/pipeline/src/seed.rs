//! Per-symbol random generators.
//!
//! Each symbol's generator is seeded from a BLAKE3 hash of the master seed
//! and the symbol name, so sampled decisions do not depend on the order in
//! which worker threads pick up symbols.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Deterministic sub-seed for `symbol`.
pub fn symbol_seed(master_seed: u64, symbol: &str) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&master_seed.to_le_bytes());
    hasher.update(symbol.as_bytes());
    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

/// Seeded generator for `symbol`.
pub fn symbol_rng(master_seed: u64, symbol: &str) -> StdRng {
    StdRng::seed_from_u64(symbol_seed(master_seed, symbol))
}
