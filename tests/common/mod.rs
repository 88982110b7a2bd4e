use rand::{Rng, SeedableRng, rngs::StdRng};
use std::collections::HashSet;

/// Distinct pseudo-random keys, reproducible for a given seed.
#[allow(dead_code)]
pub fn random_keys(count: usize, seed: u64) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut seen = HashSet::with_capacity(count);
    let mut keys = Vec::with_capacity(count);
    while keys.len() < count {
        let key: u64 = rng.random();
        if seen.insert(key) {
            keys.push(key);
        }
    }
    keys
}
