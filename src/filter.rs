use crate::error::{BloomError, Result};
use crate::hash::{Fmix64, HashIndexer, Mixer, SplitMix64};
use bitvec::{bitvec, order::Lsb0, vec::BitVec};

/// A fixed-size Bloom filter over 64-bit keys.
///
/// Provides:
/// - No false negatives (added keys always report `true`)
/// - False positives at a rate governed by `m`, `k` and the number of keys
/// - No deletion; bits are only ever set
///
/// The filter is mutated through `&mut self` and does no internal locking.
#[derive(Clone, Debug)]
pub struct MembershipFilter<A = SplitMix64, B = Fmix64> {
    m: usize,
    k: usize,
    /// Bit array packed into u64 words, `ceil(m / 64)` of them
    bits: BitVec<u64, Lsb0>,
    indexer: HashIndexer<A, B>,
}

impl MembershipFilter<SplitMix64, Fmix64> {
    /// Creates an empty filter of `m` bits probed `k` times per key.
    pub fn new(m: usize, k: usize, seed1: u64, seed2: u64) -> Result<Self> {
        Self::with_mixers(
            m,
            k,
            SplitMix64::from_seed(seed1),
            Fmix64::from_seed(seed2),
        )
    }
}

impl<A: Mixer, B: Mixer> MembershipFilter<A, B> {
    /// Creates an empty filter using caller-supplied mixers.
    pub fn with_mixers(m: usize, k: usize, first: A, second: B) -> Result<Self> {
        if k == 0 {
            return Err(BloomError::InvalidConfig(
                "Number of hashes k must be >= 1".into(),
            ));
        }
        let indexer = HashIndexer::with_mixers(m, first, second)?;

        Ok(Self {
            m,
            k,
            bits: bitvec![u64, Lsb0; 0; m],
            indexer,
        })
    }

    pub fn add(&mut self, key: u64) {
        for idx in self.indexer.probes(key, self.k) {
            self.bits.set(idx, true);
        }
    }

    /// Returns `false` if `key` was definitely never added.
    pub fn possibly_contains(&self, key: u64) -> bool {
        self.indexer.probes(key, self.k).all(|idx| self.bits[idx])
    }

    pub fn size_bits(&self) -> usize {
        self.m
    }

    pub fn num_hashes(&self) -> usize {
        self.k
    }

    /// Raw packed storage.
    pub fn words(&self) -> &[u64] {
        self.bits.as_raw_slice()
    }

    pub fn count_ones(&self) -> usize {
        self.bits.count_ones()
    }

    /// Fraction of bits currently set.
    pub fn fill_ratio(&self) -> f64 {
        self.count_ones() as f64 / self.m as f64
    }
}
