//! Probe index generation for the membership filter.
//!
//! Two independently seeded 64-bit mixers feed a double-hashing probe
//! sequence `h1 + i * h2 (mod m)`. The second hash is forced odd so that for
//! a power-of-two `m` the sequence visits every residue before repeating.

use crate::error::{BloomError, Result};

/// Default seed for the first mixer of a [`HashIndexer`].
pub const DEFAULT_SEED1: u64 = 0x1234_5678_90ab_cdef;
/// Default seed for the second mixer of a [`HashIndexer`].
pub const DEFAULT_SEED2: u64 = 0xfedc_ba09_8765_4321;

/// A seeded, full-avalanche 64-bit mixing function.
///
/// Every output bit should depend on every bit of both the key and the seed.
/// Implementations must take the full 64-bit seed; narrowing it correlates
/// the two hash streams of a [`HashIndexer`].
pub trait Mixer {
    fn from_seed(seed: u64) -> Self
    where
        Self: Sized;

    fn mix(&self, key: u64) -> u64;
}

/// SplitMix64 finalizer with the seed folded into the golden-ratio offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplitMix64 {
    seed: u64,
}

impl Mixer for SplitMix64 {
    fn from_seed(seed: u64) -> Self {
        Self { seed }
    }

    #[inline]
    fn mix(&self, key: u64) -> u64 {
        let mut x = key
            .wrapping_add(0x9e37_79b9_7f4a_7c15)
            .wrapping_add(self.seed);
        x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        x ^ (x >> 31)
    }
}

/// MurmurHash3 `fmix64` finalizer keyed by xoring the seed into the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fmix64 {
    seed: u64,
}

impl Mixer for Fmix64 {
    fn from_seed(seed: u64) -> Self {
        Self { seed }
    }

    #[inline]
    fn mix(&self, key: u64) -> u64 {
        let mut x = key ^ self.seed;
        x ^= x >> 33;
        x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
        x ^= x >> 33;
        x = x.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
        x ^ (x >> 33)
    }
}

/// Maps a key and probe number to a bit position in `[0, m)`.
#[derive(Clone, Debug)]
pub struct HashIndexer<A = SplitMix64, B = Fmix64> {
    m: u64,
    // `m - 1` when `m` is a power of two
    mask: Option<u64>,
    first: A,
    second: B,
}

impl HashIndexer<SplitMix64, Fmix64> {
    pub fn new(m: usize, seed1: u64, seed2: u64) -> Result<Self> {
        Self::with_mixers(
            m,
            SplitMix64::from_seed(seed1),
            Fmix64::from_seed(seed2),
        )
    }
}

impl<A: Mixer, B: Mixer> HashIndexer<A, B> {
    pub fn with_mixers(m: usize, first: A, second: B) -> Result<Self> {
        if m == 0 {
            return Err(BloomError::InvalidConfig(
                "Bit array size m must be > 0".into(),
            ));
        }
        let m = m as u64;
        let mask = m.is_power_of_two().then(|| m - 1);
        Ok(Self {
            m,
            mask,
            first,
            second,
        })
    }

    /// Number of addressable positions.
    pub fn modulus(&self) -> usize {
        self.m as usize
    }

    #[inline]
    fn base_hashes(&self, key: u64) -> (u64, u64) {
        (self.first.mix(key), self.second.mix(key) | 1)
    }

    #[inline]
    fn reduce(&self, h: u64) -> usize {
        match self.mask {
            Some(mask) => (h & mask) as usize,
            None => (h % self.m) as usize,
        }
    }

    /// Position of probe `probe` for `key`.
    #[inline]
    pub fn index(&self, key: u64, probe: usize) -> usize {
        let (h1, h2) = self.base_hashes(key);
        self.reduce(h1.wrapping_add((probe as u64).wrapping_mul(h2)))
    }

    /// The first `k` probe positions for `key`, hashing the key once.
    pub fn probes(
        &self,
        key: u64,
        k: usize,
    ) -> impl Iterator<Item = usize> + '_ {
        let (h1, h2) = self.base_hashes(key);
        (0..k as u64)
            .map(move |i| self.reduce(h1.wrapping_add(i.wrapping_mul(h2))))
    }
}
