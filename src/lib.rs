//! Double-hashing Bloom filter with tooling to validate it.
//!
//! This crate provides a fixed-size Bloom filter over 64-bit keys and the
//! experiment machinery used to pick its hash count.
//!
//! HowTo:
//!    * Hashing: two independently seeded 64-bit mixers give `h1` and `h2`;
//!      probe `i` lands on `(h1 + i * h2) mod m`, with `h2` forced odd.
//!    * Model: the closed form `(1 - e^{-kn/m})^k` predicts the false
//!      positive rate, minimized near `k* = (m / n) ln 2`.
//!    * Measurement: a trial inserts `n` random keys and probes `queries`
//!      keys that are known non-members, counting false positives.
//!    * Search: trials are run over a window of `k` around `k*`; the window
//!      doubles while the best `k` sits on an edge that can still move.
//!
//! Guarantees:
//!     * No false negatives, ever.
//!     * Trials are deterministic for fixed seeds.
//!     * No deletion; bits are only set.
//!
//! Not provided:
//!     * Thread-safe mutation of a single filter.
//!     * Resistance to adversarial keys; the mixers are not cryptographic.

mod error;
pub mod evaluator;
mod filter;
mod hash;
pub mod model;
pub mod record;
pub mod search;
pub mod sweep;

pub use error::{BloomError, Result};
pub use evaluator::{
    NoopObserver, Phase, Progress, ProgressObserver, TracingObserver, Trial,
    TrialBuilder, TrialBuilderError, TrialOutcome, empirical_fp_rate,
};
pub use filter::MembershipFilter;
pub use hash::{
    DEFAULT_SEED1, DEFAULT_SEED2, Fmix64, HashIndexer, Mixer, SplitMix64,
};
pub use model::{
    expected_fill_ratio, optimal_bit_vector_size, theoretical_fp_prob,
    theoretical_k_opt,
};
pub use record::{CsvSink, NullSink, RecordSink, TrialRecord};
pub use search::{
    AdaptiveSearch, KRange, MAX_ROUNDS, RoundSummary, SearchConfig,
    SearchConfigBuilder, SearchConfigBuilderError, SearchOutcome, SearchState,
    find_best_k, trial_seed,
};
pub use sweep::{Sweep, SweepBuilder, SweepBuilderError, sweep_range};
