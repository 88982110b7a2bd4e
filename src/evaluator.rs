//! Empirical false-positive measurement.
//!
//! A trial fills a fresh filter with `n` distinct pseudo-random keys and then
//! probes it with `queries` keys known not to be members. Keys come from a
//! PCG stream seeded by the trial, so a trial is fully reproducible.

use crate::error::{BloomError, Result};
use crate::filter::MembershipFilter;
use derive_builder::Builder;
use fnv::FnvHashSet;
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;
use std::fmt;
use tracing::debug;

pub const DEFAULT_TRIAL_SEED1: u64 = 12345;
pub const DEFAULT_TRIAL_SEED2: u64 = 67890;
pub const DEFAULT_RNG_SEED: u64 = 42;

// Progress is reported at about this many evenly spaced points per phase.
const PROGRESS_POINTS: usize = 10;

const MIN_DRAW_BUDGET: u64 = 1 << 16;
const DRAWS_PER_KEY: u64 = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Insert,
    Query,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Insert => write!(f, "insertion"),
            Phase::Query => write!(f, "query"),
        }
    }
}

/// A progress event from inside a running trial.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub phase: Phase,
    pub k: usize,
    pub done: usize,
    pub total: usize,
    /// False positives seen so far; always 0 during insertion
    pub false_positives: usize,
}

impl Progress {
    pub fn is_finished(&self) -> bool {
        self.done == self.total
    }
}

/// Receives progress events from trials.
///
/// Trials of one search round may run on several threads, so observers are
/// shared by reference.
pub trait ProgressObserver: Sync {
    fn on_progress(&self, event: &Progress);
}

impl<F: Fn(&Progress) + Sync> ProgressObserver for F {
    fn on_progress(&self, event: &Progress) {
        self(event)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_progress(&self, _event: &Progress) {}
}

/// Forwards progress events to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_progress(&self, event: &Progress) {
        debug!(
            phase = %event.phase,
            k = event.k,
            done = event.done,
            total = event.total,
            false_positives = event.false_positives,
            "trial progress"
        );
    }
}

/// Parameters of one empirical measurement.
#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct Trial {
    /// Filter size in bits
    pub m: usize,

    /// Probes per key
    pub k: usize,

    /// Distinct keys to insert
    #[builder(default = "0")]
    pub n: usize,

    /// True-negative probes to issue
    #[builder(default = "100_000")]
    pub queries: usize,

    /// Seed of the first hash mixer
    #[builder(default = "DEFAULT_TRIAL_SEED1")]
    pub seed1: u64,

    /// Seed of the second hash mixer
    #[builder(default = "DEFAULT_TRIAL_SEED2")]
    pub seed2: u64,

    /// Seed of the key stream
    #[builder(default = "DEFAULT_RNG_SEED")]
    pub rng_seed: u64,

    /// Width of drawn keys; keys are masked to the low `key_bits` bits
    #[builder(default = "64")]
    pub key_bits: u32,
}

/// Counts gathered by a finished trial.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrialOutcome {
    pub k: usize,
    pub inserted: usize,
    pub queries: usize,
    pub false_positives: usize,
    /// Keys drawn across both phases, including discarded repeats
    pub draws: u64,
}

impl TrialOutcome {
    /// Observed false-positive rate; `0` when no queries were issued.
    pub fn rate(&self) -> f64 {
        if self.queries == 0 {
            return 0.0;
        }
        self.false_positives as f64 / self.queries as f64
    }
}

struct KeyStream {
    rng: Pcg64Mcg,
    mask: u64,
    draws: u64,
}

impl KeyStream {
    fn new(seed: u64, key_bits: u32) -> Self {
        let mask = if key_bits >= 64 {
            u64::MAX
        } else {
            (1u64 << key_bits) - 1
        };
        Self {
            rng: Pcg64Mcg::seed_from_u64(seed),
            mask,
            draws: 0,
        }
    }

    #[inline]
    fn next_key(&mut self) -> u64 {
        self.draws += 1;
        self.rng.next_u64() & self.mask
    }
}

fn draw_budget(target: usize) -> u64 {
    (target as u64)
        .saturating_mul(DRAWS_PER_KEY)
        .max(MIN_DRAW_BUDGET)
}

fn progress_step(total: usize) -> usize {
    (total / PROGRESS_POINTS).max(1)
}

impl Trial {
    pub fn validate(&self) -> Result<()> {
        if self.m == 0 {
            return Err(BloomError::InvalidConfig(
                "Bit array size m must be > 0".into(),
            ));
        }
        if self.k == 0 {
            return Err(BloomError::InvalidConfig(
                "Number of hashes k must be >= 1".into(),
            ));
        }
        if self.key_bits == 0 || self.key_bits > 64 {
            return Err(BloomError::InvalidConfig(format!(
                "Key width must be between 1 and 64 bits, got {}",
                self.key_bits
            )));
        }
        Ok(())
    }

    /// Rejects trials whose key space cannot supply enough distinct keys.
    fn check_key_space(&self) -> Result<()> {
        let space = 1u128 << self.key_bits;
        if self.n as u128 > space {
            return Err(BloomError::ExhaustedKeySpace {
                phase: Phase::Insert,
                needed: self.n,
                obtained: 0,
                draws: 0,
            });
        }
        if self.queries > 0 && self.n as u128 == space {
            return Err(BloomError::ExhaustedKeySpace {
                phase: Phase::Query,
                needed: self.queries,
                obtained: 0,
                draws: 0,
            });
        }
        Ok(())
    }

    /// Runs the trial, reporting progress through `tracing`.
    pub fn run(&self) -> Result<TrialOutcome> {
        self.run_with(&TracingObserver)
    }

    pub fn run_with(
        &self,
        observer: &dyn ProgressObserver,
    ) -> Result<TrialOutcome> {
        self.validate()?;
        self.check_key_space()?;

        let mut filter =
            MembershipFilter::new(self.m, self.k, self.seed1, self.seed2)?;
        let mut keys = KeyStream::new(self.rng_seed, self.key_bits);
        let mut inserted: FnvHashSet<u64> =
            FnvHashSet::with_capacity_and_hasher(self.n, Default::default());

        // Insert n distinct keys
        let step = progress_step(self.n);
        let budget = draw_budget(self.n);
        while inserted.len() < self.n {
            if keys.draws >= budget {
                return Err(BloomError::ExhaustedKeySpace {
                    phase: Phase::Insert,
                    needed: self.n,
                    obtained: inserted.len(),
                    draws: keys.draws,
                });
            }
            let key = keys.next_key();
            if inserted.insert(key) {
                filter.add(key);
                let done = inserted.len();
                if done % step == 0 && done < self.n {
                    observer.on_progress(&Progress {
                        phase: Phase::Insert,
                        k: self.k,
                        done,
                        total: self.n,
                        false_positives: 0,
                    });
                }
            }
        }
        observer.on_progress(&Progress {
            phase: Phase::Insert,
            k: self.k,
            done: self.n,
            total: self.n,
            false_positives: 0,
        });

        // Probe with keys that were never inserted
        let insert_draws = keys.draws;
        let step = progress_step(self.queries);
        let budget = draw_budget(self.queries);
        let mut false_positives = 0;
        let mut performed = 0;
        while performed < self.queries {
            if keys.draws - insert_draws >= budget {
                return Err(BloomError::ExhaustedKeySpace {
                    phase: Phase::Query,
                    needed: self.queries,
                    obtained: performed,
                    draws: keys.draws,
                });
            }
            let key = keys.next_key();
            if inserted.contains(&key) {
                continue;
            }
            if filter.possibly_contains(key) {
                false_positives += 1;
            }
            performed += 1;
            if performed % step == 0 && performed < self.queries {
                observer.on_progress(&Progress {
                    phase: Phase::Query,
                    k: self.k,
                    done: performed,
                    total: self.queries,
                    false_positives,
                });
            }
        }
        observer.on_progress(&Progress {
            phase: Phase::Query,
            k: self.k,
            done: performed,
            total: self.queries,
            false_positives,
        });

        Ok(TrialOutcome {
            k: self.k,
            inserted: inserted.len(),
            queries: performed,
            false_positives,
            draws: keys.draws,
        })
    }
}

/// Observed false-positive rate of a `(m, k)` filter holding `n` random
/// keys, measured over `queries` guaranteed non-members.
pub fn empirical_fp_rate(
    m: usize,
    k: usize,
    n: usize,
    queries: usize,
    seed1: u64,
    seed2: u64,
    rng_seed: u64,
) -> Result<f64> {
    let trial = Trial {
        m,
        k,
        n,
        queries,
        seed1,
        seed2,
        rng_seed,
        key_bits: 64,
    };
    Ok(trial.run()?.rate())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_step_never_zero() {
        assert_eq!(progress_step(0), 1);
        assert_eq!(progress_step(5), 1);
        assert_eq!(progress_step(1000), 100);
    }

    #[test]
    fn test_key_stream_respects_width() {
        let mut keys = KeyStream::new(7, 4);
        for _ in 0..1000 {
            assert!(keys.next_key() < 16);
        }
        assert_eq!(keys.draws, 1000);
    }
}
