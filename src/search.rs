//! Adaptive search for the empirically best hash count.
//!
//! The search starts from a window around the theoretical optimum `k*` and
//! scans every `k` in it. If the best `k` of a round lies strictly inside the
//! window it is accepted; if it sits on an edge that can still move, the
//! window is doubled and the search scans again.
//!
//! ```text
//!  Scanning ──interior min / limit reached──▶ Done
//!     │  ▲
//!     ▼  │
//!  Expanding
//! ```

use crate::error::{BloomError, Result};
use crate::evaluator::{
    DEFAULT_TRIAL_SEED1, DEFAULT_TRIAL_SEED2, ProgressObserver, TracingObserver,
    Trial,
};
use crate::model::theoretical_k_opt;
use crate::record::{NullSink, RecordSink, TrialRecord};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// No window expansion happens after this many rounds.
pub const MAX_ROUNDS: usize = 8;

const MIN_WINDOW: usize = 3;
const MAX_INITIAL_WINDOW: usize = 100;
const MIN_HARD_CAP: usize = 500;

/// Key-stream seed used when evaluating hash count `k`.
pub fn trial_seed(k: usize) -> u64 {
    (k as u64).wrapping_mul(1009).wrapping_add(7)
}

#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct SearchConfig {
    /// Filter size in bits
    pub m: usize,

    /// Number of keys inserted per trial
    pub n: usize,

    /// Smallest hash count the search may consider
    #[builder(default = "1")]
    pub k_min: usize,

    /// Largest hash count the search may consider
    #[builder(default = "100")]
    pub k_max: usize,

    /// True-negative probes per trial
    #[builder(default = "100_000")]
    pub queries: usize,

    #[builder(default = "DEFAULT_TRIAL_SEED1")]
    pub seed1: u64,

    #[builder(default = "DEFAULT_TRIAL_SEED2")]
    pub seed2: u64,
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.m == 0 {
            return Err(BloomError::InvalidConfig(
                "Bit array size m must be > 0".into(),
            ));
        }
        if self.k_min == 0 {
            return Err(BloomError::InvalidConfig(
                "k_min must be >= 1".into(),
            ));
        }
        if self.k_min > self.k_max {
            return Err(BloomError::InvalidConfig(format!(
                "k_min ({}) must not exceed k_max ({})",
                self.k_min, self.k_max
            )));
        }
        Ok(())
    }
}

/// Inclusive range of hash counts scanned in one round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KRange {
    pub lo: usize,
    pub hi: usize,
}

impl KRange {
    pub fn is_interior(&self, k: usize) -> bool {
        self.lo < k && k < self.hi
    }

    pub fn iter(&self) -> std::ops::RangeInclusive<usize> {
        self.lo..=self.hi
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchState {
    Scanning,
    Expanding,
    Done,
}

/// Result of one scanning round.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub round: usize,
    pub window: usize,
    pub range: KRange,
    pub best_k: usize,
    pub best_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Best hash count seen across all rounds
    pub best_k: usize,
    pub best_rate: f64,
    /// Theoretical optimum the search started from
    pub k_star: usize,
    pub rounds: Vec<RoundSummary>,
}

pub struct AdaptiveSearch {
    config: SearchConfig,
    k_star: usize,
    // k_star clamped into [k_min, k_max]
    center: usize,
    window: usize,
    hard_cap: usize,
    range: KRange,
    state: SearchState,
    best_k: usize,
    best_rate: f64,
    rounds: Vec<RoundSummary>,
}

impl AdaptiveSearch {
    pub fn new(config: SearchConfig) -> Result<Self> {
        config.validate()?;

        let k_star = theoretical_k_opt(config.m, config.n);
        let center = k_star.clamp(config.k_min, config.k_max);
        let window = k_star.div_ceil(2).clamp(MIN_WINDOW, MAX_INITIAL_WINDOW);
        let hard_cap = MIN_HARD_CAP.max(config.k_max);

        let mut search = Self {
            k_star,
            center,
            window,
            hard_cap,
            range: KRange {
                lo: center,
                hi: center,
            },
            state: SearchState::Scanning,
            best_k: center,
            best_rate: f64::INFINITY,
            rounds: Vec::new(),
            config,
        };
        search.range = search.range_for(window);
        Ok(search)
    }

    pub fn k_star(&self) -> usize {
        self.k_star
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Range scanned by the next round.
    pub fn range(&self) -> KRange {
        self.range
    }

    pub fn window(&self) -> usize {
        self.window
    }

    fn range_for(&self, window: usize) -> KRange {
        KRange {
            lo: self.center.saturating_sub(window).max(self.config.k_min),
            hi: self.center.saturating_add(window).min(self.config.k_max),
        }
    }

    /// Runs to completion, logging through `tracing` and discarding records.
    pub fn run(self) -> Result<SearchOutcome> {
        self.run_with(&TracingObserver, &mut NullSink)
    }

    /// Runs to completion, sending every evaluated point to `sink`.
    pub fn run_with(
        mut self,
        observer: &dyn ProgressObserver,
        sink: &mut dyn RecordSink,
    ) -> Result<SearchOutcome> {
        if self.config.n == 0 {
            self.best_rate = 0.0;
            self.state = SearchState::Done;
        } else {
            info!(
                k_star = self.k_star,
                lo = self.range.lo,
                hi = self.range.hi,
                window = self.window,
                "starting k search"
            );
        }

        loop {
            match self.state {
                SearchState::Scanning => {
                    let summary = self.scan(observer, sink)?;
                    self.rounds.push(summary);
                    self.state = self.after_scan(&summary);
                }
                SearchState::Expanding => {
                    self.window = self.hard_cap.min(self.window * 2);
                    self.range = self.range_for(self.window);
                    info!(
                        window = self.window,
                        lo = self.range.lo,
                        hi = self.range.hi,
                        "expanding search window"
                    );
                    self.state = SearchState::Scanning;
                }
                SearchState::Done => break,
            }
        }

        info!(
            best_k = self.best_k,
            best_rate = self.best_rate,
            rounds = self.rounds.len(),
            "k search finished"
        );
        Ok(SearchOutcome {
            best_k: self.best_k,
            best_rate: self.best_rate,
            k_star: self.k_star,
            rounds: self.rounds,
        })
    }

    fn evaluate(
        &self,
        k: usize,
        observer: &dyn ProgressObserver,
    ) -> Result<f64> {
        let trial = Trial {
            m: self.config.m,
            k,
            n: self.config.n,
            queries: self.config.queries,
            seed1: self.config.seed1,
            seed2: self.config.seed2,
            rng_seed: trial_seed(k),
            key_bits: 64,
        };
        Ok(trial.run_with(observer)?.rate())
    }

    #[cfg(feature = "parallel")]
    fn evaluate_range(
        &self,
        observer: &dyn ProgressObserver,
    ) -> Result<Vec<(usize, f64)>> {
        self.range
            .iter()
            .into_par_iter()
            .map(|k| self.evaluate(k, observer).map(|rate| (k, rate)))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn evaluate_range(
        &self,
        observer: &dyn ProgressObserver,
    ) -> Result<Vec<(usize, f64)>> {
        self.range
            .iter()
            .map(|k| self.evaluate(k, observer).map(|rate| (k, rate)))
            .collect()
    }

    fn scan(
        &mut self,
        observer: &dyn ProgressObserver,
        sink: &mut dyn RecordSink,
    ) -> Result<RoundSummary> {
        let round = self.rounds.len() + 1;
        info!(round, lo = self.range.lo, hi = self.range.hi, "scanning");

        // Results arrive in ascending k, so a strict comparison keeps the
        // smallest k among equal rates.
        let results = self.evaluate_range(observer)?;
        let mut round_best = (self.range.lo, f64::INFINITY);
        for &(k, rate) in &results {
            let record = TrialRecord::new(
                self.config.m,
                self.config.n,
                k,
                rate,
                self.k_star,
            );
            debug!(
                k,
                empirical_fp = rate,
                theoretical_fp = record.theoretical_fp,
                "evaluated"
            );
            sink.record(&record)?;
            if rate < round_best.1 {
                round_best = (k, rate);
            }
        }

        if round_best.1 < self.best_rate {
            self.best_k = round_best.0;
            self.best_rate = round_best.1;
        }
        info!(
            round,
            round_best_k = round_best.0,
            round_best_rate = round_best.1,
            best_k = self.best_k,
            best_rate = self.best_rate,
            "round finished"
        );

        Ok(RoundSummary {
            round,
            window: self.window,
            range: self.range,
            best_k: round_best.0,
            best_rate: round_best.1,
        })
    }

    fn after_scan(&self, summary: &RoundSummary) -> SearchState {
        let range = summary.range;
        let k = summary.best_k;

        if range.is_interior(k) {
            return SearchState::Done;
        }

        let can_extend_lo = k == range.lo && range.lo > self.config.k_min;
        let can_extend_hi = k == range.hi && range.hi < self.config.k_max;
        if !can_extend_lo && !can_extend_hi {
            debug!(k, "best k on a fixed boundary");
            return SearchState::Done;
        }

        // at most MAX_ROUNDS scans in total, no expansion after the last
        if summary.round >= MAX_ROUNDS || self.window >= self.hard_cap {
            debug!(round = summary.round, "expansion limit reached");
            return SearchState::Done;
        }

        SearchState::Expanding
    }
}

/// Finds the hash count with the lowest empirical false-positive rate for a
/// filter of `m` bits holding `n` keys, searching within `[k_min, k_max]`.
pub fn find_best_k(
    m: usize,
    n: usize,
    k_min: usize,
    k_max: usize,
    queries: usize,
    seed1: u64,
    seed2: u64,
) -> Result<SearchOutcome> {
    let config = SearchConfig {
        m,
        n,
        k_min,
        k_max,
        queries,
        seed1,
        seed2,
    };
    AdaptiveSearch::new(config)?.run()
}
