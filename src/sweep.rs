//! Fixed-range experiment: measure a band of hash counts around `k*` and
//! report each point next to the modelled rate.

use crate::error::{BloomError, Result};
use crate::evaluator::{
    DEFAULT_TRIAL_SEED1, DEFAULT_TRIAL_SEED2, ProgressObserver, TracingObserver,
    Trial,
};
use crate::model::theoretical_k_opt;
use crate::record::{RecordSink, TrialRecord};
use derive_builder::Builder;
use tracing::info;

/// `points` consecutive hash counts starting at `max(1, k_star - points / 2)`.
/// The result always contains `k_star`.
pub fn sweep_range(k_star: usize, points: usize) -> Vec<usize> {
    if points == 0 {
        return vec![k_star.max(1)];
    }
    let lo = k_star.saturating_sub(points / 2).max(1);
    (lo..lo + points).collect()
}

/// Key-stream seed of repetition `rep`.
pub fn repeat_seed(rep: usize, m: usize, n: usize) -> u64 {
    (rep as u64)
        .wrapping_mul(10007)
        .wrapping_add(n as u64)
        .wrapping_add(m as u64)
}

#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct Sweep {
    pub m: usize,

    pub n: usize,

    #[builder(default = "500_000")]
    pub queries: usize,

    /// Number of hash counts measured around `k*`
    #[builder(default = "10")]
    pub points: usize,

    /// Full passes over the range, each with its own key stream
    #[builder(default = "1")]
    pub repeats: usize,

    #[builder(default = "DEFAULT_TRIAL_SEED1")]
    pub seed1: u64,

    #[builder(default = "DEFAULT_TRIAL_SEED2")]
    pub seed2: u64,
}

impl Sweep {
    pub fn validate(&self) -> Result<()> {
        if self.m == 0 {
            return Err(BloomError::InvalidConfig(
                "Bit array size m must be > 0".into(),
            ));
        }
        if self.repeats == 0 {
            return Err(BloomError::InvalidConfig(
                "Repeats must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn k_star(&self) -> usize {
        theoretical_k_opt(self.m, self.n)
    }

    pub fn ks(&self) -> Vec<usize> {
        sweep_range(self.k_star(), self.points)
    }

    pub fn run(&self, sink: &mut dyn RecordSink) -> Result<Vec<TrialRecord>> {
        self.run_with(&TracingObserver, sink)
    }

    /// Measures every `k` of the range once per repetition, in order.
    pub fn run_with(
        &self,
        observer: &dyn ProgressObserver,
        sink: &mut dyn RecordSink,
    ) -> Result<Vec<TrialRecord>> {
        self.validate()?;

        let k_star = self.k_star();
        let ks = self.ks();
        info!(
            m = self.m,
            n = self.n,
            k_star,
            lo = ks.first().copied().unwrap_or(k_star),
            hi = ks.last().copied().unwrap_or(k_star),
            "starting sweep"
        );

        let mut records = Vec::with_capacity(ks.len() * self.repeats);
        for rep in 0..self.repeats {
            let rng_seed = repeat_seed(rep, self.m, self.n);
            for &k in &ks {
                let trial = Trial {
                    m: self.m,
                    k,
                    n: self.n,
                    queries: self.queries,
                    seed1: self.seed1,
                    seed2: self.seed2,
                    rng_seed,
                    key_bits: 64,
                };
                let rate = trial.run_with(observer)?.rate();
                let record = TrialRecord::new(self.m, self.n, k, rate, k_star);
                info!(
                    k,
                    empirical_fp = rate,
                    theoretical_fp = record.theoretical_fp,
                    "measured"
                );
                sink.record(&record)?;
                records.push(record);
            }
        }
        Ok(records)
    }
}
