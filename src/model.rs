//! Closed-form false-positive model for a Bloom filter of `m` bits holding
//! `n` keys with `k` probes each.

use std::f64::consts::LN_2;

/// Hash count minimizing the modelled false-positive rate,
/// `max(1, round((m / n) ln 2))`. Returns `1` for an empty set.
pub fn theoretical_k_opt(m: usize, n: usize) -> usize {
    if n == 0 {
        return 1;
    }
    ((m as f64 / n as f64) * LN_2).round().max(1.0) as usize
}

/// Probability that a non-member is reported present, `(1 - e^{-kn/m})^k`.
pub fn theoretical_fp_prob(m: usize, n: usize, k: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    expected_fill_ratio(m, n, k).powi(k as i32)
}

/// Expected fraction of bits set after `n` insertions.
pub fn expected_fill_ratio(m: usize, n: usize, k: usize) -> f64 {
    1.0 - (-(k as f64) * n as f64 / m as f64).exp()
}

/// Bits needed to hold `n` keys at false-positive rate `fpr` with the
/// optimal hash count.
pub fn optimal_bit_vector_size(n: usize, fpr: f64) -> usize {
    ((-(n as f64) * fpr.ln()) / (LN_2 * LN_2)).ceil() as usize
}
