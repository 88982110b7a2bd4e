mod common;

use bloom_kstar::{
    BloomError, Fmix64, MembershipFilter, Mixer, SplitMix64,
};
use common::random_keys;

#[cfg(test)]
mod basic_operations_tests {
    use super::*;

    #[test]
    fn test_add_and_contains() {
        let mut filter = MembershipFilter::new(1000, 4, 1, 2).unwrap();

        filter.add(0xdead_beef);
        assert!(
            filter.possibly_contains(0xdead_beef),
            "Key should be found after insertion"
        );
    }

    #[test]
    fn test_empty_filter_contains_nothing() {
        let filter = MembershipFilter::new(1000, 4, 1, 2).unwrap();

        for key in random_keys(1000, 1) {
            assert!(!filter.possibly_contains(key));
        }
        assert_eq!(filter.count_ones(), 0);
        assert_eq!(filter.fill_ratio(), 0.0);
    }

    #[test]
    fn test_duplicate_insertions_are_idempotent() {
        let mut filter = MembershipFilter::new(4096, 6, 1, 2).unwrap();
        filter.add(42);
        let words = filter.words().to_vec();

        for _ in 0..5 {
            filter.add(42);
        }
        assert_eq!(filter.words(), words.as_slice());
    }

    #[test]
    fn test_accessors() {
        let filter = MembershipFilter::new(1000, 7, 1, 2).unwrap();
        assert_eq!(filter.size_bits(), 1000);
        assert_eq!(filter.num_hashes(), 7);
        assert_eq!(filter.words().len(), 16);
    }
}

#[cfg(test)]
mod no_false_negatives_tests {
    use super::*;

    #[test]
    fn test_no_false_negatives_across_shapes() {
        let keys = random_keys(2_000, 7);
        // power-of-two and odd sizes, light and heavy probing
        for &(m, k) in &[(1 << 12, 1), (1 << 14, 5), (10_007, 3), (3_000, 12)] {
            let mut filter = MembershipFilter::new(m, k, 99, 100).unwrap();
            for &key in &keys {
                filter.add(key);
            }
            for &key in &keys {
                assert!(
                    filter.possibly_contains(key),
                    "False negative for key {key} with m={m}, k={k}"
                );
            }
        }
    }

    #[test]
    fn test_membership_survives_later_insertions() {
        let keys = random_keys(5_000, 11);
        let mut filter = MembershipFilter::new(8_192, 4, 3, 4).unwrap();

        for (i, &key) in keys.iter().enumerate() {
            filter.add(key);
            // every earlier key must still be reported
            if i % 500 == 0 {
                for &earlier in &keys[..=i] {
                    assert!(filter.possibly_contains(earlier));
                }
            }
        }
    }

    #[test]
    fn test_saturated_filter_reports_everything() {
        let mut filter = MembershipFilter::new(64, 2, 1, 2).unwrap();
        for key in random_keys(10_000, 3) {
            filter.add(key);
        }
        assert_eq!(filter.count_ones(), 64);
        assert_eq!(filter.fill_ratio(), 1.0);
        assert!(filter.possibly_contains(u64::MAX));
    }

    #[test]
    fn test_bits_never_cleared() {
        let mut filter = MembershipFilter::new(2_048, 3, 5, 6).unwrap();
        let mut previous = filter.count_ones();
        for key in random_keys(1_000, 13) {
            filter.add(key);
            let now = filter.count_ones();
            assert!(now >= previous);
            previous = now;
        }
    }
}

#[cfg(test)]
mod custom_mixer_tests {
    use super::*;

    /// Deliberately weak mixer; membership must still hold.
    struct Identity;

    impl Mixer for Identity {
        fn from_seed(_seed: u64) -> Self {
            Identity
        }

        fn mix(&self, key: u64) -> u64 {
            key
        }
    }

    #[test]
    fn test_filter_with_custom_mixers() {
        let mut filter = MembershipFilter::with_mixers(
            512,
            3,
            Identity,
            Fmix64::from_seed(9),
        )
        .unwrap();
        for key in 0..100u64 {
            filter.add(key);
        }
        for key in 0..100u64 {
            assert!(filter.possibly_contains(key));
        }
    }

    #[test]
    fn test_seeds_change_bit_layout() {
        let mut a = MembershipFilter::new(1 << 16, 4, 1, 2).unwrap();
        let mut b = MembershipFilter::with_mixers(
            1 << 16,
            4,
            SplitMix64::from_seed(1),
            Fmix64::from_seed(3),
        )
        .unwrap();
        for key in random_keys(100, 17) {
            a.add(key);
            b.add(key);
        }
        assert_ne!(a.words(), b.words());
    }
}

#[cfg(test)]
mod invalid_config_tests {
    use super::*;

    #[test]
    fn test_zero_bits_fails() {
        let result = MembershipFilter::new(0, 3, 1, 2);
        match result {
            Err(BloomError::InvalidConfig(msg)) => {
                assert!(msg.contains("m must be > 0"));
            }
            _ => panic!("Expected InvalidConfig error for m = 0"),
        }
    }

    #[test]
    fn test_zero_hashes_fails() {
        let result = MembershipFilter::new(100, 0, 1, 2);
        match result {
            Err(BloomError::InvalidConfig(msg)) => {
                assert!(msg.contains("k must be >= 1"));
            }
            _ => panic!("Expected InvalidConfig error for k = 0"),
        }
    }

    #[test]
    fn test_single_bit_filter_is_valid() {
        let mut filter = MembershipFilter::new(1, 1, 1, 2).unwrap();
        assert!(!filter.possibly_contains(5));
        filter.add(5);
        assert!(filter.possibly_contains(6));
    }
}
