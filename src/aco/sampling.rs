//! Weighted random draws.

use rand::Rng;

/// Roulette wheel selection over non-negative weights.
///
/// Returns index `i` with probability `weights[i] / Σ weights`. Slots with
/// zero weight are never returned. Returns `None` when the total is not a
/// positive finite number.
///
/// Negative and NaN weights are treated as zero.
pub fn roulette_select<R: Rng>(weights: &[f64], rng: &mut R) -> Option<usize> {
    let mass = |w: f64| if w > 0.0 { w } else { 0.0 };
    let total: f64 = weights.iter().map(|&w| mass(w)).sum();
    if !(total > 0.0 && total.is_finite()) {
        return None;
    }

    let mut roll = rng.random_range(0.0..total);
    let mut last_positive = None;
    for (i, &w) in weights.iter().enumerate() {
        let w = mass(w);
        if w == 0.0 {
            continue;
        }
        if roll < w {
            return Some(i);
        }
        roll -= w;
        last_positive = Some(i);
    }
    // Rounding can leave a sliver of `roll` past the final slot.
    last_positive
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_empty_and_zero_weights() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(roulette_select(&[], &mut rng), None);
        assert_eq!(roulette_select(&[0.0, 0.0], &mut rng), None);
        assert_eq!(roulette_select(&[f64::NAN, -1.0], &mut rng), None);
    }

    #[test]
    fn test_single_positive_slot_always_wins() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..200 {
            assert_eq!(roulette_select(&[0.0, 3.5, 0.0], &mut rng), Some(1));
        }
    }

    #[test]
    fn test_frequencies_follow_weights() {
        let mut rng = StdRng::seed_from_u64(3);
        let weights = [1.0, 3.0, 0.0, 6.0];
        let mut counts = [0usize; 4];
        let draws = 20_000;
        for _ in 0..draws {
            counts[roulette_select(&weights, &mut rng).unwrap()] += 1;
        }
        assert_eq!(counts[2], 0);
        let share = |i: usize| counts[i] as f64 / draws as f64;
        assert!((share(0) - 0.1).abs() < 0.02, "share0 {}", share(0));
        assert!((share(1) - 0.3).abs() < 0.02, "share1 {}", share(1));
        assert!((share(3) - 0.6).abs() < 0.02, "share3 {}", share(3));
    }

    proptest! {
        #[test]
        fn prop_never_picks_zero_weight(
            weights in prop::collection::vec(prop_oneof![Just(0.0), 0.001f64..1e6], 1..12),
            seed in any::<u64>(),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let picked = roulette_select(&weights, &mut rng);
            if weights.iter().all(|&w| w == 0.0) {
                prop_assert!(picked.is_none());
            } else {
                let i = picked.unwrap();
                prop_assert!(weights[i] > 0.0);
            }
        }
    }
}
