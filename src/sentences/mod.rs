//! Generated message texts.
//!
//! Builds the morning greeting from randomized phrase fragments.

mod morning;

pub use morning::morning_greeting;

use rand::Rng;

/// Generates a power-biased random integer in `[a, b]`.
///
/// `p == 1.0` is uniform; `p > 1.0` skews towards `a`; `p < 1.0` skews
/// towards `b`.
pub(crate) fn low_random(rng: &mut impl Rng, a: usize, b: usize, p: f64) -> usize {
    let span = (b - a + 1) as f64;
    let skewed = rng.r#gen::<f64>().powf(p);
    // The skewed value is < 1.0, so the offset never reaches `span`.
    a + (span * skewed) as usize
}

/// Repeats a character a biased-random number of times, between 1 and `max`.
pub(crate) fn stretched(rng: &mut impl Rng, ch: char, max: usize) -> String {
    let count = low_random(rng, 1, max, 2.0);
    std::iter::repeat_n(ch, count).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_low_random_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let value = low_random(&mut rng, 1, 10, 2.0);
            assert!((1..=10).contains(&value));
        }
    }

    #[test]
    fn test_low_random_degenerate_range() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(low_random(&mut rng, 4, 4, 2.0), 4);
    }

    #[test]
    fn test_low_random_skews_low() {
        let mut rng = StdRng::seed_from_u64(7);
        let samples = 2000;
        let low_half = (0..samples)
            .filter(|_| low_random(&mut rng, 1, 10, 3.0) <= 5)
            .count();
        // With a strong low bias, well over half of the samples land low.
        assert!(low_half > samples * 6 / 10);
    }

    #[test]
    fn test_stretched_length() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let s = stretched(&mut rng, 'o', 10);
            assert!((1..=10).contains(&s.chars().count()));
            assert!(s.chars().all(|c| c == 'o'));
        }
    }
}
