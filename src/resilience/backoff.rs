//! Exponential backoff with additive jitter.

use std::time::Duration;

use crate::sources::RandomSource;

/// Upper bound (exclusive) of the jitter added to each delay, in milliseconds.
pub const JITTER_SPAN_MS: u64 = 100;

/// Calculate the delay before retry number `attempt` (0-based).
///
/// `base_ms * 2^attempt`, plus a uniform integer in `[0, 100)` ms when
/// `jitter` is set. Saturates instead of overflowing for large attempts.
pub fn calculate_backoff(
    base_ms: u64,
    attempt: u32,
    jitter: bool,
    random: &dyn RandomSource,
) -> Duration {
    let exponential = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
    let delay_ms = base_ms.saturating_mul(exponential);

    let jitter_ms = if jitter {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let drawn = (random.next_f64() * JITTER_SPAN_MS as f64).floor() as u64;
        drawn.min(JITTER_SPAN_MS - 1)
    } else {
        0
    };

    Duration::from_millis(delay_ms.saturating_add(jitter_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{SequenceRandom, ThreadRandom};

    #[test]
    fn test_backoff_without_jitter_is_exact() {
        let rng = SequenceRandom::constant(0.99);
        assert_eq!(calculate_backoff(250, 0, false, &rng).as_millis(), 250);
        assert_eq!(calculate_backoff(250, 1, false, &rng).as_millis(), 500);
        assert_eq!(calculate_backoff(250, 2, false, &rng).as_millis(), 1000);
        assert_eq!(calculate_backoff(0, 5, false, &rng).as_millis(), 0);
    }

    #[test]
    fn test_jitter_adds_floor_of_draw() {
        let rng = SequenceRandom::new([0.0, 0.425, 0.999], 0.0);
        assert_eq!(calculate_backoff(100, 1, true, &rng).as_millis(), 200);
        assert_eq!(calculate_backoff(100, 1, true, &rng).as_millis(), 242);
        assert_eq!(calculate_backoff(100, 1, true, &rng).as_millis(), 299);
    }

    #[test]
    fn test_jitter_stays_below_span() {
        for attempt in 0..4 {
            let d = calculate_backoff(250, attempt, true, &ThreadRandom).as_millis() as u64;
            let floor = 250 * 2u64.pow(attempt);
            assert!(d >= floor && d < floor + JITTER_SPAN_MS);
        }
    }

    #[test]
    fn test_huge_attempt_saturates() {
        let rng = SequenceRandom::constant(0.5);
        let d = calculate_backoff(250, 200, true, &rng);
        assert_eq!(d, Duration::from_millis(u64::MAX));
    }
}
