// SPDX-License-Identifier: Apache-2.0, MIT
use chrono::Duration;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Injectable RNG seam for cooldown jitter (spec.md §9 design note); tests
/// substitute a deterministic implementation. The production implementation
/// keeps its state behind its own mutex, distinct from
/// [`economy_state::EconomyState`]'s lock (spec.md §5).
pub trait Jitter: Send + Sync {
    fn int63n(&self, max: i64) -> i64;
}

pub struct SeededJitter {
    rng: Mutex<ChaCha8Rng>,
}

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        SeededJitter {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }
}

impl Jitter for SeededJitter {
    fn int63n(&self, max: i64) -> i64 {
        if max <= 0 {
            return 0;
        }
        self.rng.lock().gen_range(0..max)
    }
}

/// Deterministic jitter for tests: always returns the configured value,
/// clamped to `[0, max)`.
pub struct FixedJitter(pub i64);

impl Jitter for FixedJitter {
    fn int63n(&self, max: i64) -> i64 {
        if max <= 0 {
            0
        } else {
            self.0.clamp(0, max - 1)
        }
    }
}

/// Uniform random duration in `[0, min(5min, base*factor)]` (spec.md §4.8).
pub fn cooldown_jitter(jitter: &dyn Jitter, base: Duration, factor: f64) -> Duration {
    if factor <= 0.0 || base <= Duration::zero() {
        return Duration::zero();
    }
    let scaled_ms = (base.num_milliseconds() as f64 * factor) as i64;
    let cap_ms = scaled_ms.min(Duration::minutes(5).num_milliseconds()).max(0);
    if cap_ms <= 0 {
        return Duration::zero();
    }
    Duration::milliseconds(jitter.int63n(cap_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_jitter_clamps_into_range() {
        let jitter = FixedJitter(1000);
        assert_eq!(jitter.int63n(10), 9);
        assert_eq!(jitter.int63n(0), 0);
    }

    #[test]
    fn cooldown_jitter_never_exceeds_five_minutes() {
        let jitter = FixedJitter(i64::MAX / 2);
        let result = cooldown_jitter(&jitter, Duration::hours(2), 0.5);
        assert!(result <= Duration::minutes(5));
    }

    #[test]
    fn zero_factor_yields_no_jitter() {
        let jitter = SeededJitter::new(42);
        assert_eq!(cooldown_jitter(&jitter, Duration::minutes(10), 0.0), Duration::zero());
    }
}
