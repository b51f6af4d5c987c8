// SPDX-License-Identifier: Apache-2.0, MIT
//! 24h-vs-7d purchase-rate feedback (spec.md §4.7). Computes a target
//! pressure from recent purchase velocity and moves the shared
//! [`EconomyState`] toward it by at most one rate-limited step per tick.

use chrono::{DateTime, Duration, Utc};
use economy_state::EconomyState;
use economy_storage::EconomyRepository;
use economy_types::{EconomyError, SeasonId};

/// `0.02/60` per tick — roughly 2% per hour at a 60s cadence.
pub const MAX_DELTA_PER_TICK: f64 = 0.02 / 60.0;

/// Pure target computation from last-24h and last-7d purchase counts.
pub fn target_pressure(last_24h: i64, last_7d: i64) -> f64 {
    let long_term_daily = (last_7d as f64 / 7.0).max(1.0);
    let ratio = last_24h as f64 / long_term_daily;
    if ratio >= 1.0 {
        1.0 + (0.25 * (ratio - 1.0)).min(0.8)
    } else {
        1.0 - (0.15 * (1.0 - ratio)).min(0.3)
    }
}

/// Runs one market-pressure tick: reads purchase counts for the trailing 24h
/// and 7d windows and nudges `state`'s pressure toward the derived target.
/// Returns the pressure value after the update.
pub async fn update_market_pressure_tick<R: EconomyRepository>(
    repo: &R,
    state: &EconomyState,
    season_id: &SeasonId,
    now: DateTime<Utc>,
) -> Result<f64, EconomyError> {
    let last_24h = repo
        .purchase_count_since(season_id, now - Duration::hours(24))
        .await?;
    let last_7d = repo
        .purchase_count_since(season_id, now - Duration::days(7))
        .await?;

    let target = target_pressure(last_24h, last_7d);
    Ok(state.update_market_pressure(target, MAX_DELTA_PER_TICK))
}

#[cfg(test)]
mod tests {
    use super::*;
    use economy_types::SeasonId;

    #[test]
    fn high_ratio_pushes_target_up_capped_at_point_eight() {
        let target = target_pressure(1000, 70); // ratio = 1000/10 = 100
        assert!((target - 1.8).abs() < 1e-9);
    }

    #[test]
    fn zero_purchases_floors_target_at_point_eight_five() {
        // ratio=0 is the worst case on the downside; 0.15*(1-ratio) maxes out
        // at 0.15, so the 0.3 cap in the spec's min(...) is never binding.
        let target = target_pressure(0, 700);
        assert!((target - 0.85).abs() < 1e-9);
    }

    #[test]
    fn equal_ratio_is_neutral() {
        let target = target_pressure(10, 70); // long_term_daily=10, ratio=1
        assert!((target - 1.0).abs() < 1e-9);
    }

    #[test]
    fn pressure_ramp_matches_scenario_three() {
        let state = EconomyState::new(SeasonId::from("season-1"));
        for _ in 0..10 {
            state.update_market_pressure(2.0, MAX_DELTA_PER_TICK);
        }
        let pressure = state.market_pressure();
        assert!((pressure - (1.0 + 10.0 * MAX_DELTA_PER_TICK)).abs() < 1e-9);
        assert!(pressure < 1.01);
    }
}
