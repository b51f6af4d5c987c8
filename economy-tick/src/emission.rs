// SPDX-License-Identifier: Apache-2.0, MIT
//! Effective daily emission target (spec.md §4.9 step 4): scales `CBase`
//! down over the season and as wallets accumulate coins, floored so the
//! faucet never starves entirely.

use economy_types::CalibrationParams;

/// `CBase * timeMult * coinMult`, floored at `max(0.25*CBase, DailyCapLate)`.
pub fn effective_daily_emission_target(
    params: &CalibrationParams,
    progress: f64,
    coins_in_wallets: i64,
) -> i64 {
    let time_mult = (1.0 - 0.75 * progress).max(0.12);
    let coin_mult =
        (1.0 / (1.0 + coins_in_wallets as f64 / (params.g_scale * 4.0))).max(0.2);
    let raw = params.c_base as f64 * time_mult * coin_mult;
    let floor = (0.25 * params.c_base as f64).max(params.daily_cap_late as f64);
    raw.max(floor).round() as i64
}

/// True when effective emission has fallen to 70% or below of `CBase`
/// (spec.md §4.9 step 4: "emit throttle alert").
pub fn is_emission_throttled(effective: i64, c_base: i64) -> bool {
    let c_base = c_base.max(1) as f64;
    (effective as f64 / c_base) <= 0.7
}
