// SPDX-License-Identifier: Apache-2.0, MIT
//! Closed-form star-price function (spec.md §4.4). Pure math: no I/O, no
//! mutex. Callers apply the result to [`economy_state::EconomyState`] via
//! `apply_price_floor` to get the monotonic public price.

use economy_state::EconomyState;
use economy_types::{CalibrationParams, Microcoins};

/// Everything the pricing formula needs beyond the season's calibration.
#[derive(Clone, Copy, Debug)]
pub struct PriceInputs {
    pub stars_sold: i64,
    pub total_coins: i64,
    pub active_coins: i64,
    pub active_players: i64,
    pub remaining_seconds: i64,
    pub season_length_seconds: i64,
    pub market_pressure: f64,
}

/// The formula's un-floored result, in microcoins. Exposed for tests and for
/// callers that apply the floor themselves.
pub fn raw_price(params: &CalibrationParams, inputs: &PriceInputs) -> i64 {
    let season_length = inputs.season_length_seconds.max(1) as f64;
    let progress = (1.0 - inputs.remaining_seconds as f64 / season_length).clamp(0.0, 1.0);

    let scarcity = 1.0 + inputs.stars_sold as f64 / params.s_scale;

    let expected_players = (params.c_base as f64 / (params.daily_cap_early as f64 * 0.6)).max(10.0);
    let coins_per_player = if inputs.active_players > 0 {
        inputs.active_coins as f64 / inputs.active_players as f64
    } else {
        inputs.total_coins as f64 / expected_players
    };

    let coin_pressure = (coins_per_player / params.daily_cap_early as f64).max(0.0);
    let coin_mult = 1.0 + 0.55 * (1.0 + coin_pressure).ln();

    let time_mult = 1.0 + params.alpha * progress * progress;

    let late_spike = if progress <= 0.75 {
        1.0
    } else {
        1.0 + 0.6 * ((progress - 0.75) / 0.25).powf(params.beta)
    };

    let pressure = inputs.market_pressure.clamp(0.6, 1.8);

    let raw = params.p0 as f64 * scarcity * coin_mult * time_mult * late_spike * pressure;
    let afford_cap = (params.p0 as f64).max(0.9 * coins_per_player);

    raw.min(afford_cap).round() as i64
}

/// Per-view price: uses real active-population metrics, so different
/// observers may see momentarily different prices before the next floor
/// ratchet converges them.
pub fn star_price_per_view(
    state: &EconomyState,
    params: &CalibrationParams,
    inputs: PriceInputs,
) -> Microcoins {
    let price = raw_price(params, &inputs);
    Microcoins(state.apply_price_floor(price))
}

/// Season-authoritative price: forces `active_players = 0` so every observer
/// computes from the same total-coins/expected-players basis. Used for the
/// value persisted as `SeasonEconomy.current_star_price`.
pub fn star_price_authoritative(
    state: &EconomyState,
    params: &CalibrationParams,
    mut inputs: PriceInputs,
) -> Microcoins {
    inputs.active_players = 0;
    let price = raw_price(params, &inputs);
    Microcoins(state.apply_price_floor(price))
}
