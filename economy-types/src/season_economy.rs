// SPDX-License-Identifier: Apache-2.0, MIT
use serde::{Deserialize, Serialize};

use crate::ids::SeasonId;
use crate::microcoin::Microcoins;

/// Mutable, singleton-per-season economy ledger. Invariant: `coins_distributed <=
/// global_coin_pool`; `price_floor` only rises.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeasonEconomy {
    pub season_id: SeasonId,
    pub global_coin_pool: i64,
    pub coins_distributed: i64,
    pub emission_remainder: f64,
    pub market_pressure: f64,
    pub price_floor: i64,
    pub current_star_price: Microcoins,
    pub current_price_tick: i64,
    pub daily_emission_target: i64,
    /// Total stars ever sold this season; the pricing oracle's scarcity term.
    pub stars_sold: i64,
}

impl SeasonEconomy {
    pub fn new(season_id: SeasonId) -> Self {
        SeasonEconomy {
            season_id,
            global_coin_pool: 0,
            coins_distributed: 0,
            emission_remainder: 0.0,
            market_pressure: 1.0,
            price_floor: 0,
            current_star_price: Microcoins::ZERO,
            current_price_tick: 0,
            daily_emission_target: 0,
            stars_sold: 0,
        }
    }

    pub fn available_coins(&self) -> i64 {
        self.global_coin_pool - self.coins_distributed
    }
}
