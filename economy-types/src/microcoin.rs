// SPDX-License-Identifier: Apache-2.0, MIT
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Atomic integer unit; 1 coin = 1000 microcoins.
pub const MICROCOINS_PER_COIN: i64 = 1000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Microcoins(pub i64);

impl Microcoins {
    pub const ZERO: Microcoins = Microcoins(0);

    pub fn from_coins(coins: i64) -> Self {
        Microcoins(coins * MICROCOINS_PER_COIN)
    }

    pub fn coins(self) -> f64 {
        self.0 as f64 / MICROCOINS_PER_COIN as f64
    }

    pub fn max(self, other: Self) -> Self {
        Microcoins(self.0.max(other.0))
    }

    pub fn min(self, other: Self) -> Self {
        Microcoins(self.0.min(other.0))
    }
}

impl Add for Microcoins {
    type Output = Microcoins;
    fn add(self, rhs: Self) -> Self::Output {
        Microcoins(self.0 + rhs.0)
    }
}

impl Sub for Microcoins {
    type Output = Microcoins;
    fn sub(self, rhs: Self) -> Self::Output {
        Microcoins(self.0 - rhs.0)
    }
}
