// SPDX-License-Identifier: Apache-2.0, MIT
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::PlayerId;

/// Player wallet, owned by external storage. Mirrored here for the surface the
/// economy engine reads and writes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerWallet {
    pub player_id: PlayerId,
    pub coins: i64,
    pub stars: i64,
    pub daily_earn_total: i64,
    pub last_earn_reset_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub activity_warmup_level: f64,
    pub activity_warmup_updated_at: DateTime<Utc>,
    pub recent_activity_seconds: i64,
    pub drip_multiplier: f64,
    pub drip_paused: bool,
    pub is_bot: bool,
}

/// `(player_id, faucet_key) -> (last_claim_at, claim_count)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaucetClaim {
    pub player_id: PlayerId,
    pub faucet_key: FaucetKey,
    pub last_claim_at: DateTime<Utc>,
    pub claim_count: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaucetKey {
    Passive,
    Daily,
    Activity,
    Login,
    Ubi,
}

impl FaucetKey {
    pub fn as_str(self) -> &'static str {
        match self {
            FaucetKey::Passive => "passive",
            FaucetKey::Daily => "daily",
            FaucetKey::Activity => "activity",
            FaucetKey::Login => "login",
            FaucetKey::Ubi => "ubi",
        }
    }
}
