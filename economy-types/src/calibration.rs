// SPDX-License-Identifier: Apache-2.0, MIT
use serde::{Deserialize, Serialize};

use crate::ids::SeasonId;

/// Deterministic per-season parameter fit. Immutable after first persist.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParams {
    pub season_id: SeasonId,
    pub seed: i64,
    pub p0: i64,
    pub c_base: i64,
    pub alpha: f64,
    pub s_scale: f64,
    pub g_scale: f64,
    pub beta: f64,
    pub gamma: f64,
    pub daily_login_reward: i64,
    pub daily_login_cooldown_hours: i64,
    pub activity_reward: i64,
    pub activity_cooldown_seconds: i64,
    pub daily_cap_early: i64,
    pub daily_cap_late: i64,
    pub passive_active_interval_seconds: i64,
    pub passive_idle_interval_seconds: i64,
    pub passive_active_amount: i64,
    pub passive_idle_amount: i64,
    pub hope_threshold: f64,
}

/// Snapshot of population activity used to derive [`CalibrationParams`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub active_players_24h: i64,
    pub active_players_7d: i64,
    pub telemetry_7d: i64,
}
