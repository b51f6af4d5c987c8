// SPDX-License-Identifier: Apache-2.0, MIT
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, PlayerId, SeasonId};

/// Severity is a pure function of score (tiers 10/25/45); see [`severity_for_score`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Severity {
    None = 0,
    Low = 1,
    Medium = 2,
    High = 3,
}

impl Severity {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Severity::None,
            1 => Severity::Low,
            2 => Severity::Medium,
            _ => Severity::High,
        }
    }
}

/// `severity = f(score)`, tiers at 10/25/45.
pub fn severity_for_score(score: f64) -> Severity {
    if score >= 45.0 {
        Severity::High
    } else if score >= 25.0 {
        Severity::Medium
    } else if score >= 10.0 {
        Severity::Low
    } else {
        Severity::None
    }
}

/// Score/hour decay rate for a given severity tier.
pub fn decay_rate_per_hour(severity: Severity) -> f64 {
    match severity {
        Severity::High => 0.15,
        Severity::Medium => 0.3,
        Severity::Low => 0.6,
        Severity::None => 1.0,
    }
}

/// Persistence-window duration for a given severity tier; zero outside {2,3}.
pub fn persistent_duration_hours(severity: Severity) -> i64 {
    match severity {
        Severity::High => 7 * 24,
        Severity::Medium => 72,
        _ => 0,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerAbuseState {
    pub player_id: PlayerId,
    pub season_id: SeasonId,
    pub score: f64,
    pub severity: Severity,
    pub last_signal_at: Option<DateTime<Utc>>,
    pub last_decay_at: DateTime<Utc>,
    pub persistent_until: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountAbuseReputation {
    pub account_id: AccountId,
    pub score: f64,
    pub severity: Severity,
    pub last_signal_at: Option<DateTime<Utc>>,
    pub last_decay_at: DateTime<Utc>,
    pub persistent_until: Option<DateTime<Utc>>,
}

/// Append-only audit row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbuseEvent {
    pub account_id: Option<AccountId>,
    pub player_id: PlayerId,
    pub season_id: SeasonId,
    pub event_type: String,
    pub severity: Severity,
    pub score_delta: f64,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A detector's raw output before it is applied to player/account state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbuseSignal {
    pub player_id: PlayerId,
    pub event_type: String,
    pub delta: f64,
    pub severity: Severity,
    pub details: serde_json::Value,
}

/// Derived (never stored) enforcement for a player, combining season and
/// account-reputation scores.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbuseEnforcement {
    pub score: f64,
    pub severity: Severity,
    pub price_multiplier: f64,
    pub max_bulk_qty: i64,
    pub earn_multiplier: f64,
    pub cooldown_jitter_factor: f64,
}

impl Severity {
    /// Enforcement matrix row for this severity, clamped against `base_max_bulk`.
    pub fn enforcement(self, score: f64, base_max_bulk: i64) -> AbuseEnforcement {
        let (price_multiplier, max_bulk_cap, earn_multiplier, cooldown_jitter_factor) = match self
        {
            Severity::None => (1.00, i64::MAX, 1.00, 0.0),
            Severity::Low => (1.05, 4, 0.90, 0.10),
            Severity::Medium => (1.15, 3, 0.75, 0.25),
            Severity::High => (1.30, 2, 0.60, 0.50),
        };
        let max_bulk_qty = base_max_bulk.min(max_bulk_cap).max(1);
        AbuseEnforcement {
            score,
            severity: self,
            price_multiplier,
            max_bulk_qty,
            earn_multiplier,
            cooldown_jitter_factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_tiers_match_thresholds() {
        assert_eq!(severity_for_score(0.0), Severity::None);
        assert_eq!(severity_for_score(9.999), Severity::None);
        assert_eq!(severity_for_score(10.0), Severity::Low);
        assert_eq!(severity_for_score(24.999), Severity::Low);
        assert_eq!(severity_for_score(25.0), Severity::Medium);
        assert_eq!(severity_for_score(44.999), Severity::Medium);
        assert_eq!(severity_for_score(45.0), Severity::High);
    }

    #[test]
    fn enforcement_max_bulk_floors_at_one() {
        let e = Severity::High.enforcement(50.0, 1);
        assert_eq!(e.max_bulk_qty, 1);
    }

    #[test]
    fn enforcement_respects_base_cap_below_matrix_cap() {
        let e = Severity::Low.enforcement(12.0, 2);
        assert_eq!(e.max_bulk_qty, 2);
    }
}
