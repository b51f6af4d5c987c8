// SPDX-License-Identifier: Apache-2.0, MIT

pub mod abuse;
pub mod calibration;
pub mod error;
pub mod feature_flags;
pub mod ids;
pub mod microcoin;
pub mod notification;
pub mod phase;
pub mod player;
pub mod season_economy;

pub use abuse::{
    decay_rate_per_hour, persistent_duration_hours, severity_for_score, AbuseEnforcement,
    AbuseEvent, AbuseSignal, AccountAbuseReputation, PlayerAbuseState, Severity,
};
pub use calibration::{CalibrationParams, TelemetrySnapshot};
pub use error::{ConfigError, EconomyError};
pub use feature_flags::FeatureFlags;
pub use ids::{AccountId, PlayerId, SeasonId};
pub use microcoin::Microcoins;
pub use notification::{Notification, NotificationPriority};
pub use phase::Phase;
pub use player::{FaucetClaim, FaucetKey, PlayerWallet};
pub use season_economy::SeasonEconomy;
