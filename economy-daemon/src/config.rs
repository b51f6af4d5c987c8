// SPDX-License-Identifier: Apache-2.0, MIT
//! Environment-driven configuration (spec.md §6). No `config`/`figment`
//! dependency in the teacher's own stack, so this is hand-parsed the way
//! `forest/src/logger/mod.rs` reads its own env vars.

use economy_types::{ConfigError, FeatureFlags};
use season_clock::SeasonClock;

/// `pg_try_advisory_lock` id used to serialize C10 bootstrap across
/// replicas. Arbitrary but fixed so every replica contends for the same
/// lock.
const DEFAULT_ADVISORY_LOCK_ID: i64 = 0x45434f4e4f4d59; // "ECONOMY" in hex, truncated to fit i64

pub struct Config {
    pub database_url: String,
    pub advisory_lock_id: i64,
    pub flags: FeatureFlags,
    pub abuse_include_bots: bool,
    pub clock: SeasonClock,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/economy".to_string());
        let advisory_lock_id = std::env::var("ADVISORY_LOCK_ID")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_ADVISORY_LOCK_ID);
        let abuse_include_bots = env_bool("ABUSE_INCLUDE_BOTS", false);
        let flags = FeatureFlags::from_env();
        let clock = SeasonClock::from_env()?;

        Ok(Config {
            database_url,
            advisory_lock_id,
            flags,
            abuse_include_bots,
            clock,
        })
    }
}

fn env_bool(name: &str, fallback: bool) -> bool {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => {
            matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
        }
        _ => fallback,
    }
}
