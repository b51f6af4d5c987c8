// SPDX-License-Identifier: Apache-2.0, MIT

//! C1: monotonic UTC clock, season start/end, and progress arithmetic.
//!
//! Unlike the historical Go reference (a process-wide `sync.Once`), the clock
//! here is an explicit, owned value constructed once at startup and threaded
//! by reference into every component that needs it (spec.md §9 design note:
//! "avoid singletons; make the dependency explicit").

use chrono::{DateTime, Duration, Utc};
use economy_types::{ConfigError, Phase};

const ALPHA_SEASON_LENGTH_DAYS: i64 = 14;
const ALPHA_SEASON_MAX_DAYS: i64 = 21;
const BETA_SEASON_LENGTH_DAYS: i64 = 28;
const RELEASE_SEASON_LENGTH_DAYS: i64 = 28;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AlphaExtension {
    pub days: i64,
    pub reason: &'static str,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SeasonClock {
    start: DateTime<Utc>,
    phase: Phase,
    alpha_extension_days: Option<i64>,
}

impl SeasonClock {
    pub fn new(start: DateTime<Utc>, phase: Phase, alpha_extension_days: Option<i64>) -> Self {
        SeasonClock {
            start,
            phase,
            alpha_extension_days,
        }
    }

    /// Builds the clock from `SEASON_START_UTC`, `PHASE`,
    /// `ALPHA_SEASON_EXTENSION_DAYS` and `ALPHA_SEASON_EXTENSION_REASON`.
    /// Refuses to start without an explicit season start (spec.md §9, Open
    /// Question 1): the historical `now - 21d` fallback is not reachable here.
    pub fn from_env() -> Result<Self, ConfigError> {
        let start_raw =
            std::env::var("SEASON_START_UTC").map_err(|_| ConfigError::MissingSeasonStart)?;
        let start = DateTime::parse_from_rfc3339(start_raw.trim())
            .map_err(|source| ConfigError::InvalidTimestamp {
                var: "SEASON_START_UTC",
                source,
            })?
            .with_timezone(&Utc);

        let phase = std::env::var("PHASE")
            .ok()
            .and_then(|v| v.parse::<Phase>().ok())
            .unwrap_or_default();

        let alpha_extension_days = alpha_extension_from_env()?;

        Ok(SeasonClock::new(start, phase, alpha_extension_days))
    }

    /// Historical fallback (`now - 21d`) for test harnesses only. Never
    /// reachable from the production startup path.
    #[cfg(any(test, feature = "test-fallback"))]
    pub fn from_env_with_test_fallback() -> Result<Self, ConfigError> {
        match Self::from_env() {
            Ok(clock) => Ok(clock),
            Err(ConfigError::MissingSeasonStart) => Ok(SeasonClock::new(
                Utc::now() - Duration::days(21),
                Phase::Alpha,
                None,
            )),
            Err(other) => Err(other),
        }
    }

    pub fn genesis_time(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn season_length(&self) -> Duration {
        match self.phase {
            Phase::Beta => Duration::days(BETA_SEASON_LENGTH_DAYS),
            Phase::Release => Duration::days(RELEASE_SEASON_LENGTH_DAYS),
            Phase::Alpha => self.alpha_season_length(),
        }
    }

    fn alpha_season_length(&self) -> Duration {
        let mut length_days = ALPHA_SEASON_LENGTH_DAYS;
        if let Some(extension_days) = self.alpha_extension_days {
            let extension_days = extension_days.min(ALPHA_SEASON_MAX_DAYS);
            if extension_days > length_days {
                length_days = extension_days;
            }
        }
        Duration::days(length_days)
    }

    pub fn season_end(&self) -> DateTime<Utc> {
        self.start + self.season_length()
    }

    pub fn is_season_ended(&self, now: DateTime<Utc>) -> bool {
        now >= self.season_end()
    }

    pub fn season_seconds_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.season_end() - now).num_seconds().max(0)
    }

    /// `clamp((now - start) / length, 0, 1)`.
    pub fn season_progress(&self, now: DateTime<Utc>) -> f64 {
        let length_seconds = self.season_length().num_seconds() as f64;
        if length_seconds <= 0.0 {
            return 0.0;
        }
        let elapsed_seconds = (now - self.start).num_seconds() as f64;
        (elapsed_seconds / length_seconds).clamp(0.0, 1.0)
    }

    /// `floor((t - start) / 24h)`, clamped to 0 before start.
    pub fn season_day_index(&self, t: DateTime<Utc>) -> i64 {
        if t < self.start {
            return 0;
        }
        (t - self.start).num_hours() / 24
    }
}

fn alpha_extension_from_env() -> Result<Option<i64>, ConfigError> {
    let Ok(days_raw) = std::env::var("ALPHA_SEASON_EXTENSION_DAYS") else {
        return Ok(None);
    };
    let days_raw = days_raw.trim();
    if days_raw.is_empty() {
        return Ok(None);
    }
    let reason = std::env::var("ALPHA_SEASON_EXTENSION_REASON").unwrap_or_default();
    if reason.trim().is_empty() {
        return Err(ConfigError::MissingExtensionReason {
            var: "ALPHA_SEASON_EXTENSION_DAYS",
            reason_var: "ALPHA_SEASON_EXTENSION_REASON",
        });
    }
    let days: i64 = days_raw
        .parse()
        .ok()
        .filter(|d| *d > 0)
        .unwrap_or(ALPHA_SEASON_LENGTH_DAYS);
    Ok(Some(days))
}
