// SPDX-License-Identifier: Apache-2.0, MIT
use std::time::Duration;

use thiserror::Error;

/// Error kinds surfaced by the economy engine's public operations (spec §7).
#[derive(Debug, Error)]
pub enum EconomyError {
    #[error("coin pool exhausted")]
    PoolExhausted,

    #[error("daily earn cap reached")]
    DailyCapReached,

    #[error("cooldown active, retry in {remaining:?}")]
    CooldownActive { remaining: Duration },

    #[error("bootstrap invariant violated: {0}")]
    BootstrapInvariantViolated(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] sqlx::Error),

    #[error("{0}")]
    Other(String),
}

impl EconomyError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, EconomyError::StorageUnavailable(_))
    }
}

/// Startup/config-loading failures, kept distinct from runtime [`EconomyError`]
/// because they are always fatal (spec §4.10, §9 Open Question 1).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SEASON_START_UTC is required and was not set")]
    MissingSeasonStart,

    #[error("invalid RFC3339 timestamp in {var}: {source}")]
    InvalidTimestamp {
        var: &'static str,
        #[source]
        source: chrono::ParseError,
    },

    #[error("{var} extension requested without {reason_var}")]
    MissingExtensionReason {
        var: &'static str,
        reason_var: &'static str,
    },
}
