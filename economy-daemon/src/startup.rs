// SPDX-License-Identifier: Apache-2.0, MIT
//! C10: schema bootstrap, calibration load-or-derive, and the alpha-phase
//! admin invariant check (spec.md §4.10). Serialized across replicas by a
//! Postgres advisory lock so exactly one process seeds a fresh database.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use economy_storage::{EconomyRepository, PgEconomyRepository};
use economy_types::{CalibrationParams, EconomyError, Phase, SeasonId};

use crate::config::Config;

/// Derives `currentSeasonID()` from an explicit override or the clock's
/// genesis time; spec.md leaves the exact scheme open, and a per-process
/// season is the only value the rest of the system needs to agree on.
pub fn current_season_id(config: &Config) -> SeasonId {
    if let Ok(id) = std::env::var("SEASON_ID") {
        if !id.trim().is_empty() {
            return SeasonId::from(id);
        }
    }
    SeasonId::from(format!(
        "season-{}",
        config.clock.genesis_time().format("%Y%m%d")
    ))
}

/// Runs every C10 step against an already-connected repository. Returns the
/// season's calibration, loaded or freshly derived and persisted.
pub async fn bootstrap(
    repo: &PgEconomyRepository,
    config: &Config,
    season_id: &SeasonId,
) -> anyhow::Result<CalibrationParams> {
    acquire_advisory_lock_with_retry(repo, config.advisory_lock_id).await?;
    let result = run_locked_bootstrap(repo, config, season_id).await;
    repo.advisory_unlock(config.advisory_lock_id).await?;
    result
}

async fn acquire_advisory_lock_with_retry(
    repo: &PgEconomyRepository,
    lock_id: i64,
) -> anyhow::Result<()> {
    loop {
        if repo.try_advisory_lock(lock_id).await? {
            return Ok(());
        }
        tracing::info!(lock_id, "bootstrap advisory lock held by another replica, retrying");
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
}

async fn run_locked_bootstrap(
    repo: &PgEconomyRepository,
    config: &Config,
    season_id: &SeasonId,
) -> anyhow::Result<CalibrationParams> {
    repo.ensure_schema().await?;
    repo.ensure_season_economy(season_id).await?;

    let params = match repo.load_calibration(season_id).await? {
        Some(params) => params,
        None => {
            let telemetry = repo.derive_telemetry_snapshot().await?;
            let params = season_calibration::calibrate_season(
                season_id.clone(),
                config.clock.genesis_time(),
                telemetry,
            );
            repo.save_calibration(&params).await?;
            params
        }
    };

    if config.clock.phase() == Phase::Alpha {
        check_bootstrap_admin_invariant(repo).await?;
    }

    Ok(params)
}

/// Refuses startup unless exactly one admin exists (spec.md §4.10: "refuse
/// startup if invariants are violated"). The richer invariant the spec names
/// (sealed bootstrap, locked admin) depends on admin/account state this
/// workspace's storage contract does not model; `admin_count` is the subset
/// this repository can check.
async fn check_bootstrap_admin_invariant(repo: &PgEconomyRepository) -> anyhow::Result<()> {
    let count = repo.admin_count().await?;
    if count != 1 {
        return Err(EconomyError::BootstrapInvariantViolated(format!(
            "expected exactly one bootstrap admin in alpha phase, found {count}"
        ))
        .into());
    }
    Ok(())
}

pub fn economy_state_from_loaded(
    season_id: &SeasonId,
    loaded: Option<economy_types::SeasonEconomy>,
) -> Arc<economy_state::EconomyState> {
    match loaded {
        Some(economy) => Arc::new(economy_state::EconomyState::load(economy)),
        None => Arc::new(economy_state::EconomyState::new(season_id.clone())),
    }
}

pub fn now() -> chrono::DateTime<Utc> {
    Utc::now()
}
