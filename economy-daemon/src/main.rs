// SPDX-License-Identifier: Apache-2.0, MIT
//! Process entry point: tracing init, C10 bootstrap, then the tick worker
//! runs until a shutdown signal arrives.

mod config;
mod startup;

use std::sync::Arc;

use economy_storage::{DedupingSink, EconomyRepository, PgEconomyRepository, TracingNotificationSink};
use economy_tick::{TickCoordinator, TickMetrics};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

fn init_tracing() -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::daily("logs", "economy-daemon.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .json()
        .init();

    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _tracing_guard = init_tracing();

    let config = Config::from_env()?;
    let repo = Arc::new(PgEconomyRepository::connect(&config.database_url).await?);
    let season_id = startup::current_season_id(&config);

    tracing::info!(season_id = %season_id, phase = %config.clock.phase(), "starting bootstrap");
    let params = startup::bootstrap(&repo, &config, &season_id).await?;

    let loaded_economy = repo.load_season_economy(&season_id).await?;
    let state = startup::economy_state_from_loaded(&season_id, loaded_economy);
    state.set_calibration(&params);

    let sink = Arc::new(DedupingSink::new(TracingNotificationSink));
    let mut registry = prometheus_client::registry::Registry::default();
    let metrics = Arc::new(TickMetrics::new(&mut registry));

    let coordinator = Arc::new(TickCoordinator::new(
        repo,
        state,
        config.clock.clone(),
        params,
        config.flags,
        sink,
        metrics,
        config.abuse_include_bots,
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let tick_handle = tokio::spawn(coordinator.run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    tracing::info!("received shutdown signal");
    shutdown_tx.send(true).ok();
    tick_handle.await?;

    tracing::info!("economy-daemon exiting");
    Ok(())
}
