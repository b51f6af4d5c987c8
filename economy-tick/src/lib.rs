// SPDX-License-Identifier: Apache-2.0, MIT
//! C9: the 60-second economy heartbeat (spec.md §4.9). Leader election,
//! season finalization, emission, market pressure, abuse monitoring and UBI
//! all run from here each minute; the coordinator owns nothing storage
//! doesn't already own — it is reconstructed from `Load`ed state at startup
//! (spec.md §9 design note: no singletons).

pub mod emission;
pub mod finalize;
pub mod metrics;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use abuse_engine::{default_detectors, DetectorOptions, SignalDetector};
use chrono::{DateTime, Utc};
use economy_state::EconomyState;
use economy_storage::{DedupingSink, EconomyRepository, NotificationSink};
use economy_types::{
    CalibrationParams, EconomyError, FeatureFlags, Notification, NotificationPriority, SeasonId,
};
use pricing_oracle::{star_price_authoritative, PriceInputs};
use season_clock::SeasonClock;

pub use metrics::TickMetrics;

/// How often `persist_season_economy` runs relative to successful ticks
/// (spec.md §4.9 step 9).
const PERSIST_EVERY_N_TICKS: u64 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// This replica lost leader election; no economy mutation happened.
    Follower,
    /// The season has ended; the tick body was skipped in favor of the
    /// (idempotent) finalizer.
    SeasonEnded,
    /// This replica ran the full tick body.
    Leader,
}

/// Owns everything one replica's tick loop needs. Constructed once at
/// startup from loaded calibration and economy state, then driven by
/// [`TickCoordinator::run`].
pub struct TickCoordinator<R, S> {
    repo: Arc<R>,
    state: Arc<EconomyState>,
    clock: SeasonClock,
    params: CalibrationParams,
    flags: FeatureFlags,
    sink: Arc<DedupingSink<S>>,
    metrics: Arc<TickMetrics>,
    detectors: Vec<Box<dyn SignalDetector>>,
    include_bots: bool,
    successful_ticks: AtomicU64,
}

impl<R, S> TickCoordinator<R, S>
where
    R: EconomyRepository,
    S: NotificationSink,
{
    pub fn new(
        repo: Arc<R>,
        state: Arc<EconomyState>,
        clock: SeasonClock,
        params: CalibrationParams,
        flags: FeatureFlags,
        sink: Arc<DedupingSink<S>>,
        metrics: Arc<TickMetrics>,
        include_bots: bool,
    ) -> Self {
        TickCoordinator {
            repo,
            state,
            clock,
            params,
            flags,
            sink,
            metrics,
            detectors: default_detectors(),
            include_bots,
            successful_ticks: AtomicU64::new(0),
        }
    }

    fn season_id(&self) -> &SeasonId {
        &self.params.season_id
    }

    /// Runs the tick loop at a 60s cadence until `shutdown` fires. Missed
    /// ticks (e.g. after a GC pause) are coalesced rather than replayed back
    /// to back (spec.md §5: the tick worker blocks on its timer).
    pub async fn run(self: Arc<Self>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(60));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Utc::now();
                    match self.run_tick(now).await {
                        Ok(outcome) => tracing::debug!(?outcome, "tick completed"),
                        Err(err) if err.is_retryable() => {
                            tracing::warn!(error = %err, "tick skipped: storage unavailable");
                        }
                        Err(err) => tracing::error!(error = %err, "tick body failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("tick loop shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One full tick (spec.md §4.9 steps 1-9). Public so callers (and tests)
    /// can drive individual ticks without the 60s wall-clock wrapper.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> Result<TickOutcome, EconomyError> {
        let span = tracing::info_span!("economy_tick", season_id = %self.season_id(), tick_time = %now.to_rfc3339());
        let _entered = span.enter();
        let started = Instant::now();

        // Step 1: leader election via compare-and-swap on the heartbeat row.
        if !self.repo.cas_tick_heartbeat(now).await? {
            self.metrics.record_outcome("follower");
            return Ok(TickOutcome::Follower);
        }

        // Step 2: season-end check short-circuits all economy work.
        if self.clock.is_season_ended(now) {
            finalize::finalize_season_if_needed(
                self.repo.as_ref(),
                &self.state,
                &self.sink,
                self.season_id(),
                now,
            )
            .await?;
            self.metrics.record_outcome("season_ended");
            return Ok(TickOutcome::SeasonEnded);
        }

        // Step 3: refresh coinsInWallets.
        let coins_in_wallets = self.repo.sum_wallet_coins().await?;
        let progress = self.clock.season_progress(now);

        // Step 4: effective emission target, throttle alert on starvation.
        let effective_emission =
            emission::effective_daily_emission_target(&self.params, progress, coins_in_wallets);
        if emission::is_emission_throttled(effective_emission, self.params.c_base) {
            self.metrics.emission_throttled_total.inc();
            self.notify_emission_throttle(now, effective_emission).await;
        }

        // Step 5: accrue the per-minute fractional share, mint the integer part.
        let minted = self.state.accrue_emission(effective_emission as f64 / 1440.0);
        if minted > 0 {
            tracing::debug!(minted, "minted coins into global pool");
        }

        // Step 6: market pressure feedback.
        let pressure = if self.flags.sinks_enabled {
            market_pressure::update_market_pressure_tick(
                self.repo.as_ref(),
                &self.state,
                self.season_id(),
                now,
            )
            .await?
        } else {
            self.state.market_pressure()
        };
        self.metrics.market_pressure.set(pressure);

        // Step 7: abuse decay, signal collection, application.
        let tick_id = now.timestamp().div_euclid(60);
        let detector_options = DetectorOptions {
            include_bots: self.include_bots,
            tick_id,
        };
        let applied = abuse_engine::update_abuse_monitoring(
            self.repo.as_ref(),
            self.season_id(),
            &self.detectors,
            now,
            &detector_options,
        )
        .await?;
        self.metrics.abuse_signals_applied_total.inc_by(applied as u64);

        // Step 8: universal basic income, warmup-scaled, cap-exempt.
        if self.flags.faucets_enabled {
            let outcome = economy_faucets::distribute_universal_basic_income(
                self.repo.as_ref(),
                &self.state,
                now,
                1.0,
            )
            .await?;
            self.metrics
                .ubi_players_granted_total
                .inc_by(outcome.players_granted);
            if outcome.pool_exhausted {
                self.metrics.pool_exhausted_total.inc();
            }
        }

        // Season-authoritative price snapshot, for observers that want a
        // single agreed-upon value rather than the per-view variant.
        let inputs = PriceInputs {
            stars_sold: self.state.stars_sold(),
            total_coins: coins_in_wallets,
            active_coins: 0,
            active_players: 0,
            remaining_seconds: self.clock.season_seconds_remaining(now),
            season_length_seconds: self.clock.season_length().num_seconds(),
            market_pressure: pressure,
        };
        let price = star_price_authoritative(&self.state, &self.params, inputs);
        self.state.set_current_star_price(price);
        self.state.set_current_price_tick(tick_id);
        self.metrics.star_price_microcoins.set(price.0);
        self.metrics
            .coin_pool_available
            .set(self.state.available_coins());

        // Step 9: persist every 5th successful tick.
        let tick_count = self.successful_ticks.fetch_add(1, Ordering::SeqCst) + 1;
        if tick_count % PERSIST_EVERY_N_TICKS == 0 {
            self.repo.persist_season_economy(&self.state.snapshot()).await?;
        }

        self.metrics.record_outcome("leader");
        self.metrics
            .tick_duration_seconds
            .observe(started.elapsed().as_secs_f64());
        Ok(TickOutcome::Leader)
    }

    async fn notify_emission_throttle(&self, now: DateTime<Utc>, effective: i64) {
        self.sink
            .send_at(
                Notification {
                    role: "ops".to_string(),
                    category: "economy".to_string(),
                    kind: "emission_throttle".to_string(),
                    priority: NotificationPriority::Normal,
                    message: format!(
                        "emission throttled to {effective} (base {})",
                        self.params.c_base
                    ),
                    payload: serde_json::json!({
                        "season_id": self.season_id().as_str(),
                        "effective_daily_emission": effective,
                        "c_base": self.params.c_base,
                    }),
                    dedup_key: format!("emission_throttle:{}", self.season_id()),
                    dedup_window_seconds: 3600,
                },
                now,
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use economy_storage::StorageError;
    use economy_types::{
        AbuseEvent, AccountAbuseReputation, AccountId, FaucetKey, PlayerAbuseState, PlayerId,
        PlayerWallet, SeasonEconomy, TelemetrySnapshot,
    };
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Minimal in-memory repository exercising the parts of the tick body
    /// that don't require a live Postgres instance: leader election via a
    /// single shared heartbeat string, an empty player set, and no abuse
    /// history. Good enough to prove the tick's control flow (leader/
    /// follower/season-ended branching, emission accrual, price snapshot).
    #[derive(Default)]
    struct FakeRepo {
        heartbeat: Mutex<Option<String>>,
        season_ended_snapshot: Mutex<bool>,
        wallet_coins: Mutex<i64>,
    }

    #[async_trait]
    impl EconomyRepository for FakeRepo {
        async fn ensure_schema(&self) -> Result<(), StorageError> {
            Ok(())
        }
        async fn try_advisory_lock(&self, _lock_id: i64) -> Result<bool, StorageError> {
            Ok(true)
        }
        async fn advisory_unlock(&self, _lock_id: i64) -> Result<(), StorageError> {
            Ok(())
        }
        async fn load_calibration(
            &self,
            _season_id: &SeasonId,
        ) -> Result<Option<CalibrationParams>, StorageError> {
            Ok(None)
        }
        async fn save_calibration(&self, _params: &CalibrationParams) -> Result<(), StorageError> {
            Ok(())
        }
        async fn derive_telemetry_snapshot(&self) -> Result<TelemetrySnapshot, StorageError> {
            Ok(TelemetrySnapshot::default())
        }
        async fn ensure_season_economy(&self, _season_id: &SeasonId) -> Result<(), StorageError> {
            Ok(())
        }
        async fn load_season_economy(
            &self,
            _season_id: &SeasonId,
        ) -> Result<Option<SeasonEconomy>, StorageError> {
            Ok(None)
        }
        async fn persist_season_economy(&self, _economy: &SeasonEconomy) -> Result<(), StorageError> {
            Ok(())
        }
        async fn sum_wallet_coins(&self) -> Result<i64, StorageError> {
            Ok(*self.wallet_coins.lock())
        }
        async fn cas_tick_heartbeat(&self, now: DateTime<Utc>) -> Result<bool, StorageError> {
            let mut guard = self.heartbeat.lock();
            let now_str = now.to_rfc3339();
            let won = match guard.as_ref() {
                Some(existing) => existing.as_str() < now_str.as_str(),
                None => true,
            };
            if won {
                *guard = Some(now_str);
            }
            Ok(won)
        }
        async fn purchase_count_since(
            &self,
            _season_id: &SeasonId,
            _since: DateTime<Utc>,
        ) -> Result<i64, StorageError> {
            Ok(0)
        }
        async fn player_wallet(
            &self,
            _player_id: &PlayerId,
        ) -> Result<Option<PlayerWallet>, StorageError> {
            Ok(None)
        }
        async fn list_all_players(&self) -> Result<Vec<PlayerWallet>, StorageError> {
            Ok(vec![])
        }
        async fn update_activity_warmup(
            &self,
            _player_id: &PlayerId,
            _warmup_level: f64,
            _updated_at: DateTime<Utc>,
            _recent_activity_seconds: i64,
        ) -> Result<(), StorageError> {
            Ok(())
        }
        async fn reset_daily_earn(&self, _player_id: &PlayerId, _now: DateTime<Utc>) -> Result<(), StorageError> {
            Ok(())
        }
        async fn daily_earn_total(&self, _player_id: &PlayerId) -> Result<i64, StorageError> {
            Ok(0)
        }
        async fn grant_coins(
            &self,
            _player_id: &PlayerId,
            _amount: i64,
            _now: DateTime<Utc>,
            _track_daily_earn: bool,
        ) -> Result<(), StorageError> {
            Ok(())
        }
        async fn faucet_last_claim(
            &self,
            _player_id: &PlayerId,
            _key: FaucetKey,
        ) -> Result<Option<DateTime<Utc>>, StorageError> {
            Ok(None)
        }
        async fn record_faucet_claim(
            &self,
            _player_id: &PlayerId,
            _key: FaucetKey,
            _now: DateTime<Utc>,
        ) -> Result<(), StorageError> {
            Ok(())
        }
        async fn player_abuse_state(
            &self,
            _player_id: &PlayerId,
            _season_id: &SeasonId,
        ) -> Result<Option<PlayerAbuseState>, StorageError> {
            Ok(None)
        }
        async fn upsert_player_abuse_state(
            &self,
            _state: &PlayerAbuseState,
        ) -> Result<(), StorageError> {
            Ok(())
        }
        async fn all_player_abuse_states(
            &self,
            _season_id: &SeasonId,
        ) -> Result<Vec<PlayerAbuseState>, StorageError> {
            Ok(vec![])
        }
        async fn account_abuse_reputation(
            &self,
            _account_id: &AccountId,
        ) -> Result<Option<AccountAbuseReputation>, StorageError> {
            Ok(None)
        }
        async fn upsert_account_abuse_reputation(
            &self,
            _reputation: &AccountAbuseReputation,
        ) -> Result<(), StorageError> {
            Ok(())
        }
        async fn all_account_abuse_reputations(
            &self,
        ) -> Result<Vec<AccountAbuseReputation>, StorageError> {
            Ok(vec![])
        }
        async fn account_id_for_player(
            &self,
            _player_id: &PlayerId,
        ) -> Result<Option<AccountId>, StorageError> {
            Ok(None)
        }
        async fn is_bot(&self, _player_id: &PlayerId) -> Result<bool, StorageError> {
            Ok(false)
        }
        async fn append_abuse_event(&self, _event: &AbuseEvent) -> Result<(), StorageError> {
            Ok(())
        }
        async fn purchase_counts_by_player(
            &self,
            _since: DateTime<Utc>,
            _include_bots: bool,
            _min_count: i64,
        ) -> Result<Vec<(PlayerId, i64)>, StorageError> {
            Ok(vec![])
        }
        async fn purchase_timestamps_by_player(
            &self,
            _since: DateTime<Utc>,
            _include_bots: bool,
        ) -> Result<HashMap<PlayerId, Vec<DateTime<Utc>>>, StorageError> {
            Ok(HashMap::new())
        }
        async fn activity_timestamps_by_player(
            &self,
            _since: DateTime<Utc>,
            _include_bots: bool,
        ) -> Result<HashMap<PlayerId, Vec<DateTime<Utc>>>, StorageError> {
            Ok(HashMap::new())
        }
        async fn tick_edge_purchase_counts(
            &self,
            _since: DateTime<Utc>,
            _include_bots: bool,
            _min_count: i64,
        ) -> Result<Vec<(PlayerId, i64)>, StorageError> {
            Ok(vec![])
        }
        async fn ip_purchase_clusters(
            &self,
            _since: DateTime<Utc>,
            _ip_last_seen_since: DateTime<Utc>,
            _include_bots: bool,
            _min_distinct_players: i64,
        ) -> Result<Vec<(String, i64, Vec<PlayerId>)>, StorageError> {
            Ok(vec![])
        }
        async fn admin_count(&self) -> Result<i64, StorageError> {
            Ok(0)
        }
        async fn emit_notification(&self, _notification: &Notification) -> Result<(), StorageError> {
            Ok(())
        }
        async fn has_season_end_snapshot(&self, _season_id: &SeasonId) -> Result<bool, StorageError> {
            Ok(*self.season_ended_snapshot.lock())
        }
        async fn write_season_end_snapshot(
            &self,
            _season_id: &SeasonId,
            _snapshot: serde_json::Value,
        ) -> Result<(), StorageError> {
            *self.season_ended_snapshot.lock() = true;
            Ok(())
        }
    }

    fn sample_params() -> CalibrationParams {
        CalibrationParams {
            season_id: SeasonId::from("season-1"),
            seed: 1,
            p0: 23,
            c_base: 1800,
            alpha: 2.6,
            s_scale: 100.0,
            g_scale: 4500.0,
            beta: 2.4,
            gamma: 0.08,
            daily_login_reward: 12,
            daily_login_cooldown_hours: 20,
            activity_reward: 2,
            activity_cooldown_seconds: 360,
            daily_cap_early: 51,
            daily_cap_late: 18,
            passive_active_interval_seconds: 90,
            passive_idle_interval_seconds: 240,
            passive_active_amount: 1,
            passive_idle_amount: 1,
            hope_threshold: 0.22,
        }
    }

    fn coordinator(
        repo: Arc<FakeRepo>,
    ) -> TickCoordinator<FakeRepo, economy_storage::TracingNotificationSink> {
        let params = sample_params();
        let state = Arc::new(EconomyState::new(params.season_id.clone()));
        state.set_calibration(&params);
        let mut registry = prometheus_client::registry::Registry::default();
        TickCoordinator::new(
            repo,
            state,
            SeasonClock::new(Utc::now() - chrono::Duration::days(3), economy_types::Phase::Beta, None),
            params,
            FeatureFlags::default(),
            Arc::new(DedupingSink::new(economy_storage::TracingNotificationSink)),
            Arc::new(TickMetrics::new(&mut registry)),
            false,
        )
    }

    #[tokio::test]
    async fn second_replica_loses_leader_election_for_same_instant() {
        let repo = Arc::new(FakeRepo::default());
        let coordinator_a = coordinator(repo.clone());
        let coordinator_b = coordinator(repo.clone());
        let now = Utc::now();

        let outcome_a = coordinator_a.run_tick(now).await.unwrap();
        let outcome_b = coordinator_b.run_tick(now).await.unwrap();

        assert_eq!(outcome_a, TickOutcome::Leader);
        assert_eq!(outcome_b, TickOutcome::Follower);
    }

    #[tokio::test]
    async fn season_ended_skips_economy_work_and_is_idempotent() {
        let repo = Arc::new(FakeRepo::default());
        let params = sample_params();
        let state = Arc::new(EconomyState::new(params.season_id.clone()));
        state.set_calibration(&params);
        let mut registry = prometheus_client::registry::Registry::default();
        let coordinator = TickCoordinator::new(
            repo.clone(),
            state.clone(),
            SeasonClock::new(Utc::now() - chrono::Duration::days(40), economy_types::Phase::Beta, None),
            params,
            FeatureFlags::default(),
            Arc::new(DedupingSink::new(economy_storage::TracingNotificationSink)),
            Arc::new(TickMetrics::new(&mut registry)),
            false,
        );

        let now = Utc::now();
        let pool_before = state.snapshot().global_coin_pool;
        let outcome = coordinator.run_tick(now).await.unwrap();
        assert_eq!(outcome, TickOutcome::SeasonEnded);
        assert_eq!(state.snapshot().global_coin_pool, pool_before);
        assert!(*repo.season_ended_snapshot.lock());

        // Running again a minute later must not error or double-write.
        let outcome_again = coordinator
            .run_tick(now + chrono::Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(outcome_again, TickOutcome::SeasonEnded);
    }

    #[tokio::test]
    async fn leader_tick_mints_coins_and_sets_authoritative_price() {
        let repo = Arc::new(FakeRepo::default());
        let coordinator = coordinator(repo);
        let now = Utc::now();

        let outcome = coordinator.run_tick(now).await.unwrap();
        assert_eq!(outcome, TickOutcome::Leader);
        assert!(coordinator.state.snapshot().global_coin_pool > 0);
        assert!(coordinator.state.current_star_price().0 >= coordinator.params.p0);
    }
}
