// SPDX-License-Identifier: Apache-2.0, MIT
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use economy_types::{
    AbuseEvent, AccountAbuseReputation, AccountId, CalibrationParams, FaucetKey, Notification,
    PlayerAbuseState, PlayerId, PlayerWallet, SeasonEconomy, SeasonId, TelemetrySnapshot,
};

use crate::error::StorageError;

/// Storage contract (spec.md §6). Implementations are expected to provide
/// upsert-on-conflict semantics, advisory locking, server time, rank
/// aggregates and interval arithmetic; the concrete relational schema is an
/// external collaborator and not owned by this crate beyond the idempotent
/// `CREATE TABLE IF NOT EXISTS` statements in [`crate::ddl`].
#[async_trait]
pub trait EconomyRepository: Send + Sync {
    async fn ensure_schema(&self) -> Result<(), StorageError>;

    /// `pg_try_advisory_lock`-style singleton coordinator (spec.md §4.10, §9).
    async fn try_advisory_lock(&self, lock_id: i64) -> Result<bool, StorageError>;
    async fn advisory_unlock(&self, lock_id: i64) -> Result<(), StorageError>;

    async fn load_calibration(
        &self,
        season_id: &SeasonId,
    ) -> Result<Option<CalibrationParams>, StorageError>;
    /// `INSERT ... ON CONFLICT DO NOTHING`; first writer wins.
    async fn save_calibration(&self, params: &CalibrationParams) -> Result<(), StorageError>;
    async fn derive_telemetry_snapshot(&self) -> Result<TelemetrySnapshot, StorageError>;

    async fn ensure_season_economy(&self, season_id: &SeasonId) -> Result<(), StorageError>;
    async fn load_season_economy(
        &self,
        season_id: &SeasonId,
    ) -> Result<Option<SeasonEconomy>, StorageError>;
    /// `ON CONFLICT (season_id) DO UPDATE`.
    async fn persist_season_economy(&self, economy: &SeasonEconomy) -> Result<(), StorageError>;

    /// Sum of `players.coins`, used to refresh `coinsInWallets` each tick.
    async fn sum_wallet_coins(&self) -> Result<i64, StorageError>;

    /// Compare-and-swap on `global_settings['tick_last_utc']`; returns `true`
    /// iff this caller won leader election for the tick.
    async fn cas_tick_heartbeat(&self, now: DateTime<Utc>) -> Result<bool, StorageError>;

    async fn purchase_count_since(
        &self,
        season_id: &SeasonId,
        since: DateTime<Utc>,
    ) -> Result<i64, StorageError>;

    async fn player_wallet(&self, player_id: &PlayerId)
        -> Result<Option<PlayerWallet>, StorageError>;
    async fn list_all_players(&self) -> Result<Vec<PlayerWallet>, StorageError>;
    async fn update_activity_warmup(
        &self,
        player_id: &PlayerId,
        warmup_level: f64,
        updated_at: DateTime<Utc>,
        recent_activity_seconds: i64,
    ) -> Result<(), StorageError>;

    /// Unconditional reset; the caller (which owns the [`season-clock`] crate's
    /// day-index arithmetic) has already decided a reset is due for this
    /// player (spec.md I8).
    async fn reset_daily_earn(&self, player_id: &PlayerId, now: DateTime<Utc>) -> Result<(), StorageError>;
    async fn daily_earn_total(&self, player_id: &PlayerId) -> Result<i64, StorageError>;
    /// Credits `amount` coins; when `track_daily_earn` is set, also advances
    /// `daily_earn_total` (UBI bypasses the cap and calls this with `false`).
    async fn grant_coins(
        &self,
        player_id: &PlayerId,
        amount: i64,
        now: DateTime<Utc>,
        track_daily_earn: bool,
    ) -> Result<(), StorageError>;

    async fn faucet_last_claim(
        &self,
        player_id: &PlayerId,
        key: FaucetKey,
    ) -> Result<Option<DateTime<Utc>>, StorageError>;
    async fn record_faucet_claim(
        &self,
        player_id: &PlayerId,
        key: FaucetKey,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    async fn player_abuse_state(
        &self,
        player_id: &PlayerId,
        season_id: &SeasonId,
    ) -> Result<Option<PlayerAbuseState>, StorageError>;
    async fn upsert_player_abuse_state(
        &self,
        state: &PlayerAbuseState,
    ) -> Result<(), StorageError>;
    async fn all_player_abuse_states(
        &self,
        season_id: &SeasonId,
    ) -> Result<Vec<PlayerAbuseState>, StorageError>;

    async fn account_abuse_reputation(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<AccountAbuseReputation>, StorageError>;
    async fn upsert_account_abuse_reputation(
        &self,
        reputation: &AccountAbuseReputation,
    ) -> Result<(), StorageError>;
    async fn all_account_abuse_reputations(
        &self,
    ) -> Result<Vec<AccountAbuseReputation>, StorageError>;

    async fn account_id_for_player(
        &self,
        player_id: &PlayerId,
    ) -> Result<Option<AccountId>, StorageError>;
    async fn is_bot(&self, player_id: &PlayerId) -> Result<bool, StorageError>;
    async fn append_abuse_event(&self, event: &AbuseEvent) -> Result<(), StorageError>;

    async fn purchase_counts_by_player(
        &self,
        since: DateTime<Utc>,
        include_bots: bool,
        min_count: i64,
    ) -> Result<Vec<(PlayerId, i64)>, StorageError>;
    async fn purchase_timestamps_by_player(
        &self,
        since: DateTime<Utc>,
        include_bots: bool,
    ) -> Result<HashMap<PlayerId, Vec<DateTime<Utc>>>, StorageError>;
    async fn activity_timestamps_by_player(
        &self,
        since: DateTime<Utc>,
        include_bots: bool,
    ) -> Result<HashMap<PlayerId, Vec<DateTime<Utc>>>, StorageError>;
    async fn tick_edge_purchase_counts(
        &self,
        since: DateTime<Utc>,
        include_bots: bool,
        min_count: i64,
    ) -> Result<Vec<(PlayerId, i64)>, StorageError>;
    /// IPs with at least `min_distinct_players` distinct purchasing players in
    /// the window. Returns, per qualifying IP, the distinct-purchaser count
    /// (used to size the signal) and every player associated with that IP via
    /// `player_ip_associations` (used to penalize, spec.md §4.8: "every player
    /// on that IP" — not just the purchasers).
    async fn ip_purchase_clusters(
        &self,
        since: DateTime<Utc>,
        ip_last_seen_since: DateTime<Utc>,
        include_bots: bool,
        min_distinct_players: i64,
    ) -> Result<Vec<(String, i64, Vec<PlayerId>)>, StorageError>;

    async fn admin_count(&self) -> Result<i64, StorageError>;

    async fn emit_notification(&self, notification: &Notification) -> Result<(), StorageError>;

    /// Idempotent season-end finalization marker; `write` is a no-op insert
    /// if a snapshot already exists for `season_id`.
    async fn has_season_end_snapshot(&self, season_id: &SeasonId) -> Result<bool, StorageError>;
    async fn write_season_end_snapshot(
        &self,
        season_id: &SeasonId,
        snapshot: serde_json::Value,
    ) -> Result<(), StorageError>;
}
