// SPDX-License-Identifier: Apache-2.0, MIT
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use economy_types::{
    AbuseEvent, AccountAbuseReputation, AccountId, CalibrationParams, FaucetKey, Notification,
    PlayerAbuseState, PlayerId, PlayerWallet, SeasonEconomy, SeasonId, Severity,
    TelemetrySnapshot,
};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

use crate::ddl;
use crate::error::StorageError;
use crate::traits::EconomyRepository;

/// Postgres-backed implementation of [`EconomyRepository`]. The schema DDL is
/// applied idempotently by [`Self::ensure_schema`]; this crate does not own
/// migrations beyond that (spec.md §1: "the Postgres schema itself" is an
/// external collaborator).
pub struct PgEconomyRepository {
    pool: PgPool,
}

impl PgEconomyRepository {
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(PgEconomyRepository { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        PgEconomyRepository { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn severity_of(row: i16) -> Severity {
    Severity::from_u8(row.clamp(0, 3) as u8)
}

#[async_trait]
impl EconomyRepository for PgEconomyRepository {
    async fn ensure_schema(&self) -> Result<(), StorageError> {
        for statement in ddl::STATEMENTS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn try_advisory_lock(&self, lock_id: i64) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT pg_try_advisory_lock($1) AS acquired")
            .bind(lock_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<bool, _>("acquired")?)
    }

    async fn advisory_unlock(&self, lock_id: i64) -> Result<(), StorageError> {
        sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(lock_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn load_calibration(
        &self,
        season_id: &SeasonId,
    ) -> Result<Option<CalibrationParams>, StorageError> {
        let row = sqlx::query(
            r#"SELECT season_id, seed, p0, c_base, alpha, s_scale, g_scale, beta, gamma,
                daily_login_reward, daily_login_cooldown_hours, activity_reward,
                activity_cooldown_seconds, daily_cap_early, daily_cap_late,
                passive_active_interval_seconds, passive_idle_interval_seconds,
                passive_active_amount, passive_idle_amount, hope_threshold
            FROM season_calibration WHERE season_id = $1"#,
        )
        .bind(season_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };
        Ok(Some(CalibrationParams {
            season_id: SeasonId::from(row.try_get::<String, _>("season_id")?),
            seed: row.try_get("seed")?,
            p0: row.try_get("p0")?,
            c_base: row.try_get("c_base")?,
            alpha: row.try_get("alpha")?,
            s_scale: row.try_get("s_scale")?,
            g_scale: row.try_get("g_scale")?,
            beta: row.try_get("beta")?,
            gamma: row.try_get("gamma")?,
            daily_login_reward: row.try_get("daily_login_reward")?,
            daily_login_cooldown_hours: row.try_get("daily_login_cooldown_hours")?,
            activity_reward: row.try_get("activity_reward")?,
            activity_cooldown_seconds: row.try_get("activity_cooldown_seconds")?,
            daily_cap_early: row.try_get("daily_cap_early")?,
            daily_cap_late: row.try_get("daily_cap_late")?,
            passive_active_interval_seconds: row.try_get("passive_active_interval_seconds")?,
            passive_idle_interval_seconds: row.try_get("passive_idle_interval_seconds")?,
            passive_active_amount: row.try_get("passive_active_amount")?,
            passive_idle_amount: row.try_get("passive_idle_amount")?,
            hope_threshold: row.try_get("hope_threshold")?,
        }))
    }

    async fn save_calibration(&self, params: &CalibrationParams) -> Result<(), StorageError> {
        sqlx::query(
            r#"INSERT INTO season_calibration (
                season_id, seed, p0, c_base, alpha, s_scale, g_scale, beta, gamma,
                daily_login_reward, daily_login_cooldown_hours, activity_reward,
                activity_cooldown_seconds, daily_cap_early, daily_cap_late,
                passive_active_interval_seconds, passive_idle_interval_seconds,
                passive_active_amount, passive_idle_amount, hope_threshold, created_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,NOW())
            ON CONFLICT (season_id) DO NOTHING"#,
        )
        .bind(params.season_id.as_str())
        .bind(params.seed)
        .bind(params.p0)
        .bind(params.c_base)
        .bind(params.alpha)
        .bind(params.s_scale)
        .bind(params.g_scale)
        .bind(params.beta)
        .bind(params.gamma)
        .bind(params.daily_login_reward)
        .bind(params.daily_login_cooldown_hours)
        .bind(params.activity_reward)
        .bind(params.activity_cooldown_seconds)
        .bind(params.daily_cap_early)
        .bind(params.daily_cap_late)
        .bind(params.passive_active_interval_seconds)
        .bind(params.passive_idle_interval_seconds)
        .bind(params.passive_active_amount)
        .bind(params.passive_idle_amount)
        .bind(params.hope_threshold)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn derive_telemetry_snapshot(&self) -> Result<TelemetrySnapshot, StorageError> {
        let active_24h: i64 = sqlx::query(
            "SELECT COUNT(*) AS n FROM players WHERE last_active_at >= NOW() - INTERVAL '24 hours'",
        )
        .fetch_one(&self.pool)
        .await?
        .try_get("n")?;

        let active_7d: i64 = sqlx::query(
            "SELECT COUNT(*) AS n FROM players WHERE last_active_at >= NOW() - INTERVAL '7 days'",
        )
        .fetch_one(&self.pool)
        .await?
        .try_get("n")?;

        let telemetry_7d: i64 = sqlx::query(
            "SELECT COUNT(DISTINCT player_id) AS n FROM player_telemetry WHERE created_at >= NOW() - INTERVAL '7 days'",
        )
        .fetch_one(&self.pool)
        .await?
        .try_get("n")?;

        Ok(TelemetrySnapshot {
            active_players_24h: active_24h,
            active_players_7d: active_7d,
            telemetry_7d,
        })
    }

    async fn ensure_season_economy(&self, season_id: &SeasonId) -> Result<(), StorageError> {
        sqlx::query(
            r#"INSERT INTO season_economy (
                season_id, global_coin_pool, coins_distributed, emission_remainder,
                market_pressure, price_floor, current_star_price, current_price_tick,
                daily_emission_target, stars_sold, last_updated
            ) VALUES ($1, 0, 0, 0, 1.0, 0, 0, 0, 0, 0, NOW())
            ON CONFLICT (season_id) DO NOTHING"#,
        )
        .bind(season_id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_season_economy(
        &self,
        season_id: &SeasonId,
    ) -> Result<Option<SeasonEconomy>, StorageError> {
        let row = sqlx::query(
            r#"SELECT season_id, global_coin_pool, coins_distributed, emission_remainder,
                market_pressure, price_floor, current_star_price, current_price_tick,
                daily_emission_target, stars_sold
            FROM season_economy WHERE season_id = $1"#,
        )
        .bind(season_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };
        Ok(Some(SeasonEconomy {
            season_id: SeasonId::from(row.try_get::<String, _>("season_id")?),
            global_coin_pool: row.try_get("global_coin_pool")?,
            coins_distributed: row.try_get("coins_distributed")?,
            emission_remainder: row.try_get("emission_remainder")?,
            market_pressure: row.try_get("market_pressure")?,
            price_floor: row.try_get("price_floor")?,
            current_star_price: economy_types::Microcoins(row.try_get("current_star_price")?),
            current_price_tick: row.try_get("current_price_tick")?,
            daily_emission_target: row.try_get("daily_emission_target")?,
            stars_sold: row.try_get("stars_sold")?,
        }))
    }

    async fn persist_season_economy(&self, economy: &SeasonEconomy) -> Result<(), StorageError> {
        sqlx::query(
            r#"INSERT INTO season_economy (
                season_id, global_coin_pool, coins_distributed, emission_remainder,
                market_pressure, price_floor, current_star_price, current_price_tick,
                daily_emission_target, stars_sold, last_updated
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,NOW())
            ON CONFLICT (season_id) DO UPDATE SET
                global_coin_pool = EXCLUDED.global_coin_pool,
                coins_distributed = EXCLUDED.coins_distributed,
                emission_remainder = EXCLUDED.emission_remainder,
                market_pressure = EXCLUDED.market_pressure,
                price_floor = EXCLUDED.price_floor,
                current_star_price = EXCLUDED.current_star_price,
                current_price_tick = EXCLUDED.current_price_tick,
                daily_emission_target = EXCLUDED.daily_emission_target,
                stars_sold = EXCLUDED.stars_sold,
                last_updated = NOW()"#,
        )
        .bind(economy.season_id.as_str())
        .bind(economy.global_coin_pool)
        .bind(economy.coins_distributed)
        .bind(economy.emission_remainder)
        .bind(economy.market_pressure)
        .bind(economy.price_floor)
        .bind(economy.current_star_price.0)
        .bind(economy.current_price_tick)
        .bind(economy.daily_emission_target)
        .bind(economy.stars_sold)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn sum_wallet_coins(&self) -> Result<i64, StorageError> {
        let row = sqlx::query("SELECT COALESCE(SUM(coins), 0) AS total FROM players")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("total")?)
    }

    async fn cas_tick_heartbeat(&self, now: DateTime<Utc>) -> Result<bool, StorageError> {
        let now_str = now.to_rfc3339();
        let row = sqlx::query(
            r#"INSERT INTO global_settings (key, value, updated_at)
                VALUES ('tick_last_utc', $1, NOW())
                ON CONFLICT (key) DO UPDATE SET value = $1, updated_at = NOW()
                WHERE global_settings.value < $1
                RETURNING key"#,
        )
        .bind(&now_str)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn purchase_count_since(
        &self,
        season_id: &SeasonId,
        since: DateTime<Utc>,
    ) -> Result<i64, StorageError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM star_purchase_log WHERE season_id = $1 AND created_at >= $2",
        )
        .bind(season_id.as_str())
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("n")?)
    }

    async fn player_wallet(
        &self,
        player_id: &PlayerId,
    ) -> Result<Option<PlayerWallet>, StorageError> {
        let row = sqlx::query(
            r#"SELECT player_id, coins, stars, daily_earn_total, last_earn_reset_at,
                last_active_at, activity_warmup_level, activity_warmup_updated_at,
                recent_activity_seconds, drip_multiplier, drip_paused, is_bot
            FROM players WHERE player_id = $1"#,
        )
        .bind(player_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };
        Ok(Some(wallet_from_row(&row)?))
    }

    async fn list_all_players(&self) -> Result<Vec<PlayerWallet>, StorageError> {
        let rows = sqlx::query(
            r#"SELECT player_id, coins, stars, daily_earn_total, last_earn_reset_at,
                last_active_at, activity_warmup_level, activity_warmup_updated_at,
                recent_activity_seconds, drip_multiplier, drip_paused, is_bot
            FROM players ORDER BY player_id"#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(wallet_from_row).collect()
    }

    async fn update_activity_warmup(
        &self,
        player_id: &PlayerId,
        warmup_level: f64,
        updated_at: DateTime<Utc>,
        recent_activity_seconds: i64,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"UPDATE players SET activity_warmup_level = $1, activity_warmup_updated_at = $2,
                recent_activity_seconds = $3 WHERE player_id = $4"#,
        )
        .bind(warmup_level)
        .bind(updated_at)
        .bind(recent_activity_seconds)
        .bind(player_id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn reset_daily_earn(&self, player_id: &PlayerId, now: DateTime<Utc>) -> Result<(), StorageError> {
        sqlx::query(
            "UPDATE players SET daily_earn_total = 0, last_earn_reset_at = $2 WHERE player_id = $1",
        )
        .bind(player_id.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn daily_earn_total(&self, player_id: &PlayerId) -> Result<i64, StorageError> {
        let row = sqlx::query("SELECT daily_earn_total FROM players WHERE player_id = $1")
            .bind(player_id.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("daily_earn_total")?)
    }

    async fn grant_coins(
        &self,
        player_id: &PlayerId,
        amount: i64,
        now: DateTime<Utc>,
        track_daily_earn: bool,
    ) -> Result<(), StorageError> {
        if track_daily_earn {
            sqlx::query(
                r#"UPDATE players SET coins = coins + $2, daily_earn_total = daily_earn_total + $2,
                    last_active_at = $3 WHERE player_id = $1"#,
            )
            .bind(player_id.as_str())
            .bind(amount)
            .bind(now)
            .execute(&self.pool)
            .await?;
        } else {
            sqlx::query("UPDATE players SET coins = coins + $2 WHERE player_id = $1")
                .bind(player_id.as_str())
                .bind(amount)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    async fn faucet_last_claim(
        &self,
        player_id: &PlayerId,
        key: FaucetKey,
    ) -> Result<Option<DateTime<Utc>>, StorageError> {
        let row = sqlx::query(
            "SELECT last_claim_at FROM player_faucet_claims WHERE player_id = $1 AND faucet_key = $2",
        )
        .bind(player_id.as_str())
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(Some(row.try_get("last_claim_at")?)),
            None => Ok(None),
        }
    }

    async fn record_faucet_claim(
        &self,
        player_id: &PlayerId,
        key: FaucetKey,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"INSERT INTO player_faucet_claims (player_id, faucet_key, last_claim_at, claim_count)
                VALUES ($1, $2, $3, 1)
                ON CONFLICT (player_id, faucet_key) DO UPDATE SET
                    last_claim_at = $3,
                    claim_count = player_faucet_claims.claim_count + 1"#,
        )
        .bind(player_id.as_str())
        .bind(key.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn player_abuse_state(
        &self,
        player_id: &PlayerId,
        season_id: &SeasonId,
    ) -> Result<Option<PlayerAbuseState>, StorageError> {
        let row = sqlx::query(
            r#"SELECT player_id, season_id, score, severity, last_signal_at, last_decay_at, persistent_until
                FROM player_abuse_state WHERE player_id = $1 AND season_id = $2"#,
        )
        .bind(player_id.as_str())
        .bind(season_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };
        Ok(Some(PlayerAbuseState {
            player_id: PlayerId::from(row.try_get::<String, _>("player_id")?),
            season_id: SeasonId::from(row.try_get::<String, _>("season_id")?),
            score: row.try_get("score")?,
            severity: severity_of(row.try_get("severity")?),
            last_signal_at: row.try_get("last_signal_at")?,
            last_decay_at: row.try_get("last_decay_at")?,
            persistent_until: row.try_get("persistent_until")?,
        }))
    }

    async fn upsert_player_abuse_state(
        &self,
        state: &PlayerAbuseState,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"INSERT INTO player_abuse_state (
                player_id, season_id, score, severity, last_signal_at, last_decay_at, persistent_until, updated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,NOW())
            ON CONFLICT (player_id, season_id) DO UPDATE SET
                score = EXCLUDED.score,
                severity = EXCLUDED.severity,
                last_signal_at = EXCLUDED.last_signal_at,
                last_decay_at = EXCLUDED.last_decay_at,
                persistent_until = EXCLUDED.persistent_until,
                updated_at = NOW()"#,
        )
        .bind(state.player_id.as_str())
        .bind(state.season_id.as_str())
        .bind(state.score)
        .bind(state.severity.as_u8() as i16)
        .bind(state.last_signal_at)
        .bind(state.last_decay_at)
        .bind(state.persistent_until)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn all_player_abuse_states(
        &self,
        season_id: &SeasonId,
    ) -> Result<Vec<PlayerAbuseState>, StorageError> {
        let rows = sqlx::query(
            r#"SELECT player_id, season_id, score, severity, last_signal_at, last_decay_at, persistent_until
                FROM player_abuse_state WHERE season_id = $1"#,
        )
        .bind(season_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(PlayerAbuseState {
                    player_id: PlayerId::from(row.try_get::<String, _>("player_id")?),
                    season_id: SeasonId::from(row.try_get::<String, _>("season_id")?),
                    score: row.try_get("score")?,
                    severity: severity_of(row.try_get("severity")?),
                    last_signal_at: row.try_get("last_signal_at")?,
                    last_decay_at: row.try_get("last_decay_at")?,
                    persistent_until: row.try_get("persistent_until")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(StorageError::from)
    }

    async fn account_abuse_reputation(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<AccountAbuseReputation>, StorageError> {
        let row = sqlx::query(
            r#"SELECT account_id, score, severity, last_signal_at, last_decay_at, persistent_until
                FROM account_abuse_reputation WHERE account_id = $1"#,
        )
        .bind(account_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };
        Ok(Some(AccountAbuseReputation {
            account_id: AccountId::from(row.try_get::<String, _>("account_id")?),
            score: row.try_get("score")?,
            severity: severity_of(row.try_get("severity")?),
            last_signal_at: row.try_get("last_signal_at")?,
            last_decay_at: row.try_get("last_decay_at")?,
            persistent_until: row.try_get("persistent_until")?,
        }))
    }

    async fn upsert_account_abuse_reputation(
        &self,
        reputation: &AccountAbuseReputation,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"INSERT INTO account_abuse_reputation (
                account_id, score, severity, last_signal_at, last_decay_at, persistent_until, updated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,NOW())
            ON CONFLICT (account_id) DO UPDATE SET
                score = EXCLUDED.score,
                severity = EXCLUDED.severity,
                last_signal_at = EXCLUDED.last_signal_at,
                last_decay_at = EXCLUDED.last_decay_at,
                persistent_until = EXCLUDED.persistent_until,
                updated_at = NOW()"#,
        )
        .bind(reputation.account_id.as_str())
        .bind(reputation.score)
        .bind(reputation.severity.as_u8() as i16)
        .bind(reputation.last_signal_at)
        .bind(reputation.last_decay_at)
        .bind(reputation.persistent_until)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn all_account_abuse_reputations(
        &self,
    ) -> Result<Vec<AccountAbuseReputation>, StorageError> {
        let rows = sqlx::query(
            r#"SELECT account_id, score, severity, last_signal_at, last_decay_at, persistent_until
                FROM account_abuse_reputation"#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(AccountAbuseReputation {
                    account_id: AccountId::from(row.try_get::<String, _>("account_id")?),
                    score: row.try_get("score")?,
                    severity: severity_of(row.try_get("severity")?),
                    last_signal_at: row.try_get("last_signal_at")?,
                    last_decay_at: row.try_get("last_decay_at")?,
                    persistent_until: row.try_get("persistent_until")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(StorageError::from)
    }

    async fn account_id_for_player(
        &self,
        player_id: &PlayerId,
    ) -> Result<Option<AccountId>, StorageError> {
        let row = sqlx::query("SELECT account_id FROM accounts WHERE player_id = $1")
            .bind(player_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(AccountId::from(row.try_get::<String, _>("account_id")?))),
            None => Ok(None),
        }
    }

    async fn is_bot(&self, player_id: &PlayerId) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT is_bot FROM players WHERE player_id = $1")
            .bind(player_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.try_get("is_bot")).transpose()?.unwrap_or(false))
    }

    async fn append_abuse_event(&self, event: &AbuseEvent) -> Result<(), StorageError> {
        sqlx::query(
            r#"INSERT INTO abuse_events (
                account_id, player_id, season_id, event_type, severity, score_delta, details, created_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)"#,
        )
        .bind(event.account_id.as_ref().map(|a| a.as_str()))
        .bind(event.player_id.as_str())
        .bind(event.season_id.as_str())
        .bind(&event.event_type)
        .bind(event.severity.as_u8() as i16)
        .bind(event.score_delta)
        .bind(&event.details)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn purchase_counts_by_player(
        &self,
        since: DateTime<Utc>,
        include_bots: bool,
        min_count: i64,
    ) -> Result<Vec<(PlayerId, i64)>, StorageError> {
        let rows = sqlx::query(
            r#"SELECT s.player_id AS player_id, COUNT(*) AS n
                FROM star_purchase_log s
                JOIN players p ON p.player_id = s.player_id
                WHERE s.created_at >= $1 AND ($2 OR p.is_bot = FALSE)
                GROUP BY s.player_id
                HAVING COUNT(*) >= $3"#,
        )
        .bind(since)
        .bind(include_bots)
        .bind(min_count)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Ok((PlayerId::from(row.try_get::<String, _>("player_id")?), row.try_get("n")?)))
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(StorageError::from)
    }

    async fn purchase_timestamps_by_player(
        &self,
        since: DateTime<Utc>,
        include_bots: bool,
    ) -> Result<HashMap<PlayerId, Vec<DateTime<Utc>>>, StorageError> {
        let rows = sqlx::query(
            r#"SELECT s.player_id AS player_id, s.created_at AS created_at
                FROM star_purchase_log s
                JOIN players p ON p.player_id = s.player_id
                WHERE s.created_at >= $1 AND ($2 OR p.is_bot = FALSE)
                ORDER BY s.player_id, s.created_at ASC"#,
        )
        .bind(since)
        .bind(include_bots)
        .fetch_all(&self.pool)
        .await?;

        group_timestamps_by_player(&rows)
    }

    async fn activity_timestamps_by_player(
        &self,
        since: DateTime<Utc>,
        include_bots: bool,
    ) -> Result<HashMap<PlayerId, Vec<DateTime<Utc>>>, StorageError> {
        let rows = sqlx::query(
            r#"SELECT c.player_id AS player_id, c.created_at AS created_at
                FROM coin_earning_log c
                JOIN players p ON p.player_id = c.player_id
                WHERE c.created_at >= $1 AND c.source_type = 'activity' AND ($2 OR p.is_bot = FALSE)
                ORDER BY c.player_id, c.created_at ASC"#,
        )
        .bind(since)
        .bind(include_bots)
        .fetch_all(&self.pool)
        .await?;

        group_timestamps_by_player(&rows)
    }

    async fn tick_edge_purchase_counts(
        &self,
        since: DateTime<Utc>,
        include_bots: bool,
        min_count: i64,
    ) -> Result<Vec<(PlayerId, i64)>, StorageError> {
        let rows = sqlx::query(
            r#"SELECT s.player_id AS player_id, COUNT(*) AS n
                FROM star_purchase_log s
                JOIN players p ON p.player_id = s.player_id
                WHERE s.created_at >= $1
                    AND ($2 OR p.is_bot = FALSE)
                    AND (EXTRACT(SECOND FROM s.created_at) <= 2 OR EXTRACT(SECOND FROM s.created_at) >= 58)
                GROUP BY s.player_id
                HAVING COUNT(*) >= $3"#,
        )
        .bind(since)
        .bind(include_bots)
        .bind(min_count)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Ok((PlayerId::from(row.try_get::<String, _>("player_id")?), row.try_get("n")?)))
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(StorageError::from)
    }

    async fn ip_purchase_clusters(
        &self,
        since: DateTime<Utc>,
        ip_last_seen_since: DateTime<Utc>,
        include_bots: bool,
        min_distinct_players: i64,
    ) -> Result<Vec<(String, i64, Vec<PlayerId>)>, StorageError> {
        let purchaser_rows = sqlx::query(
            r#"SELECT a.ip AS ip, s.player_id AS player_id
                FROM star_purchase_log s
                JOIN player_ip_associations a ON a.player_id = s.player_id
                JOIN players pl ON pl.player_id = s.player_id
                WHERE s.created_at >= $1 AND a.last_seen >= $2 AND ($3 OR pl.is_bot = FALSE)"#,
        )
        .bind(since)
        .bind(ip_last_seen_since)
        .bind(include_bots)
        .fetch_all(&self.pool)
        .await?;

        let mut purchasers_by_ip: HashMap<String, Vec<PlayerId>> = HashMap::new();
        for row in &purchaser_rows {
            let ip: String = row.try_get("ip")?;
            let player_id = PlayerId::from(row.try_get::<String, _>("player_id")?);
            let players = purchasers_by_ip.entry(ip).or_default();
            if !players.contains(&player_id) {
                players.push(player_id);
            }
        }

        let qualifying_ips: Vec<(String, i64)> = purchasers_by_ip
            .into_iter()
            .filter(|(_, players)| players.len() as i64 >= min_distinct_players)
            .map(|(ip, players)| (ip, players.len() as i64))
            .collect();

        let mut clusters = Vec::with_capacity(qualifying_ips.len());
        for (ip, distinct_purchasers) in qualifying_ips {
            let rows = sqlx::query(
                r#"SELECT a.player_id AS player_id
                    FROM player_ip_associations a
                    JOIN players pl ON pl.player_id = a.player_id
                    WHERE a.ip = $1 AND a.last_seen >= $2 AND ($3 OR pl.is_bot = FALSE)"#,
            )
            .bind(&ip)
            .bind(ip_last_seen_since)
            .bind(include_bots)
            .fetch_all(&self.pool)
            .await?;

            let mut players = Vec::with_capacity(rows.len());
            for row in &rows {
                players.push(PlayerId::from(row.try_get::<String, _>("player_id")?));
            }
            clusters.push((ip, distinct_purchasers, players));
        }

        Ok(clusters)
    }

    async fn admin_count(&self) -> Result<i64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM accounts WHERE role = 'admin'")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }

    async fn emit_notification(&self, notification: &Notification) -> Result<(), StorageError> {
        sqlx::query(
            r#"INSERT INTO notifications (role, category, type, priority, message, payload, dedup_key, dedup_window_seconds, created_at)
                VALUES ($1,$2,$3,$4,$5,$6,$7,$8,NOW())"#,
        )
        .bind(&notification.role)
        .bind(&notification.category)
        .bind(&notification.kind)
        .bind(format!("{:?}", notification.priority).to_lowercase())
        .bind(&notification.message)
        .bind(&notification.payload)
        .bind(&notification.dedup_key)
        .bind(notification.dedup_window_seconds)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn has_season_end_snapshot(&self, season_id: &SeasonId) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 AS present FROM season_end_snapshots WHERE season_id = $1")
            .bind(season_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn write_season_end_snapshot(
        &self,
        season_id: &SeasonId,
        snapshot: serde_json::Value,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"INSERT INTO season_end_snapshots (season_id, snapshot, created_at)
                VALUES ($1, $2, NOW())
                ON CONFLICT (season_id) DO NOTHING"#,
        )
        .bind(season_id.as_str())
        .bind(snapshot)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn wallet_from_row(row: &sqlx::postgres::PgRow) -> Result<PlayerWallet, StorageError> {
    Ok(PlayerWallet {
        player_id: PlayerId::from(row.try_get::<String, _>("player_id")?),
        coins: row.try_get("coins")?,
        stars: row.try_get("stars")?,
        daily_earn_total: row.try_get("daily_earn_total")?,
        last_earn_reset_at: row.try_get("last_earn_reset_at")?,
        last_active_at: row.try_get("last_active_at")?,
        activity_warmup_level: row.try_get("activity_warmup_level")?,
        activity_warmup_updated_at: row.try_get("activity_warmup_updated_at")?,
        recent_activity_seconds: row.try_get("recent_activity_seconds")?,
        drip_multiplier: row.try_get("drip_multiplier")?,
        drip_paused: row.try_get("drip_paused")?,
        is_bot: row.try_get("is_bot")?,
    })
}

fn group_timestamps_by_player(
    rows: &[sqlx::postgres::PgRow],
) -> Result<HashMap<PlayerId, Vec<DateTime<Utc>>>, StorageError> {
    let mut by_player: HashMap<PlayerId, Vec<DateTime<Utc>>> = HashMap::new();
    for row in rows {
        let player_id = PlayerId::from(row.try_get::<String, _>("player_id")?);
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        by_player.entry(player_id).or_default().push(created_at);
    }
    Ok(by_player)
}

