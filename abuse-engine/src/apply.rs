// SPDX-License-Identifier: Apache-2.0, MIT
use chrono::{DateTime, Duration, Utc};
use economy_storage::EconomyRepository;
use economy_types::{
    severity_for_score, AbuseEvent, AbuseSignal, AccountAbuseReputation, EconomyError,
    PlayerAbuseState, Severity,
};

use crate::decay::persistent_duration_hours;

const PERSISTENCE_WINDOW: Duration = Duration::hours(6);
const ACCOUNT_PROPAGATION_FACTOR: f64 = 0.6;

/// Applies one signal to its player's seasonal state, propagates a scaled
/// delta to the account reputation when severity crosses into persistence
/// territory, and appends an audit row (spec.md §4.8 "Application").
pub async fn apply_signal<R: EconomyRepository>(
    repo: &R,
    signal: &AbuseSignal,
    season_id: &economy_types::SeasonId,
    now: DateTime<Utc>,
) -> Result<PlayerAbuseState, EconomyError> {
    let mut state = repo
        .player_abuse_state(&signal.player_id, season_id)
        .await?
        .unwrap_or_else(|| PlayerAbuseState {
            player_id: signal.player_id.clone(),
            season_id: season_id.clone(),
            score: 0.0,
            severity: Severity::None,
            last_signal_at: None,
            last_decay_at: now,
            persistent_until: None,
        });

    let previous_signal_at = state.last_signal_at;
    state.score = (state.score + signal.delta).max(0.0);
    let recomputed = severity_for_score(state.score);
    // I5: an upgrade within this application is sticky even if a later
    // recompute in the same call would read lower.
    state.severity = state.severity.max(recomputed);

    if state.severity >= Severity::Medium {
        if let Some(prev) = previous_signal_at {
            if now - prev <= PERSISTENCE_WINDOW {
                state.persistent_until =
                    Some(now + Duration::hours(persistent_duration_hours(state.severity)));
            }
        }
    }
    state.last_signal_at = Some(now);

    repo.upsert_player_abuse_state(&state).await?;

    let account_id = repo.account_id_for_player(&signal.player_id).await?;
    if signal.severity >= Severity::Medium {
        if let Some(account_id) = &account_id {
            apply_to_account(repo, account_id, signal.delta * ACCOUNT_PROPAGATION_FACTOR, now)
                .await?;
        }
    }

    let event = AbuseEvent {
        account_id,
        player_id: signal.player_id.clone(),
        season_id: season_id.clone(),
        event_type: signal.event_type.clone(),
        severity: state.severity,
        score_delta: signal.delta,
        details: signal.details.clone(),
        created_at: now,
    };
    repo.append_abuse_event(&event).await?;

    Ok(state)
}

async fn apply_to_account<R: EconomyRepository>(
    repo: &R,
    account_id: &economy_types::AccountId,
    delta: f64,
    now: DateTime<Utc>,
) -> Result<AccountAbuseReputation, EconomyError> {
    let mut reputation =
        repo.account_abuse_reputation(account_id)
            .await?
            .unwrap_or_else(|| AccountAbuseReputation {
                account_id: account_id.clone(),
                score: 0.0,
                severity: Severity::None,
                last_signal_at: None,
                last_decay_at: now,
                persistent_until: None,
            });

    let previous_signal_at = reputation.last_signal_at;
    reputation.score = (reputation.score + delta).max(0.0);
    let recomputed = severity_for_score(reputation.score);
    reputation.severity = reputation.severity.max(recomputed);

    if reputation.severity >= Severity::Medium {
        if let Some(prev) = previous_signal_at {
            if now - prev <= PERSISTENCE_WINDOW {
                reputation.persistent_until = Some(
                    now + Duration::hours(persistent_duration_hours(reputation.severity)),
                );
            }
        }
    }
    reputation.last_signal_at = Some(now);

    repo.upsert_account_abuse_reputation(&reputation).await?;
    Ok(reputation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use economy_storage::StorageError;
    use economy_types::{
        AccountId, CalibrationParams, FaucetKey, Notification, PlayerId, PlayerWallet,
        SeasonEconomy, SeasonId, TelemetrySnapshot,
    };
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeRepo {
        player_states: Mutex<HashMap<(String, String), PlayerAbuseState>>,
        account_reps: Mutex<HashMap<String, AccountAbuseReputation>>,
        events: Mutex<Vec<AbuseEvent>>,
        account_for_player: Mutex<HashMap<String, AccountId>>,
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
        async fn persist_season_economy(
            &self,
            _economy: &SeasonEconomy,
        ) -> Result<(), StorageError> {
            Ok(())
        }
        async fn sum_wallet_coins(&self) -> Result<i64, StorageError> {
            Ok(0)
        }
        async fn cas_tick_heartbeat(
            &self,
            _now: chrono::DateTime<Utc>,
        ) -> Result<bool, StorageError> {
            Ok(true)
        }
        async fn purchase_count_since(
            &self,
            _season_id: &SeasonId,
            _since: chrono::DateTime<Utc>,
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
            _updated_at: chrono::DateTime<Utc>,
            _recent_activity_seconds: i64,
        ) -> Result<(), StorageError> {
            Ok(())
        }
        async fn reset_daily_earn(
            &self,
            _player_id: &PlayerId,
            _now: chrono::DateTime<Utc>,
        ) -> Result<(), StorageError> {
            Ok(())
        }
        async fn daily_earn_total(&self, _player_id: &PlayerId) -> Result<i64, StorageError> {
            Ok(0)
        }
        async fn grant_coins(
            &self,
            _player_id: &PlayerId,
            _amount: i64,
            _now: chrono::DateTime<Utc>,
            _track_daily_earn: bool,
        ) -> Result<(), StorageError> {
            Ok(())
        }
        async fn faucet_last_claim(
            &self,
            _player_id: &PlayerId,
            _key: FaucetKey,
        ) -> Result<Option<chrono::DateTime<Utc>>, StorageError> {
            Ok(None)
        }
        async fn record_faucet_claim(
            &self,
            _player_id: &PlayerId,
            _key: FaucetKey,
            _now: chrono::DateTime<Utc>,
        ) -> Result<(), StorageError> {
            Ok(())
        }
        async fn player_abuse_state(
            &self,
            player_id: &PlayerId,
            season_id: &SeasonId,
        ) -> Result<Option<PlayerAbuseState>, StorageError> {
            Ok(self
                .player_states
                .lock()
                .get(&(player_id.as_str().to_string(), season_id.as_str().to_string()))
                .cloned())
        }
        async fn upsert_player_abuse_state(
            &self,
            state: &PlayerAbuseState,
        ) -> Result<(), StorageError> {
            self.player_states.lock().insert(
                (
                    state.player_id.as_str().to_string(),
                    state.season_id.as_str().to_string(),
                ),
                state.clone(),
            );
            Ok(())
        }
        async fn all_player_abuse_states(
            &self,
            _season_id: &SeasonId,
        ) -> Result<Vec<PlayerAbuseState>, StorageError> {
            Ok(self.player_states.lock().values().cloned().collect())
        }
        async fn account_abuse_reputation(
            &self,
            account_id: &AccountId,
        ) -> Result<Option<AccountAbuseReputation>, StorageError> {
            Ok(self
                .account_reps
                .lock()
                .get(account_id.as_str())
                .cloned())
        }
        async fn upsert_account_abuse_reputation(
            &self,
            reputation: &AccountAbuseReputation,
        ) -> Result<(), StorageError> {
            self.account_reps
                .lock()
                .insert(reputation.account_id.as_str().to_string(), reputation.clone());
            Ok(())
        }
        async fn all_account_abuse_reputations(
            &self,
        ) -> Result<Vec<AccountAbuseReputation>, StorageError> {
            Ok(self.account_reps.lock().values().cloned().collect())
        }
        async fn account_id_for_player(
            &self,
            player_id: &PlayerId,
        ) -> Result<Option<AccountId>, StorageError> {
            Ok(self
                .account_for_player
                .lock()
                .get(player_id.as_str())
                .cloned())
        }
        async fn is_bot(&self, _player_id: &PlayerId) -> Result<bool, StorageError> {
            Ok(false)
        }
        async fn append_abuse_event(&self, event: &AbuseEvent) -> Result<(), StorageError> {
            self.events.lock().push(event.clone());
            Ok(())
        }
        async fn purchase_counts_by_player(
            &self,
            _since: chrono::DateTime<Utc>,
            _include_bots: bool,
            _min_count: i64,
        ) -> Result<Vec<(PlayerId, i64)>, StorageError> {
            Ok(vec![])
        }
        async fn purchase_timestamps_by_player(
            &self,
            _since: chrono::DateTime<Utc>,
            _include_bots: bool,
        ) -> Result<HashMap<PlayerId, Vec<chrono::DateTime<Utc>>>, StorageError> {
            Ok(HashMap::new())
        }
        async fn activity_timestamps_by_player(
            &self,
            _since: chrono::DateTime<Utc>,
            _include_bots: bool,
        ) -> Result<HashMap<PlayerId, Vec<chrono::DateTime<Utc>>>, StorageError> {
            Ok(HashMap::new())
        }
        async fn tick_edge_purchase_counts(
            &self,
            _since: chrono::DateTime<Utc>,
            _include_bots: bool,
            _min_count: i64,
        ) -> Result<Vec<(PlayerId, i64)>, StorageError> {
            Ok(vec![])
        }
        async fn ip_purchase_clusters(
            &self,
            _since: chrono::DateTime<Utc>,
            _ip_last_seen_since: chrono::DateTime<Utc>,
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
            Ok(false)
        }
        async fn write_season_end_snapshot(
            &self,
            _season_id: &SeasonId,
            _snapshot: serde_json::Value,
        ) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn signal(player: &str, delta: f64) -> AbuseSignal {
        signal_with_severity(player, delta, Severity::Low)
    }

    fn signal_with_severity(player: &str, delta: f64, severity: Severity) -> AbuseSignal {
        AbuseSignal {
            player_id: PlayerId::from(player),
            event_type: "purchase_burst".into(),
            delta,
            severity,
            details: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn escalation_sets_persistent_until_matches_scenario_four() {
        let repo = FakeRepo::default();
        let season = SeasonId::from("season-1");
        let t0 = Utc::now();

        let state = apply_signal(&repo, &signal("p1", 30.0), &season, t0).await.unwrap();
        assert_eq!(state.score, 30.0);
        assert_eq!(state.severity, Severity::Medium);
        assert!(state.persistent_until.is_none());

        let t1 = t0 + Duration::hours(1);
        let state = apply_signal(&repo, &signal("p1", 1.0), &season, t1).await.unwrap();
        assert_eq!(state.score, 31.0);
        assert_eq!(state.persistent_until, Some(t1 + Duration::hours(72)));
    }

    #[tokio::test]
    async fn severity_is_always_at_least_severity_for_score() {
        let repo = FakeRepo::default();
        let season = SeasonId::from("season-1");
        let state = apply_signal(&repo, &signal("p2", 50.0), &season, Utc::now())
            .await
            .unwrap();
        assert!(state.severity >= severity_for_score(state.score));
    }

    #[tokio::test]
    async fn account_reputation_gated_on_signal_severity_not_player_score() {
        let repo = FakeRepo::default();
        repo.account_for_player
            .lock()
            .insert("p3".to_string(), AccountId::from("acct-1"));
        let season = SeasonId::from("season-1");

        // A large Low-severity delta pushes the player's cumulative score well
        // past Medium, but a Low-severity signal must never propagate.
        apply_signal(
            &repo,
            &signal_with_severity("p3", 40.0, Severity::Low),
            &season,
            Utc::now(),
        )
        .await
        .unwrap();
        assert!(repo
            .account_abuse_reputation(&AccountId::from("acct-1"))
            .await
            .unwrap()
            .is_none());

        // A Medium-severity signal propagates regardless of the tiny delta.
        apply_signal(
            &repo,
            &signal_with_severity("p3", 5.0, Severity::Medium),
            &season,
            Utc::now(),
        )
        .await
        .unwrap();
        let rep = repo
            .account_abuse_reputation(&AccountId::from("acct-1"))
            .await
            .unwrap()
            .unwrap();
        assert!(rep.score > 0.0);
    }
}
