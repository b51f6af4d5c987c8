// SPDX-License-Identifier: Apache-2.0, MIT
use chrono::{DateTime, Utc};
use economy_storage::EconomyRepository;
use economy_types::{decay_rate_per_hour, severity_for_score, EconomyError, Severity};

pub use economy_types::persistent_duration_hours;

/// Pre-signal decay pass (spec.md §4.8): every row whose `persistent_until`
/// is absent or past has its score relaxed toward zero. Per-row write
/// failures are logged and skipped so one bad row never blocks the batch
/// (spec.md §7).
pub async fn decay_pass<R: EconomyRepository>(
    repo: &R,
    season_id: &economy_types::SeasonId,
    now: DateTime<Utc>,
) -> Result<(), EconomyError> {
    for mut state in repo.all_player_abuse_states(season_id).await? {
        if let Some(until) = state.persistent_until {
            if until > now {
                continue;
            }
        }
        let hours = (now - state.last_decay_at).num_milliseconds() as f64 / 3_600_000.0;
        if hours <= 0.0 {
            continue;
        }
        state.score = (state.score - decay_rate_per_hour(state.severity) * hours).max(0.0);
        state.severity = severity_for_score(state.score);
        state.last_decay_at = now;
        if let Err(err) = repo.upsert_player_abuse_state(&state).await {
            tracing::warn!(player_id = %state.player_id, error = %err, "abuse decay write failed, skipping row");
        }
    }

    for mut reputation in repo.all_account_abuse_reputations().await? {
        if let Some(until) = reputation.persistent_until {
            if until > now {
                continue;
            }
        }
        let hours = (now - reputation.last_decay_at).num_milliseconds() as f64 / 3_600_000.0;
        if hours <= 0.0 {
            continue;
        }
        reputation.score =
            (reputation.score - decay_rate_per_hour(reputation.severity) * hours).max(0.0);
        reputation.severity = severity_for_score(reputation.score);
        reputation.last_decay_at = now;
        if let Err(err) = repo.upsert_account_abuse_reputation(&reputation).await {
            tracing::warn!(account_id = %reputation.account_id, error = %err, "abuse decay write failed, skipping row");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decay_rates_match_spec_table() {
        assert_eq!(decay_rate_per_hour(Severity::None), 1.0);
        assert_eq!(decay_rate_per_hour(Severity::Low), 0.6);
        assert_eq!(decay_rate_per_hour(Severity::Medium), 0.3);
        assert_eq!(decay_rate_per_hour(Severity::High), 0.15);
    }

    #[test]
    fn persistence_durations_match_spec_table() {
        assert_eq!(persistent_duration_hours(Severity::None), 0);
        assert_eq!(persistent_duration_hours(Severity::Low), 0);
        assert_eq!(persistent_duration_hours(Severity::Medium), 72);
        assert_eq!(persistent_duration_hours(Severity::High), 7 * 24);
    }

    #[test]
    fn scenario_four_decay_from_t_plus_72h() {
        // score=31, severity=Medium at t0+1h; persistentUntil = t0+73h.
        // Decay runs at t0+100h, 28h after the persistence window lifts.
        let rate = decay_rate_per_hour(Severity::Medium);
        let score_after = (31.0_f64 - rate * 28.0).max(0.0);
        assert!((score_after - 22.6).abs() < 1e-9);
        assert_eq!(severity_for_score(score_after), Severity::Low);
    }
}
