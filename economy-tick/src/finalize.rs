// SPDX-License-Identifier: Apache-2.0, MIT
//! Idempotent season-end finalization (spec.md §4.9 step 2, §6): runs once,
//! driven by a presence check against `season_end_snapshots`, and emits a
//! deduped notification.

use chrono::{DateTime, Utc};
use economy_state::EconomyState;
use economy_storage::{EconomyRepository, NotificationSink};
use economy_types::{EconomyError, Notification, NotificationPriority, SeasonId};

pub async fn finalize_season_if_needed<R, S>(
    repo: &R,
    state: &EconomyState,
    sink: &economy_storage::DedupingSink<S>,
    season_id: &SeasonId,
    now: DateTime<Utc>,
) -> Result<bool, EconomyError>
where
    R: EconomyRepository,
    S: NotificationSink,
{
    if repo.has_season_end_snapshot(season_id).await? {
        return Ok(false);
    }

    let snapshot = state.snapshot();
    let payload = serde_json::json!({
        "season_id": season_id.as_str(),
        "ended_at": now.to_rfc3339(),
        "global_coin_pool": snapshot.global_coin_pool,
        "coins_distributed": snapshot.coins_distributed,
        "stars_sold": snapshot.stars_sold,
        "final_star_price_microcoins": snapshot.current_star_price.0,
    });
    repo.write_season_end_snapshot(season_id, payload.clone())
        .await?;

    sink.send_at(
        Notification {
            role: "all".to_string(),
            category: "season".to_string(),
            kind: "season_end".to_string(),
            priority: NotificationPriority::High,
            message: format!("season {season_id} has ended"),
            payload,
            dedup_key: format!("season_end:{season_id}"),
            dedup_window_seconds: 24 * 3600,
        },
        now,
    )
    .await;

    tracing::info!(season_id = %season_id, "season finalized");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_key_is_stable_per_season() {
        let season_id = SeasonId::from("season-7");
        let key = format!("season_end:{season_id}");
        assert_eq!(key, "season_end:season-7");
    }
}
