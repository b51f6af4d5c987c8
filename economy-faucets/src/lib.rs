// SPDX-License-Identifier: Apache-2.0, MIT
//! Faucet claim cooldowns, daily earn cap, and UBI distribution (spec.md
//! §4.5, §4.6). Pure arithmetic lives in free functions; the orchestration
//! functions at the bottom thread them through [`EconomyRepository`] and
//! [`EconomyState`].

use chrono::{DateTime, Duration, Utc};
use economy_state::{try_distribute_coins_with_priority, EconomyState};
use economy_storage::EconomyRepository;
use economy_types::{EconomyError, FaucetKey, PlayerId};
use season_clock::SeasonClock;

/// Base UBI grant before activity-warmup scaling (spec.md §8 scenario 5).
pub const BASE_UBI_MICROCOINS: i64 = 1;

/// Players idle longer than this are considered inactive for warmup purposes.
pub const ACTIVITY_WINDOW_SECONDS: i64 = 30 * 60;

/// `clamp(1.6 - progress, 0.6, 1.6)`.
pub fn reward_multiplier(progress: f64) -> f64 {
    (1.6 - progress).clamp(0.6, 1.6)
}

/// `clamp(0.55 + 1.15*progress, 0.5, 1.7)`.
pub fn cooldown_multiplier(progress: f64) -> f64 {
    (0.55 + 1.15 * progress).clamp(0.5, 1.7)
}

/// `round(early - (early - late)*progress^1.1)`, lower-bounded by `late`.
pub fn daily_earn_cap(progress: f64, early: i64, late: i64) -> i64 {
    let raw = early as f64 - (early - late) as f64 * progress.clamp(0.0, 1.0).powf(1.1);
    (raw.round() as i64).max(late)
}

/// `(ok, wait)`: `ok=true` iff the cooldown has elapsed (or there is no prior
/// claim); otherwise `wait` is the remaining cooldown.
pub fn can_claim_faucet(
    last_claim: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    cooldown: Duration,
) -> (bool, Option<Duration>) {
    match last_claim {
        None => (true, None),
        Some(last) => {
            let elapsed = now - last;
            if elapsed >= cooldown {
                (true, None)
            } else {
                (false, Some(cooldown - elapsed))
            }
        }
    }
}

/// `(granted, remaining_after)`; fails with `DailyCapReached` when the cap is
/// already exhausted.
pub fn grant_coins_with_cap(
    daily_earn_total: i64,
    cap: i64,
    amount: i64,
) -> Result<(i64, i64), EconomyError> {
    let remaining = cap - daily_earn_total;
    if remaining <= 0 {
        return Err(EconomyError::DailyCapReached);
    }
    let granted = amount.min(remaining);
    Ok((granted, remaining - granted))
}

/// `GrantCoinsWithCap` (spec.md §6 public operation): resets the player's
/// daily earn bucket if the season day has turned over since their last
/// reset (I8), applies the progress-scaled cap, reserves from the shared
/// coin pool, and credits the wallet. Returns `(granted, remaining_after)`.
pub async fn grant_coins_with_cap_for_player<R: EconomyRepository>(
    repo: &R,
    state: &EconomyState,
    clock: &SeasonClock,
    player_id: &PlayerId,
    amount: i64,
    early: i64,
    late: i64,
    now: DateTime<Utc>,
) -> Result<(i64, i64), EconomyError> {
    let wallet = repo
        .player_wallet(player_id)
        .await?
        .ok_or_else(|| EconomyError::Other(format!("unknown player {player_id}")))?;

    let current_day = clock.season_day_index(now);
    let last_reset_day = clock.season_day_index(wallet.last_earn_reset_at);
    let daily_earn_total = if current_day != last_reset_day {
        repo.reset_daily_earn(player_id, now).await?;
        0
    } else {
        wallet.daily_earn_total
    };

    let cap = daily_earn_cap(clock.season_progress(now), early, late);
    let (granted, remaining) = grant_coins_with_cap(daily_earn_total, cap, amount)?;

    let (distributed, ok) = try_distribute_coins_with_priority(state, granted);
    if !ok {
        return Err(EconomyError::PoolExhausted);
    }

    repo.grant_coins(player_id, distributed, now, true).await?;
    Ok((distributed, remaining))
}

/// Result of one warmup update (spec.md §4.5 UBI tick).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WarmupUpdate {
    pub warmup: f64,
    pub recent_activity_seconds: i64,
}

/// Advances a player's activity-warmup level by `ticks_elapsed` minutes.
pub fn update_activity_warmup(
    active: bool,
    warmup: f64,
    recent_activity_seconds: i64,
    ticks_elapsed: f64,
) -> WarmupUpdate {
    if active {
        let new_warmup = (warmup + ticks_elapsed / 30.0).min(1.0);
        let added_seconds = (ticks_elapsed * 60.0).round() as i64;
        let cap = 2 * ACTIVITY_WINDOW_SECONDS;
        WarmupUpdate {
            warmup: new_warmup,
            recent_activity_seconds: (recent_activity_seconds + added_seconds).min(cap),
        }
    } else {
        let activity_ratio = (recent_activity_seconds as f64 / 1800.0).min(1.0);
        let decay_rate = 0.002 / (1.0 + 2.0 * activity_ratio);
        let new_warmup = (warmup - decay_rate * ticks_elapsed).max(0.0);
        let recent_decay_seconds = (ticks_elapsed * 60.0 * 0.5).round() as i64;
        WarmupUpdate {
            warmup: new_warmup,
            recent_activity_seconds: (recent_activity_seconds - recent_decay_seconds).max(0),
        }
    }
}

/// `baseUBI * (1 + warmup*9)`, in microcoins.
pub fn ubi_amount_microcoins(warmup: f64) -> i64 {
    (BASE_UBI_MICROCOINS as f64 * (1.0 + warmup * 9.0)).round() as i64
}

/// Whether a player counts as "active" this tick for warmup purposes.
pub fn is_active(last_active_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    (now - last_active_at) <= Duration::seconds(ACTIVITY_WINDOW_SECONDS)
}

/// Outcome of a single UBI distribution pass, for the tick loop to log and
/// notify on.
#[derive(Debug, Default)]
pub struct UbiTickOutcome {
    pub players_granted: u64,
    pub microcoins_granted: i64,
    pub pool_exhausted: bool,
}

/// Runs one UBI tick: refresh every player's warmup, grant scaled UBI,
/// bypassing the daily earn cap. Stops early and reports `pool_exhausted` if
/// the coin pool runs dry mid-pass (spec.md §4.5).
pub async fn distribute_universal_basic_income<R: EconomyRepository>(
    repo: &R,
    state: &EconomyState,
    now: DateTime<Utc>,
    ticks_elapsed: f64,
) -> Result<UbiTickOutcome, EconomyError> {
    let mut outcome = UbiTickOutcome::default();
    let players = repo.list_all_players().await?;

    for wallet in players {
        let active = is_active(wallet.last_active_at, now);
        let update = update_activity_warmup(
            active,
            wallet.activity_warmup_level,
            wallet.recent_activity_seconds,
            ticks_elapsed,
        );
        repo.update_activity_warmup(
            &wallet.player_id,
            update.warmup,
            now,
            update.recent_activity_seconds,
        )
        .await?;

        let ubi = ubi_amount_microcoins(update.warmup);
        let (granted, ok) = try_distribute_coins_with_priority(state, ubi);
        if !ok {
            outcome.pool_exhausted = true;
            tracing::warn!("UBI pass stopped early: coin pool exhausted");
            break;
        }

        repo.grant_coins(&wallet.player_id, granted, now, false)
            .await?;
        outcome.players_granted += 1;
        outcome.microcoins_granted += granted;
    }

    Ok(outcome)
}

/// Claims a named faucet for a player if its cooldown has elapsed, applying
/// season-progress scaling to both reward and cooldown.
pub async fn claim_faucet<R: EconomyRepository>(
    repo: &R,
    state: &EconomyState,
    player_id: &economy_types::PlayerId,
    key: FaucetKey,
    base_reward: i64,
    base_cooldown: Duration,
    progress: f64,
    now: DateTime<Utc>,
) -> Result<i64, EconomyError> {
    let cooldown = Duration::milliseconds(
        (base_cooldown.num_milliseconds() as f64 * cooldown_multiplier(progress)) as i64,
    );
    let last_claim = repo.faucet_last_claim(player_id, key).await?;
    let (ok, wait) = can_claim_faucet(last_claim, now, cooldown);
    if !ok {
        return Err(EconomyError::CooldownActive {
            remaining: wait
                .unwrap_or_else(Duration::zero)
                .to_std()
                .unwrap_or_default(),
        });
    }

    let reward = (base_reward as f64 * reward_multiplier(progress)).round() as i64;
    let (granted, distributed) = try_distribute_coins_with_priority(state, reward);
    if !distributed {
        return Err(EconomyError::PoolExhausted);
    }

    repo.grant_coins(player_id, granted, now, true).await?;
    repo.record_faucet_claim(player_id, key, now).await?;
    Ok(granted)
}
