// SPDX-License-Identifier: Apache-2.0, MIT
use economy_types::{CalibrationParams, EconomyError, Microcoins, SeasonEconomy, SeasonId};
use parking_lot::Mutex;

const PRESSURE_MIN: f64 = 0.6;
const PRESSURE_MAX: f64 = 1.8;

/// Process-wide mutable economy ledger behind a single mutex (spec.md §4.3,
/// §5). All accessors are short critical sections; no I/O happens under the
/// lock. Owned explicitly by the tick coordinator and shared by reference —
/// there is no process-global singleton.
pub struct EconomyState {
    inner: Mutex<SeasonEconomy>,
}

impl EconomyState {
    pub fn new(season_id: SeasonId) -> Self {
        EconomyState {
            inner: Mutex::new(SeasonEconomy::new(season_id)),
        }
    }

    pub fn load(economy: SeasonEconomy) -> Self {
        EconomyState {
            inner: Mutex::new(economy),
        }
    }

    /// Consistent point-in-time copy of every field.
    pub fn snapshot(&self) -> SeasonEconomy {
        self.inner.lock().clone()
    }

    /// Advances the season-wide stars-sold counter that feeds the pricing
    /// oracle's scarcity term.
    pub fn increment_stars(&self, count: i64) -> i64 {
        let mut guard = self.inner.lock();
        guard.stars_sold += count;
        guard.stars_sold
    }

    pub fn stars_sold(&self) -> i64 {
        self.inner.lock().stars_sold
    }

    pub fn current_star_price(&self) -> Microcoins {
        self.inner.lock().current_star_price
    }

    pub fn set_current_star_price(&self, price: Microcoins) {
        self.inner.lock().current_star_price = price;
    }

    /// Seeds `price_floor <- max(floor, p0)` and `daily_emission_target <-
    /// c_base`, per spec.md §4.3.
    pub fn set_calibration(&self, params: &CalibrationParams) {
        let mut guard = self.inner.lock();
        guard.price_floor = guard.price_floor.max(params.p0);
        guard.daily_emission_target = params.c_base;
    }

    pub fn market_pressure(&self) -> f64 {
        self.inner.lock().market_pressure
    }

    /// Clamps `target` into `[0.6, 1.8]` and moves current pressure toward it
    /// by at most `max_delta` (spec.md I3/I4).
    pub fn update_market_pressure(&self, target: f64, max_delta: f64) -> f64 {
        let target = target.clamp(PRESSURE_MIN, PRESSURE_MAX);
        let mut guard = self.inner.lock();
        let current = guard.market_pressure;
        let delta = (target - current).clamp(-max_delta.abs(), max_delta.abs());
        let updated = (current + delta).clamp(PRESSURE_MIN, PRESSURE_MAX);
        guard.market_pressure = updated;
        updated
    }

    /// Returns `max(p, floor)`; ratchets the floor up to `p` if `p > floor`.
    /// The floor never decreases within a process (I2).
    pub fn apply_price_floor(&self, p: i64) -> i64 {
        let mut guard = self.inner.lock();
        if p > guard.price_floor {
            guard.price_floor = p;
        }
        p.max(guard.price_floor)
    }

    pub fn price_floor(&self) -> i64 {
        self.inner.lock().price_floor
    }

    pub fn available_coins(&self) -> i64 {
        let guard = self.inner.lock();
        guard.global_coin_pool - guard.coins_distributed
    }

    /// Atomic checkpoint: succeeds iff `available >= n`. The only contended
    /// global budget in the system (spec.md §5); every faucet, UBI grant and
    /// earn-capped grant reserves through this.
    pub fn try_distribute_coins(&self, n: i64) -> Result<(), EconomyError> {
        let mut guard = self.inner.lock();
        let available = guard.global_coin_pool - guard.coins_distributed;
        if available < n {
            tracing::warn!(requested = n, available, "coin pool exhausted");
            return Err(EconomyError::PoolExhausted);
        }
        guard.coins_distributed += n;
        Ok(())
    }

    /// Mints `amount` coins into the pool (tick-loop emission only).
    pub fn mint_into_pool(&self, amount: i64) {
        self.inner.lock().global_coin_pool += amount;
    }

    pub fn set_daily_emission_target(&self, target: i64) {
        self.inner.lock().daily_emission_target = target;
    }

    pub fn daily_emission_target(&self) -> i64 {
        self.inner.lock().daily_emission_target
    }

    /// Adds `per_minute` to the fractional carry, mints the integer part into
    /// the pool, and returns how many whole coins were minted this call
    /// (spec.md §4.9 step 5).
    pub fn accrue_emission(&self, per_minute: f64) -> i64 {
        let mut guard = self.inner.lock();
        guard.emission_remainder += per_minute;
        let minted = guard.emission_remainder.floor();
        guard.emission_remainder -= minted;
        let minted = minted as i64;
        guard.global_coin_pool += minted;
        minted
    }

    pub fn current_price_tick(&self) -> i64 {
        self.inner.lock().current_price_tick
    }

    pub fn set_current_price_tick(&self, tick: i64) {
        self.inner.lock().current_price_tick = tick;
    }
}

/// Throttles `amount` to what remains in the pool, then performs an atomic
/// [`EconomyState::try_distribute_coins`]. Returns the amount actually
/// granted; `ok=false` when nothing could be distributed.
pub fn try_distribute_coins_with_priority(
    state: &EconomyState,
    amount: i64,
) -> (i64, bool) {
    let available = state.available_coins();
    if available <= 0 || amount <= 0 {
        return (0, false);
    }
    let granted = amount.min(available);
    match state.try_distribute_coins(granted) {
        Ok(()) => (granted, true),
        Err(_) => (0, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_pool(pool: i64) -> EconomyState {
        let state = EconomyState::new(SeasonId::from("season-1"));
        state.mint_into_pool(pool);
        state
    }

    #[test]
    fn try_distribute_coins_respects_pool() {
        let state = state_with_pool(100);
        assert!(state.try_distribute_coins(60).is_ok());
        assert!(state.try_distribute_coins(60).is_err());
        assert_eq!(state.available_coins(), 40);
    }

    #[test]
    fn price_floor_ratchets_up_never_down() {
        let state = state_with_pool(0);
        assert_eq!(state.apply_price_floor(50), 50);
        assert_eq!(state.apply_price_floor(30), 50);
        assert_eq!(state.price_floor(), 50);
    }

    #[test]
    fn market_pressure_rate_limited_and_bounded() {
        let state = state_with_pool(0);
        for _ in 0..10 {
            state.update_market_pressure(2.5, 0.02 / 60.0);
        }
        let pressure = state.market_pressure();
        assert!(pressure > 1.0 && pressure < 1.01);
        assert!(pressure <= 1.8 && pressure >= 0.6);
    }

    #[test]
    fn distribute_with_priority_throttles_to_available() {
        let state = state_with_pool(10);
        let (granted, ok) = try_distribute_coins_with_priority(&state, 100);
        assert!(ok);
        assert_eq!(granted, 10);
        assert_eq!(state.available_coins(), 0);
    }

    #[test]
    fn set_calibration_seeds_floor_and_target() {
        let state = state_with_pool(0);
        let params = sample_calibration();
        state.set_calibration(&params);
        assert_eq!(state.price_floor(), params.p0);
        assert_eq!(state.daily_emission_target(), params.c_base);
    }

    #[test]
    fn increment_stars_accumulates() {
        let state = state_with_pool(0);
        assert_eq!(state.increment_stars(3), 3);
        assert_eq!(state.increment_stars(2), 5);
        assert_eq!(state.stars_sold(), 5);
    }

    fn sample_calibration() -> CalibrationParams {
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
}
