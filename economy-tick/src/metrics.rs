// SPDX-License-Identifier: Apache-2.0, MIT
//! Tick-loop observability (spec.md's ambient stack: every module the tick
//! loop drives gets a counter or gauge here rather than a log line alone).

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct OutcomeLabels {
    outcome: &'static str,
}

pub struct TickMetrics {
    pub ticks_total: Family<OutcomeLabels, Counter>,
    pub tick_duration_seconds: Histogram,
    pub pool_exhausted_total: Counter,
    pub abuse_signals_applied_total: Counter,
    pub ubi_players_granted_total: Counter,
    pub emission_throttled_total: Counter,
    pub market_pressure: Gauge<f64, std::sync::atomic::AtomicU64>,
    pub star_price_microcoins: Gauge,
    pub coin_pool_available: Gauge,
}

impl TickMetrics {
    pub fn new(registry: &mut Registry) -> Self {
        let ticks_total = Family::default();
        registry.register(
            "economy_tick_total",
            "Ticks completed, by outcome (leader, follower, season_ended)",
            ticks_total.clone(),
        );

        let tick_duration_seconds = Histogram::new(
            [0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5].into_iter(),
        );
        registry.register(
            "economy_tick_duration_seconds",
            "Wall time spent in the tick body when this replica is leader",
            tick_duration_seconds.clone(),
        );

        let pool_exhausted_total = Counter::default();
        registry.register(
            "economy_pool_exhausted_total",
            "Coin-pool exhaustion events across faucets, UBI and capped grants",
            pool_exhausted_total.clone(),
        );

        let abuse_signals_applied_total = Counter::default();
        registry.register(
            "economy_abuse_signals_applied_total",
            "Abuse signals applied during the tick's monitoring pass",
            abuse_signals_applied_total.clone(),
        );

        let ubi_players_granted_total = Counter::default();
        registry.register(
            "economy_ubi_players_granted_total",
            "Players granted UBI during the tick's distribution pass",
            ubi_players_granted_total.clone(),
        );

        let emission_throttled_total = Counter::default();
        registry.register(
            "economy_emission_throttled_total",
            "Ticks where effective emission fell to 70% or below of CBase",
            emission_throttled_total.clone(),
        );

        let market_pressure = Gauge::default();
        registry.register(
            "economy_market_pressure",
            "Current market-pressure multiplier",
            market_pressure.clone(),
        );

        let star_price_microcoins = Gauge::default();
        registry.register(
            "economy_star_price_microcoins",
            "Current authoritative star price in microcoins",
            star_price_microcoins.clone(),
        );

        let coin_pool_available = Gauge::default();
        registry.register(
            "economy_coin_pool_available",
            "globalCoinPool minus coinsDistributed",
            coin_pool_available.clone(),
        );

        TickMetrics {
            ticks_total,
            tick_duration_seconds,
            pool_exhausted_total,
            abuse_signals_applied_total,
            ubi_players_granted_total,
            emission_throttled_total,
            market_pressure,
            star_price_microcoins,
            coin_pool_available,
        }
    }

    pub fn record_outcome(&self, outcome: &'static str) {
        self.ticks_total
            .get_or_create(&OutcomeLabels { outcome })
            .inc();
    }
}
