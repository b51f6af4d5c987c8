// SPDX-License-Identifier: Apache-2.0, MIT
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use economy_storage::EconomyRepository;
use economy_types::{AbuseSignal, EconomyError, Severity};

/// Options shared by every detector this tick.
#[derive(Clone, Copy, Debug)]
pub struct DetectorOptions {
    pub include_bots: bool,
    /// Identifies this tick for the `(player_id, tick_id)` de-duplication
    /// the IP-cluster detector needs (spec.md §9 Open Question 2).
    pub tick_id: i64,
}

/// A detector is a value implementing `collect`; the engine composes an
/// ordered list of them without any of them knowing about apply/decay
/// (spec.md §9 design note).
#[async_trait]
pub trait SignalDetector: Send + Sync {
    fn name(&self) -> &'static str;
    async fn collect(
        &self,
        repo: &dyn EconomyRepository,
        now: DateTime<Utc>,
        options: &DetectorOptions,
    ) -> Result<Vec<AbuseSignal>, EconomyError>;
}

fn interval_stats(mut timestamps: Vec<DateTime<Utc>>) -> Option<(f64, f64)> {
    if timestamps.len() < 2 {
        return None;
    }
    timestamps.sort();
    let intervals: Vec<f64> = timestamps
        .windows(2)
        .map(|w| (w[1] - w[0]).num_milliseconds() as f64 / 1000.0)
        .collect();
    let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
    let variance =
        intervals.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / intervals.len() as f64;
    Some((mean, variance.sqrt()))
}

/// 1. `>= 6` star purchases in 10 minutes.
pub struct PurchaseBurstDetector;

#[async_trait]
impl SignalDetector for PurchaseBurstDetector {
    fn name(&self) -> &'static str {
        "purchase_burst"
    }

    async fn collect(
        &self,
        repo: &dyn EconomyRepository,
        now: DateTime<Utc>,
        options: &DetectorOptions,
    ) -> Result<Vec<AbuseSignal>, EconomyError> {
        let counts = repo
            .purchase_counts_by_player(now - Duration::minutes(10), options.include_bots, 6)
            .await?;
        Ok(counts
            .into_iter()
            .map(|(player_id, count)| AbuseSignal {
                player_id,
                event_type: self.name().to_string(),
                delta: 1.2 * (count - 5) as f64,
                severity: Severity::Low,
                details: serde_json::json!({ "count": count, "window_minutes": 10 }),
            })
            .collect())
    }
}

/// 2. `>= 6` purchases in 60m with mean interval <= 180s and stddev <= 2.0s.
pub struct RegularPurchaseCadenceDetector;

#[async_trait]
impl SignalDetector for RegularPurchaseCadenceDetector {
    fn name(&self) -> &'static str {
        "regular_purchase_cadence"
    }

    async fn collect(
        &self,
        repo: &dyn EconomyRepository,
        now: DateTime<Utc>,
        options: &DetectorOptions,
    ) -> Result<Vec<AbuseSignal>, EconomyError> {
        let by_player = repo
            .purchase_timestamps_by_player(now - Duration::minutes(60), options.include_bots)
            .await?;

        let mut signals = Vec::new();
        for (player_id, timestamps) in by_player {
            if timestamps.len() < 6 {
                continue;
            }
            if let Some((mean, stddev)) = interval_stats(timestamps.clone()) {
                if mean <= 180.0 && stddev <= 2.0 {
                    signals.push(AbuseSignal {
                        player_id,
                        event_type: self.name().to_string(),
                        delta: 2.5,
                        severity: Severity::Medium,
                        details: serde_json::json!({
                            "count": timestamps.len(),
                            "mean_interval_seconds": mean,
                            "stddev_seconds": stddev,
                        }),
                    });
                }
            }
        }
        Ok(signals)
    }
}

/// 3. `>= 6` activity-coin events in 60m with mean <= 240s and stddev <= 3.0s.
pub struct RegularActivityCadenceDetector;

#[async_trait]
impl SignalDetector for RegularActivityCadenceDetector {
    fn name(&self) -> &'static str {
        "regular_activity_cadence"
    }

    async fn collect(
        &self,
        repo: &dyn EconomyRepository,
        now: DateTime<Utc>,
        options: &DetectorOptions,
    ) -> Result<Vec<AbuseSignal>, EconomyError> {
        let by_player = repo
            .activity_timestamps_by_player(now - Duration::minutes(60), options.include_bots)
            .await?;

        let mut signals = Vec::new();
        for (player_id, timestamps) in by_player {
            if timestamps.len() < 6 {
                continue;
            }
            if let Some((mean, stddev)) = interval_stats(timestamps.clone()) {
                if mean <= 240.0 && stddev <= 3.0 {
                    signals.push(AbuseSignal {
                        player_id,
                        event_type: self.name().to_string(),
                        delta: 2.0,
                        severity: Severity::Low,
                        details: serde_json::json!({
                            "count": timestamps.len(),
                            "mean_interval_seconds": mean,
                            "stddev_seconds": stddev,
                        }),
                    });
                }
            }
        }
        Ok(signals)
    }
}

/// 4. `>= 3` purchases in 30m at the edge of the minute (seconds <= 2 or >= 58).
pub struct TickEdgeBurstDetector;

#[async_trait]
impl SignalDetector for TickEdgeBurstDetector {
    fn name(&self) -> &'static str {
        "tick_edge_burst"
    }

    async fn collect(
        &self,
        repo: &dyn EconomyRepository,
        now: DateTime<Utc>,
        options: &DetectorOptions,
    ) -> Result<Vec<AbuseSignal>, EconomyError> {
        let counts = repo
            .tick_edge_purchase_counts(now - Duration::minutes(30), options.include_bots, 3)
            .await?;
        Ok(counts
            .into_iter()
            .map(|(player_id, count)| AbuseSignal {
                player_id,
                event_type: self.name().to_string(),
                delta: 0.8 * count as f64,
                severity: Severity::Low,
                details: serde_json::json!({ "count": count, "window_minutes": 30 }),
            })
            .collect())
    }
}

/// 5. An IP with `>= 3` distinct purchasing players in 10m; every player on
/// that IP is signalled. De-duplicated per `(player_id, tick_id)` by the
/// caller (spec.md §9 Open Question 2) since a player transacting from
/// multiple clustered IPs in the same tick would otherwise double-apply.
pub struct IpClusterDetector;

#[async_trait]
impl SignalDetector for IpClusterDetector {
    fn name(&self) -> &'static str {
        "ip_cluster"
    }

    async fn collect(
        &self,
        repo: &dyn EconomyRepository,
        now: DateTime<Utc>,
        options: &DetectorOptions,
    ) -> Result<Vec<AbuseSignal>, EconomyError> {
        let window_start = now - Duration::minutes(10);
        let clusters = repo
            .ip_purchase_clusters(window_start, window_start, options.include_bots, 3)
            .await?;

        let mut signals = Vec::new();
        for (ip, distinct_purchasers, players) in clusters {
            let delta = 0.7 * distinct_purchasers as f64;
            for player_id in players {
                signals.push(AbuseSignal {
                    player_id,
                    event_type: self.name().to_string(),
                    delta,
                    severity: Severity::Medium,
                    details: serde_json::json!({ "ip": ip, "distinct_purchasers": distinct_purchasers, "tick_id": options.tick_id }),
                });
            }
        }
        Ok(signals)
    }
}

pub fn default_detectors() -> Vec<Box<dyn SignalDetector>> {
    vec![
        Box::new(PurchaseBurstDetector),
        Box::new(RegularPurchaseCadenceDetector),
        Box::new(RegularActivityCadenceDetector),
        Box::new(TickEdgeBurstDetector),
        Box::new(IpClusterDetector),
    ]
}

/// Runs every detector, logging and skipping any that error (spec.md §7:
/// "one bad row never blocks the batch"), then de-duplicates `ip_cluster`
/// signals per player so a multi-IP player this tick is only scored once.
pub async fn collect_all_signals(
    repo: &dyn EconomyRepository,
    detectors: &[Box<dyn SignalDetector>],
    now: DateTime<Utc>,
    options: &DetectorOptions,
) -> Vec<AbuseSignal> {
    let mut all = Vec::new();
    for detector in detectors {
        match detector.collect(repo, now, options).await {
            Ok(signals) => all.extend(signals),
            Err(err) => {
                tracing::warn!(detector = detector.name(), error = %err, "signal detector failed, skipping");
            }
        }
    }
    dedupe_ip_cluster_signals(all)
}

fn dedupe_ip_cluster_signals(signals: Vec<AbuseSignal>) -> Vec<AbuseSignal> {
    use std::collections::HashMap;

    let mut best_ip_signal: HashMap<economy_types::PlayerId, AbuseSignal> = HashMap::new();
    let mut others = Vec::new();

    for signal in signals {
        if signal.event_type == "ip_cluster" {
            best_ip_signal
                .entry(signal.player_id.clone())
                .and_modify(|existing| {
                    if signal.delta > existing.delta {
                        *existing = signal.clone();
                    }
                })
                .or_insert(signal);
        } else {
            others.push(signal);
        }
    }

    others.extend(best_ip_signal.into_values());
    others
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_stats_needs_at_least_two_points() {
        assert!(interval_stats(vec![Utc::now()]).is_none());
    }

    #[test]
    fn dedupe_keeps_one_ip_cluster_signal_per_player() {
        let player = economy_types::PlayerId::from("p1");
        let signals = vec![
            AbuseSignal {
                player_id: player.clone(),
                event_type: "ip_cluster".into(),
                delta: 2.1,
                severity: Severity::Medium,
                details: serde_json::json!({}),
            },
            AbuseSignal {
                player_id: player.clone(),
                event_type: "ip_cluster".into(),
                delta: 3.5,
                severity: Severity::Medium,
                details: serde_json::json!({}),
            },
        ];
        let deduped = dedupe_ip_cluster_signals(signals);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].delta, 3.5);
    }
}
