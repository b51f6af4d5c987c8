// SPDX-License-Identifier: Apache-2.0, MIT
//! Signal collection, scoring, decay, and derived enforcement (spec.md §4.8).

pub mod apply;
pub mod decay;
pub mod detectors;
pub mod enforcement;
pub mod jitter;

pub use apply::apply_signal;
pub use decay::decay_pass;
pub use detectors::{collect_all_signals, default_detectors, DetectorOptions, SignalDetector};
pub use enforcement::effective_enforcement;
pub use jitter::{cooldown_jitter, FixedJitter, Jitter, SeededJitter};

use chrono::{DateTime, Utc};
use economy_storage::EconomyRepository;
use economy_types::{EconomyError, SeasonId};

/// One full tick's worth of abuse monitoring: decay, then collect, then
/// apply (spec.md §5 "abuse decay precedes signal application in the same
/// tick").
pub async fn update_abuse_monitoring<R: EconomyRepository>(
    repo: &R,
    season_id: &SeasonId,
    detectors: &[Box<dyn SignalDetector>],
    now: DateTime<Utc>,
    options: &DetectorOptions,
) -> Result<usize, EconomyError> {
    decay_pass(repo, season_id, now).await?;

    let signals = collect_all_signals(repo as &dyn EconomyRepository, detectors, now, options).await;
    let applied = signals.len();
    for signal in &signals {
        if let Err(err) = apply_signal(repo, signal, season_id, now).await {
            tracing::warn!(
                player_id = %signal.player_id,
                event_type = %signal.event_type,
                error = %err,
                "failed to apply abuse signal, skipping"
            );
        }
    }
    Ok(applied)
}
