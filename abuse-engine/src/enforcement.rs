// SPDX-License-Identifier: Apache-2.0, MIT
use economy_storage::EconomyRepository;
use economy_types::{severity_for_score, AbuseEnforcement, EconomyError, PlayerId, SeasonId, Severity};

/// Combined score/severity across per-player seasonal state and per-account
/// reputation, then the derived enforcement matrix row (spec.md §4.8
/// "Effective enforcement"). Bots are excluded unless `include_bots`.
pub async fn effective_enforcement<R: EconomyRepository>(
    repo: &R,
    player_id: &PlayerId,
    season_id: &SeasonId,
    base_max_bulk: i64,
    include_bots: bool,
) -> Result<AbuseEnforcement, EconomyError> {
    if !include_bots && repo.is_bot(player_id).await? {
        return Ok(Severity::None.enforcement(0.0, base_max_bulk));
    }

    let season_state = repo.player_abuse_state(player_id, season_id).await?;
    let season_score = season_state.as_ref().map(|s| s.score).unwrap_or(0.0);
    let season_severity = season_state.as_ref().map(|s| s.severity).unwrap_or(Severity::None);

    let account_reputation = match repo.account_id_for_player(player_id).await? {
        Some(account_id) => repo.account_abuse_reputation(&account_id).await?,
        None => None,
    };
    let account_score = account_reputation.as_ref().map(|r| r.score).unwrap_or(0.0);
    let account_severity = account_reputation
        .as_ref()
        .map(|r| r.severity)
        .unwrap_or(Severity::None);

    let combined_score = season_score.max(0.75 * account_score);
    let combined_severity = season_severity
        .max(account_severity)
        .max(severity_for_score(combined_score));

    Ok(combined_severity.enforcement(combined_score, base_max_bulk))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_score_uses_account_reputation_discount() {
        let season_score = 5.0;
        let account_score = 40.0;
        let combined = season_score.max(0.75 * account_score);
        assert_eq!(combined, 30.0);
        assert_eq!(severity_for_score(combined), Severity::Medium);
    }
}
