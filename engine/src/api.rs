use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::battle::{self, BattleError, BattleOutcome};
use crate::campaign::Campaign;
use crate::catalog::Tier;
use crate::journal::LogEntry;
use crate::modifiers;
use crate::roster;

/// Previews a battle without touching `campaign`.
///
/// Works on a deep copy whose surplus `Main`s are demoted first. A formation
/// that still cannot fight yields a zero-effect outcome instead of an error;
/// only an unplayable tier is reported.
pub fn forecast(campaign: &Campaign, tier: Tier) -> Result<BattleOutcome, BattleError> {
    let mut snapshot = campaign.clone();
    roster::ensure_single_main(&mut snapshot.roster, None);

    if roster::check_formation(&snapshot.roster).is_err() {
        let mods = modifiers::resolve(&snapshot, tier)?;
        return Ok(BattleOutcome::idle(&snapshot, &mods));
    }
    battle::resolve(&mut snapshot, tier, false)
}

/// Fights for real and logs the result, stamping the entry with the current time.
pub fn commit(campaign: &mut Campaign, tier: Tier) -> Result<BattleOutcome, BattleError> {
    commit_at(campaign, tier, Utc::now())
}

/// [`commit`] with an explicit log timestamp.
///
/// The formation is validated strictly: nothing is repaired, and on error the
/// campaign is left exactly as it was.
pub fn commit_at(
    campaign: &mut Campaign,
    tier: Tier,
    ts: DateTime<Utc>,
) -> Result<BattleOutcome, BattleError> {
    let outcome = battle::resolve(campaign, tier, true)?;
    let seq = campaign.battle_log.first().map_or(1, |newest| newest.seq + 1);
    let entry = LogEntry::record(seq, ts, &outcome, &campaign.roster);
    campaign.push_log(entry);
    Ok(outcome)
}

/// Forecast for one tier as shown on an enemy picker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierPreview {
    pub tier: Tier,
    /// Whether the live formation could commit this battle.
    pub ready: bool,
    pub outcome: BattleOutcome,
    /// Net mana cost per progress point; absent when not ready or force-stopped.
    pub cost_per_progress: Option<f64>,
}

/// Forecasts every tier the campaign allows, in tier order.
pub fn forecast_all(campaign: &Campaign) -> Result<Vec<TierPreview>, BattleError> {
    let ready = campaign.readiness().is_ok();
    campaign
        .rules()
        .allowed_tiers
        .iter()
        .map(|tier| {
            let outcome = forecast(campaign, *tier)?;
            let cost_per_progress = if ready && !outcome.forced_stop {
                outcome.cost_per_progress()
            } else {
                None
            };
            Ok(TierPreview { tier: *tier, ready, outcome, cost_per_progress })
        })
        .collect()
}
