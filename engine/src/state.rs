use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api;
use crate::battle::{BattleError, BattleOutcome};
use crate::campaign::Campaign;
use crate::catalog::Tier;
use crate::history::{CampaignSnapshot, History, UndoSnapshot};
use crate::rules::CampaignKind;

/// Both campaigns, as persisted under one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub c1: Campaign,
    pub c2: Campaign,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            c1: Campaign::default_for(CampaignKind::First),
            c2: Campaign::default_for(CampaignKind::Second),
        }
    }
}

/// Top-level keys of older saves and their current names.
const LEGACY_KEYS: [(&str, &str); 6] = [
    ("erosion", "erosionDebt"),
    ("selectedEnemy", "selectedEnemyTier"),
    ("enemyAbilities", "enemyAbilitySelections"),
    ("lastTarget", "lastDefeatedTier"),
    ("team", "roster"),
    ("log", "battleLog"),
];

fn current_key(key: &str) -> &str {
    LEGACY_KEYS
        .iter()
        .find(|(old, _)| *old == key)
        .map_or(key, |(_, new)| *new)
}

/// Shallow-merges the saved campaign document over the default one, then
/// normalizes. Anything that still will not parse yields the default.
fn load_campaign(saved: Option<&Value>, kind: CampaignKind) -> Campaign {
    let fallback = Campaign::default_for(kind);
    let Some(Value::Object(saved)) = saved else {
        return fallback;
    };
    let Ok(Value::Object(mut merged)) = serde_json::to_value(&fallback) else {
        return fallback;
    };
    // the book is never inherited: tiers a save leaves out are filled from its
    // legacy single selection during normalization
    merged.remove("enemyAbilitySelections");
    for (key, value) in saved {
        merged.insert(current_key(key).to_string(), value.clone());
    }
    merged.insert("id".to_string(), Value::String(kind.key().to_string()));

    match serde_json::from_value::<Campaign>(Value::Object(merged)) {
        Ok(mut campaign) => {
            campaign.normalize();
            campaign
        }
        Err(e) => {
            tracing::warn!(campaign = %kind, error = %e, "unusable campaign record, using default");
            fallback
        }
    }
}

impl GameState {
    /// Loads persisted state, repairing whatever it can and defaulting the rest.
    pub fn from_json_lenient(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(root) => Self::from_value_lenient(&root),
            Err(e) => {
                tracing::warn!(error = %e, "unreadable game state, using defaults");
                GameState::default()
            }
        }
    }

    /// [`GameState::from_json_lenient`] for an already parsed document.
    pub fn from_value_lenient(root: &Value) -> Self {
        Self {
            c1: load_campaign(root.get("c1"), CampaignKind::First),
            c2: load_campaign(root.get("c2"), CampaignKind::Second),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn campaign(&self, kind: CampaignKind) -> &Campaign {
        match kind {
            CampaignKind::First => &self.c1,
            CampaignKind::Second => &self.c2,
        }
    }

    pub fn campaign_mut(&mut self, kind: CampaignKind) -> &mut Campaign {
        match kind {
            CampaignKind::First => &mut self.c1,
            CampaignKind::Second => &mut self.c2,
        }
    }

    pub fn snapshot(&self) -> UndoSnapshot {
        UndoSnapshot {
            c1: CampaignSnapshot::capture(&self.c1),
            c2: CampaignSnapshot::capture(&self.c2),
        }
    }

    pub fn restore(&mut self, snapshot: &UndoSnapshot) {
        snapshot.c1.restore(&mut self.c1);
        snapshot.c2.restore(&mut self.c2);
    }
}

/// The single long-lived game: owns the state and the undo stack and is the
/// only place commits happen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Game {
    pub state: GameState,
    pub history: History,
}

impl Game {
    pub fn new(state: GameState, history: History) -> Self {
        Self { state, history }
    }

    pub fn forecast(&self, kind: CampaignKind, tier: Tier) -> Result<BattleOutcome, BattleError> {
        api::forecast(self.state.campaign(kind), tier)
    }

    /// Commits a battle, pushing an undo snapshot of both campaigns first.
    /// A rejected battle leaves the history untouched.
    pub fn fight(&mut self, kind: CampaignKind, tier: Tier) -> Result<BattleOutcome, BattleError> {
        let snapshot = self.state.snapshot();
        let outcome = api::commit(self.state.campaign_mut(kind), tier)?;
        self.history.push(snapshot);
        Ok(outcome)
    }

    /// Restores the most recent snapshot. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(snapshot) => {
                self.state.restore(&snapshot);
                true
            }
            None => false,
        }
    }

    /// Replaces one campaign with its default and clears the shared history.
    pub fn reset(&mut self, kind: CampaignKind) {
        *self.state.campaign_mut(kind) = Campaign::default_for(kind);
        self.history.clear();
    }
}
