use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::campaign::{lenient_option, sanitize, Campaign};
use crate::catalog::Tier;

/// Undo snapshots kept before the oldest is dropped.
pub const HISTORY_CAP: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManaSnapshot {
    pub id: String,
    #[serde(alias = "mana")]
    pub mana_pool: f64,
}

/// The fields of one campaign that undo restores. Stance edits and the battle
/// log survive an undo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignSnapshot {
    pub progress: f64,
    #[serde(alias = "erosion")]
    pub erosion_debt: f64,
    #[serde(
        default,
        alias = "lastTarget",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_option"
    )]
    pub last_defeated_tier: Option<Tier>,
    #[serde(alias = "team")]
    pub roster: Vec<ManaSnapshot>,
}

impl CampaignSnapshot {
    pub fn capture(campaign: &Campaign) -> Self {
        Self {
            progress: campaign.progress,
            erosion_debt: campaign.erosion_debt,
            last_defeated_tier: campaign
                .last_defeated_tier
                .filter(|_| campaign.rules().tracks_streak),
            roster: campaign
                .roster
                .iter()
                .map(|m| ManaSnapshot { id: m.id.clone(), mana_pool: m.mana_pool })
                .collect(),
        }
    }

    /// Writes the snapshot back, clamped to the same bounds a loaded save gets.
    pub fn restore(&self, campaign: &mut Campaign) {
        let rules = campaign.rules();
        campaign.progress = sanitize(self.progress, 0.0, 100.0);
        campaign.erosion_debt = sanitize(self.erosion_debt, 0.0, f64::MAX);
        if rules.tracks_streak {
            if let Some(tier) = self.last_defeated_tier.filter(|t| rules.allows_tier(*t)) {
                campaign.last_defeated_tier = Some(tier);
            }
        }
        for saved in &self.roster {
            if let Some(member) = campaign.roster.iter_mut().find(|m| m.id == saved.id) {
                member.mana_pool = sanitize(saved.mana_pool, 0.0, 100.0);
            }
        }
    }
}

/// Snapshot of both campaigns, taken before every commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoSnapshot {
    pub c1: CampaignSnapshot,
    pub c2: CampaignSnapshot,
}

/// Bounded undo stack shared by both campaigns.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct History {
    entries: VecDeque<UndoSnapshot>,
}

impl History {
    /// Parses a persisted stack; anything unreadable becomes an empty stack.
    pub fn from_json_lenient(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(root) => Self::from_value_lenient(&root),
            Err(e) => {
                tracing::warn!(error = %e, "unreadable undo history, starting empty");
                History::default()
            }
        }
    }

    /// Snapshot by snapshot: unreadable ones are dropped, the rest kept in
    /// order and capped.
    pub fn from_value_lenient(root: &Value) -> Self {
        let mut history = History::default();
        let Some(items) = root.as_array() else {
            if !root.is_null() {
                tracing::warn!("undo history is not a list, starting empty");
            }
            return history;
        };
        for (index, item) in items.iter().enumerate() {
            match UndoSnapshot::deserialize(item) {
                Ok(snapshot) => history.push(snapshot),
                Err(e) => tracing::warn!(index, error = %e, "dropped unreadable undo snapshot"),
            }
        }
        history
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn push(&mut self, snapshot: UndoSnapshot) {
        self.entries.push_back(snapshot);
        while self.entries.len() > HISTORY_CAP {
            self.entries.pop_front();
        }
    }

    pub fn pop(&mut self) -> Option<UndoSnapshot> {
        self.entries.pop_back()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
