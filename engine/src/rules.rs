use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{EnemyAbility, Tier};

/// Which of the two independent campaigns a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CampaignKind {
    #[serde(rename = "c1")]
    First,
    #[serde(rename = "c2")]
    Second,
}

/// Capability descriptor that parameterizes the shared resolution core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CampaignRules {
    pub kind: CampaignKind,
    pub allowed_tiers: &'static [Tier],
    pub catalog: &'static [EnemyAbility],
    /// 1 = single-select, 2 = two independent slots.
    pub ability_slots: usize,
    pub default_ability: EnemyAbility,
    /// Whether victories record a tier for the streak bonus.
    pub tracks_streak: bool,
}

const FIRST_RULES: CampaignRules = CampaignRules {
    kind: CampaignKind::First,
    allowed_tiers: &[Tier::R, Tier::SR, Tier::SSR, Tier::UR],
    catalog: &[
        EnemyAbility::Tough,
        EnemyAbility::Regen,
        EnemyAbility::Drain,
        EnemyAbility::Giant,
    ],
    ability_slots: 1,
    default_ability: EnemyAbility::Tough,
    tracks_streak: false,
};

const SECOND_RULES: CampaignRules = CampaignRules {
    kind: CampaignKind::Second,
    allowed_tiers: &[Tier::SR, Tier::SSR, Tier::UR],
    catalog: &[
        EnemyAbility::Hard,
        EnemyAbility::Spore,
        EnemyAbility::LastWord,
        EnemyAbility::Stun,
    ],
    ability_slots: 2,
    default_ability: EnemyAbility::Hard,
    tracks_streak: true,
};

impl CampaignKind {
    pub const ALL: [CampaignKind; 2] = [CampaignKind::First, CampaignKind::Second];

    pub const fn rules(self) -> &'static CampaignRules {
        match self {
            CampaignKind::First => &FIRST_RULES,
            CampaignKind::Second => &SECOND_RULES,
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            CampaignKind::First => "c1",
            CampaignKind::Second => "c2",
        }
    }

    pub fn from_key(key: &str) -> Option<CampaignKind> {
        CampaignKind::ALL
            .into_iter()
            .find(|k| k.key().eq_ignore_ascii_case(key.trim()))
    }
}

impl fmt::Display for CampaignKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl CampaignRules {
    pub fn allows_tier(&self, tier: Tier) -> bool {
        self.allowed_tiers.contains(&tier)
    }

    pub fn offers(&self, ability: EnemyAbility) -> bool {
        self.catalog.contains(&ability)
    }

    /// First allowed tier; the fallback for any repaired tier reference.
    pub fn default_tier(&self) -> Tier {
        self.allowed_tiers.first().copied().unwrap_or(Tier::R)
    }
}
