use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::battle::BattleError;

/// Enemy rarity class. Ordered weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    R,
    SR,
    SSR,
    UR,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::R, Tier::SR, Tier::SSR, Tier::UR];

    /// Ordinal rank 1..=4, used by every tier-scaled skill.
    pub const fn rank(self) -> u8 {
        match self {
            Tier::R => 1,
            Tier::SR => 2,
            Tier::SSR => 3,
            Tier::UR => 4,
        }
    }

    pub const fn stats(self) -> EnemyStats {
        match self {
            Tier::R => EnemyStats { tier: self, base_hp: 50.0, progress_reward: 5 },
            Tier::SR => EnemyStats { tier: self, base_hp: 90.0, progress_reward: 10 },
            Tier::SSR => EnemyStats { tier: self, base_hp: 140.0, progress_reward: 15 },
            Tier::UR => EnemyStats { tier: self, base_hp: 200.0, progress_reward: 20 },
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            Tier::R => "R",
            Tier::SR => "SR",
            Tier::SSR => "SSR",
            Tier::UR => "UR",
        }
    }

    pub fn from_key(key: &str) -> Option<Tier> {
        Tier::ALL
            .into_iter()
            .find(|t| t.key().eq_ignore_ascii_case(key.trim()))
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Tier {
    type Err = BattleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tier::from_key(s).ok_or_else(|| BattleError::InvalidEnemy(s.to_string()))
    }
}

/// Immutable catalog entry for one enemy tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyStats {
    #[serde(alias = "rarity")]
    pub tier: Tier,
    #[serde(alias = "hp")]
    pub base_hp: f64,
    #[serde(alias = "progress")]
    pub progress_reward: u32,
}

/// Special abilities an enemy can carry. Which ones are selectable depends on
/// the campaign's [`crate::rules::CampaignRules::catalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnemyAbility {
    /// Every hit deals 1 less damage.
    Tough,
    /// Restores 2 HP at the end of every round it survives.
    Regen,
    /// Every active member pays 0.5 mana at the start of each round.
    Drain,
    /// +30% max HP.
    Giant,
    /// Only the Main member can damage it.
    Hard,
    Spore,
    /// On death, the Main member loses 10 mana.
    LastWord,
    /// Standby members recover nothing after the fight.
    Stun,
}

impl EnemyAbility {
    pub const ALL: [EnemyAbility; 8] = [
        EnemyAbility::Tough,
        EnemyAbility::Regen,
        EnemyAbility::Drain,
        EnemyAbility::Giant,
        EnemyAbility::Hard,
        EnemyAbility::Spore,
        EnemyAbility::LastWord,
        EnemyAbility::Stun,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            EnemyAbility::Tough => "tough",
            EnemyAbility::Regen => "regen",
            EnemyAbility::Drain => "drain",
            EnemyAbility::Giant => "giant",
            EnemyAbility::Hard => "hard",
            EnemyAbility::Spore => "spore",
            EnemyAbility::LastWord => "lastWord",
            EnemyAbility::Stun => "stun",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            EnemyAbility::Tough => "Tough",
            EnemyAbility::Regen => "Regen",
            EnemyAbility::Drain => "Drain",
            EnemyAbility::Giant => "Giant",
            EnemyAbility::Hard => "Hard",
            EnemyAbility::Spore => "Spore",
            EnemyAbility::LastWord => "Last Word",
            EnemyAbility::Stun => "Stun",
        }
    }

    pub const fn effect(self) -> &'static str {
        match self {
            EnemyAbility::Tough => "Damage taken is reduced by 1",
            EnemyAbility::Regen => "Restores 2 HP every round",
            EnemyAbility::Drain => "Drains 0.5 mana from every active fairy each round",
            EnemyAbility::Giant => "Max HP increased by 30%",
            EnemyAbility::Hard => "Only takes damage from the Main fairy",
            EnemyAbility::Spore => "The sixth beast spawned on death gains one extra ability",
            EnemyAbility::LastWord => "On death, drains 10 mana from the Main fairy",
            EnemyAbility::Stun => "Standby fairies cannot recover mana after this battle",
        }
    }

    /// Parses a persisted key. Unknown keys (including the UI's `none`) yield `None`.
    pub fn from_key(key: &str) -> Option<EnemyAbility> {
        EnemyAbility::ALL.into_iter().find(|a| a.key() == key.trim())
    }
}

impl fmt::Display for EnemyAbility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// The fixed cast. Every roster member is one of these, and the name decides
/// which skills fire in battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Character {
    #[serde(alias = "珂朵莉")]
    Chtholly,
    #[serde(alias = "奈芙莲")]
    Nephren,
    #[serde(alias = "艾瑟雅")]
    Ithea,
    #[serde(alias = "兰朵露可")]
    Rhantolk,
    #[serde(alias = "诺夫特")]
    Nopht,
}

/// Human-readable skill text for both combat stances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkillText {
    pub main: &'static str,
    pub assist: &'static str,
}

impl Character {
    pub const fn name(self) -> &'static str {
        match self {
            Character::Chtholly => "Chtholly",
            Character::Nephren => "Nephren",
            Character::Ithea => "Ithea",
            Character::Rhantolk => "Rhantolk",
            Character::Nopht => "Nopht",
        }
    }

    pub const fn skills(self) -> SkillText {
        match self {
            Character::Chtholly => SkillText {
                main: "At battle start, instantly deals 10 + rarity x 20 damage",
                assist: "Other fairies deal +1 damage",
            },
            Character::Nephren => SkillText {
                main: "Mana cost of every fairy is reduced by 40%",
                assist: "Spends 6 + rarity x 2 mana to seal all enemy abilities",
            },
            Character::Ithea => SkillText {
                main: "Each hit deals an extra 2% of the enemy's max HP",
                assist: "Inspires the Main fairy: +1 damage (no stacking), overdraft erosion halved",
            },
            Character::Rhantolk => SkillText {
                main: "Against the same rarity as last time: +2 damage, mana cost -20%",
                assist: "No longer attacks; follows up every hit by others for 40% of its damage",
            },
            Character::Nopht => SkillText {
                main: "Fighting alone (everyone else on standby): +rarity damage",
                assist: "Each round adds 2% of the enemy's missing HP as damage",
            },
        }
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Blue,
    White,
    Yellow,
    Red,
}
