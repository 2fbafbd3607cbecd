//! Everything the round loop needs to know about an encounter, derived once
//! from a campaign snapshot and a tier before the first round runs.

use serde::Serialize;

use crate::battle::BattleError;
use crate::campaign::Campaign;
use crate::catalog::{Character, EnemyAbility, Tier};
use crate::roster::{self, Stance, TeamMember};

const GIANT_HP_FACTOR: f64 = 1.3;
const COST_REDUCTION_MAIN: f64 = 0.6;
const STREAK_COST_DISCOUNT: f64 = 0.2;

/// Enemy ability flags in effect for one encounter. All false when sealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EnemyEffects {
    pub tough: bool,
    pub regen: bool,
    pub drain: bool,
    pub giant: bool,
    pub hard: bool,
    pub last_word: bool,
    pub stun: bool,
}

impl EnemyEffects {
    pub fn from_abilities(abilities: &[EnemyAbility]) -> Self {
        let mut fx = EnemyEffects::default();
        for ability in abilities {
            match ability {
                EnemyAbility::Tough => fx.tough = true,
                EnemyAbility::Regen => fx.regen = true,
                EnemyAbility::Drain => fx.drain = true,
                EnemyAbility::Giant => fx.giant = true,
                EnemyAbility::Hard => fx.hard = true,
                EnemyAbility::LastWord => fx.last_word = true,
                EnemyAbility::Stun => fx.stun = true,
                EnemyAbility::Spore => {}
            }
        }
        fx
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BattleModifiers {
    pub tier: Tier,
    pub rank: u8,
    pub base_hp: f64,
    pub effective_max_hp: f64,
    /// Roster index of the (first) `Main`.
    pub main: Option<usize>,
    /// Roster index of the sealing `Assist`, present only when sealed.
    pub sealer: Option<usize>,
    /// Roster index of the streak-bonus character in any stance.
    pub streak_holder: Option<usize>,
    pub sealed: bool,
    pub chtholly_assist: bool,
    pub ithea_assist: bool,
    pub rhantolk_assist: bool,
    pub nopht_assist: bool,
    /// The streak reference matches this tier.
    pub streak_active: bool,
    pub mana_cost_multiplier: f64,
    /// Abilities selected for the tier, whether or not they are sealed.
    pub selected: Vec<EnemyAbility>,
    pub effects: EnemyEffects,
}

fn holds(roster: &[TeamMember], name: Character, stance: Stance) -> bool {
    roster.iter().any(|m| m.is(name, stance))
}

/// Derives the encounter's modifiers. Pure: `campaign` is never touched.
pub fn resolve(campaign: &Campaign, tier: Tier) -> Result<BattleModifiers, BattleError> {
    let rules = campaign.rules();
    if !rules.allows_tier(tier) {
        return Err(BattleError::InvalidEnemy(tier.key().to_string()));
    }
    let roster = campaign.roster.as_slice();
    let stats = tier.stats();

    let main = roster::main_index(roster);
    let sealer = roster
        .iter()
        .position(|m| m.is(Character::Nephren, Stance::Assist));
    let sealed = sealer.is_some();

    let selected = campaign.enemy_ability_selections.selected(tier).to_vec();
    let effects = if sealed {
        EnemyEffects::default()
    } else {
        EnemyEffects::from_abilities(&selected)
    };

    let effective_max_hp = if effects.giant {
        stats.base_hp * GIANT_HP_FACTOR
    } else {
        stats.base_hp
    };

    let mana_cost_multiplier = match main.map(|i| roster[i].name) {
        Some(Character::Nephren) => COST_REDUCTION_MAIN,
        _ => 1.0,
    };

    Ok(BattleModifiers {
        tier,
        rank: tier.rank(),
        base_hp: stats.base_hp,
        effective_max_hp,
        main,
        sealer,
        streak_holder: roster.iter().position(|m| m.name == Character::Rhantolk),
        sealed,
        chtholly_assist: holds(roster, Character::Chtholly, Stance::Assist),
        ithea_assist: holds(roster, Character::Ithea, Stance::Assist),
        rhantolk_assist: holds(roster, Character::Rhantolk, Stance::Assist),
        nopht_assist: holds(roster, Character::Nopht, Stance::Assist),
        streak_active: rules.tracks_streak && campaign.last_defeated_tier == Some(tier),
        mana_cost_multiplier,
        selected,
        effects,
    })
}

impl BattleModifiers {
    /// Mana multiplier for one member's round cost, after the streak discount.
    pub fn cost_multiplier_for(&self, member: &TeamMember) -> f64 {
        if self.streak_active && member.is(Character::Rhantolk, Stance::Main) {
            (self.mana_cost_multiplier - STREAK_COST_DISCOUNT).max(0.0)
        } else {
            self.mana_cost_multiplier
        }
    }

    /// Scale applied to overdraft before it becomes erosion.
    pub fn erosion_multiplier(&self, stance: Stance) -> f64 {
        if self.ithea_assist && stance == Stance::Main {
            0.5
        } else {
            1.0
        }
    }

    /// Mana the sealing character pays before round one.
    pub fn seal_cost(&self) -> f64 {
        6.0 + f64::from(self.rank) * 2.0
    }

    /// Display names of the selected abilities, e.g. `Hard+Stun`.
    pub fn ability_label(&self) -> Option<String> {
        if self.selected.is_empty() {
            return None;
        }
        Some(
            self.selected
                .iter()
                .map(|a| a.display_name())
                .collect::<Vec<_>>()
                .join("+"),
        )
    }
}
