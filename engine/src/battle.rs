use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::campaign::Campaign;
use crate::catalog::{Character, EnemyStats, Tier};
use crate::modifiers::{self, BattleModifiers};
use crate::roster::{self, Stance, TeamMember};

/// Below this, HP and erosion residue count as zero.
pub const EPSILON: f64 = 1e-6;
/// A single member's erosion within one encounter may not exceed this.
pub const EROSION_STOP_THRESHOLD: f64 = 200.0;

const BASE_DAMAGE: f64 = 2.0;
const DRAIN_COST: f64 = 0.5;
const REGEN_HP: f64 = 2.0;
const LAST_WORD_COST: f64 = 10.0;
const FOLLOW_UP_RATIO: f64 = 0.4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BattleError {
    #[error("invalid enemy '{0}'")]
    InvalidEnemy(String),
    #[error("exactly one Main is required among active members, found {mains}")]
    InvalidFormation { mains: usize },
    #[error("at least one member must be active (Main or Assist)")]
    NoActiveMembers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberOutcome {
    pub id: String,
    pub name: Character,
    pub stance: Stance,
    pub mana_before: f64,
    pub spent_mana: f64,
    pub erosion_accrued: f64,
    pub mana_after: f64,
}

impl MemberOutcome {
    fn start(member: &TeamMember) -> Self {
        Self {
            id: member.id.clone(),
            name: member.name,
            stance: member.stance,
            mana_before: member.mana_pool,
            spent_mana: 0.0,
            erosion_accrued: 0.0,
            mana_after: member.mana_pool,
        }
    }
}

/// State at the end of one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
    pub round: u32,
    pub enemy_hp: f64,
    /// Cumulative erosion per member, roster order.
    pub erosion: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleOutcome {
    pub enemy: EnemyStats,
    pub rounds_elapsed: u32,
    pub members: Vec<MemberOutcome>,
    pub mana_spent: f64,
    pub erosion_gained: f64,
    pub progress_gain: f64,
    pub progress_before: f64,
    pub progress_after: f64,
    pub forced_stop: bool,
    pub remaining_hp: f64,
    pub enemy_effective_max_hp: f64,
    pub ability_label: Option<String>,
    pub sealed: bool,
    pub round_log: Vec<RoundRecord>,
}

impl BattleOutcome {
    /// The outcome of a battle that never started: nothing spent, nothing gained.
    pub fn idle(campaign: &Campaign, mods: &BattleModifiers) -> Self {
        Self {
            enemy: mods.tier.stats(),
            rounds_elapsed: 0,
            members: campaign.roster.iter().map(MemberOutcome::start).collect(),
            mana_spent: 0.0,
            erosion_gained: 0.0,
            progress_gain: 0.0,
            progress_before: campaign.progress,
            progress_after: campaign.progress,
            forced_stop: false,
            remaining_hp: mods.effective_max_hp,
            enemy_effective_max_hp: mods.effective_max_hp,
            ability_label: mods.ability_label(),
            sealed: mods.sealed,
            round_log: Vec::new(),
        }
    }

    pub fn victory(&self) -> bool {
        !self.forced_stop && self.remaining_hp <= EPSILON
    }

    pub fn member(&self, id: &str) -> Option<&MemberOutcome> {
        self.members.iter().find(|m| m.id == id)
    }

    /// Mana the encounter really costs: spent plus erosion for fighters,
    /// minus what Standby members recover.
    pub fn net_cost(&self) -> f64 {
        self.members
            .iter()
            .map(|m| match m.stance {
                Stance::Standby => -(m.mana_after - m.mana_before),
                _ => m.spent_mana + m.erosion_accrued,
            })
            .sum()
    }

    /// Net cost per point of progress the tier awards.
    pub fn cost_per_progress(&self) -> Option<f64> {
        if self.enemy.progress_reward == 0 {
            return None;
        }
        Some(self.net_cost() / f64::from(self.enemy.progress_reward))
    }
}

/// One mana debit.
#[derive(Debug, Clone, Copy)]
struct Charge {
    raw: f64,
    cost_multiplier: f64,
    erosion_multiplier: f64,
    accrues_erosion: bool,
}

impl Charge {
    /// Undiscounted cost whose shortfall becomes erosion one to one.
    fn flat(raw: f64) -> Self {
        Self { raw, cost_multiplier: 1.0, erosion_multiplier: 1.0, accrues_erosion: true }
    }
}

#[derive(Debug)]
struct Ledger {
    members: Vec<MemberOutcome>,
    mana_spent: f64,
    erosion_gained: f64,
}

impl Ledger {
    /// Pays what the member can; the discounted shortfall is scaled back to
    /// undiscounted units before it becomes erosion.
    fn pay(&mut self, member: &mut TeamMember, idx: usize, charge: Charge) {
        let cost = charge.raw * charge.cost_multiplier;
        let paid = member.mana_pool.min(cost).max(0.0);
        member.mana_pool -= paid;
        let rec = &mut self.members[idx];
        rec.spent_mana += paid;
        self.mana_spent += paid;

        let overflow = cost - paid;
        if charge.accrues_erosion && overflow > 0.0 && charge.cost_multiplier > 0.0 {
            let erosion = overflow / charge.cost_multiplier * charge.erosion_multiplier;
            rec.erosion_accrued += erosion;
            self.erosion_gained += erosion;
        }
        rec.mana_after = member.mana_pool;
    }

    fn erosion_snapshot(&self) -> Vec<f64> {
        self.members.iter().map(|m| m.erosion_accrued).collect()
    }
}

/// Damage of one member's regular hit, before follow-ups.
fn hit_damage(mods: &BattleModifiers, member: &TeamMember, active: usize) -> f64 {
    let mut dmg = BASE_DAMAGE;
    if mods.chtholly_assist && member.name != Character::Chtholly {
        dmg += 1.0;
    }
    if mods.ithea_assist && member.stance == Stance::Main {
        dmg += 1.0;
    }
    if member.is(Character::Ithea, Stance::Main) {
        dmg += 0.02 * mods.effective_max_hp;
    }
    if mods.streak_active && member.is(Character::Rhantolk, Stance::Main) {
        dmg += 2.0;
    }
    if member.is(Character::Nopht, Stance::Main) && active == 1 {
        dmg += f64::from(mods.rank);
    }
    if mods.effects.tough {
        dmg = (dmg - 1.0).max(0.0);
    }
    if mods.effects.hard && member.stance != Stance::Main {
        dmg = 0.0;
    }
    dmg
}

fn follow_up(mods: &BattleModifiers, dmg: f64) -> f64 {
    if mods.rhantolk_assist && dmg > 0.0 {
        dmg * FOLLOW_UP_RATIO
    } else {
        0.0
    }
}

/// Resolves one encounter against `campaign`'s roster, debiting and crediting
/// mana in place. With `commit`, progress, erosion debt and the streak
/// reference are written back too; the caller persists and logs.
///
/// Fails without touching anything when the tier is not playable here or the
/// formation does not have exactly one `Main`.
pub fn resolve(
    campaign: &mut Campaign,
    tier: Tier,
    commit: bool,
) -> Result<BattleOutcome, BattleError> {
    let mods = modifiers::resolve(campaign, tier)?;
    roster::check_formation(&campaign.roster)?;

    let enemy = tier.stats();
    let active = roster::active_count(&campaign.roster);
    let mut ledger = Ledger {
        members: campaign.roster.iter().map(MemberOutcome::start).collect(),
        mana_spent: 0.0,
        erosion_gained: 0.0,
    };
    let mut round_log = Vec::new();
    let mut hp = mods.effective_max_hp;

    // setup
    if let Some(idx) = mods.sealer {
        ledger.pay(&mut campaign.roster[idx], idx, Charge::flat(mods.seal_cost()));
    }
    if let Some(idx) = mods.main {
        if campaign.roster[idx].name == Character::Chtholly {
            // tier-scaled opening strike; per-hit modifiers never touch it
            hp -= 10.0 + f64::from(mods.rank) * 20.0;
        }
    }

    let mut rounds = 0u32;
    let mut forced_stop = false;
    while hp > EPSILON {
        rounds += 1;

        if mods.effects.drain {
            for (idx, member) in campaign.roster.iter_mut().enumerate() {
                if member.is_active() {
                    ledger.pay(member, idx, Charge::flat(DRAIN_COST));
                }
            }
        }

        for idx in 0..campaign.roster.len() {
            let member = &mut campaign.roster[idx];
            if !member.is_active() {
                continue;
            }
            if hp <= EPSILON {
                break;
            }

            let charge = Charge {
                raw: member.stance.base_cost(),
                cost_multiplier: mods.cost_multiplier_for(member),
                erosion_multiplier: mods.erosion_multiplier(member.stance),
                accrues_erosion: true,
            };
            ledger.pay(member, idx, charge);
            if ledger.members[idx].erosion_accrued > EROSION_STOP_THRESHOLD {
                forced_stop = true;
                break;
            }

            if member.is(Character::Rhantolk, Stance::Assist) {
                continue;
            }

            let dmg = hit_damage(&mods, member, active);
            hp -= dmg;
            if !mods.effects.hard {
                hp -= follow_up(&mods, dmg);
                if member.is(Character::Nopht, Stance::Assist) {
                    let missing = mods.effective_max_hp - hp;
                    let extra = (missing * 0.2).floor() / 10.0;
                    hp -= extra;
                    hp -= follow_up(&mods, extra);
                }
            }
        }

        if !forced_stop && hp > EPSILON && mods.effects.regen {
            hp = (hp + REGEN_HP).min(mods.effective_max_hp);
        }
        tracing::trace!(round = rounds, hp, "round finished");
        round_log.push(RoundRecord {
            round: rounds,
            enemy_hp: hp.max(0.0),
            erosion: ledger.erosion_snapshot(),
        });
        if forced_stop {
            break;
        }
    }

    let progress_before = campaign.progress;
    let mut progress_after = progress_before;
    if !forced_stop {
        if mods.effects.last_word {
            if let Some(idx) = mods.main {
                let charge = Charge { accrues_erosion: false, ..Charge::flat(LAST_WORD_COST) };
                ledger.pay(&mut campaign.roster[idx], idx, charge);
            }
        }

        progress_after = (progress_before + f64::from(enemy.progress_reward)).clamp(0.0, 100.0);

        if !mods.effects.stun {
            let recovery = f64::from(enemy.progress_reward);
            for (idx, member) in campaign.roster.iter_mut().enumerate() {
                if member.stance == Stance::Standby {
                    member.mana_pool = (member.mana_pool + recovery).clamp(0.0, 100.0);
                    ledger.members[idx].mana_after = member.mana_pool;
                }
            }
        }
    }

    if commit {
        campaign.progress = progress_after;
        campaign.erosion_debt += ledger.erosion_gained;
        if !forced_stop && campaign.rules().tracks_streak {
            let holder_fights = mods
                .streak_holder
                .is_some_and(|idx| campaign.roster[idx].is_active());
            if holder_fights {
                campaign.last_defeated_tier = Some(tier);
            }
        }
    }

    tracing::debug!(
        campaign = %campaign.id,
        tier = %tier,
        rounds,
        forced_stop,
        sealed = mods.sealed,
        commit,
        "battle resolved"
    );

    Ok(BattleOutcome {
        enemy,
        rounds_elapsed: rounds,
        members: ledger.members,
        mana_spent: ledger.mana_spent,
        erosion_gained: ledger.erosion_gained,
        progress_gain: progress_after - progress_before,
        progress_before,
        progress_after,
        forced_stop,
        remaining_hp: hp.max(0.0),
        enemy_effective_max_hp: mods.effective_max_hp,
        ability_label: mods.ability_label(),
        sealed: mods.sealed,
        round_log,
    })
}
