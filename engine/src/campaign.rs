use indexmap::IndexMap;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::battle::BattleError;
use crate::catalog::{Character, Color, EnemyAbility, Tier};
use crate::journal::{LogEntry, LOG_CAP, format_number};
use crate::roster::{self, Stance, TeamMember};
use crate::rules::{CampaignKind, CampaignRules};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CampaignError {
    #[error("no member with id '{0}'")]
    UnknownMember(String),
    #[error("enemy tier {0} is not available in this campaign")]
    TierNotAllowed(Tier),
    #[error("ability '{0}' is not offered in this campaign")]
    AbilityNotOffered(&'static str),
    #[error("ability slot {0} does not exist in this campaign")]
    SlotOutOfRange(usize),
    #[error("this campaign does not track victory streaks")]
    NoStreakTracking,
}

/// Ability selection for one tier. Single-slot rules persist a bare key,
/// two-slot rules an array of up to two keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AbilityPick {
    Single(EnemyAbility),
    Slots(Vec<EnemyAbility>),
}

impl AbilityPick {
    pub fn abilities(&self) -> &[EnemyAbility] {
        match self {
            AbilityPick::Single(a) => std::slice::from_ref(a),
            AbilityPick::Slots(v) => v,
        }
    }

    /// Shape `self` for `rules`: catalog-valid, deduplicated, capped to the slot
    /// count and never empty.
    fn normalized(&self, rules: &CampaignRules, fallback: EnemyAbility) -> AbilityPick {
        let mut keep: Vec<EnemyAbility> = Vec::with_capacity(rules.ability_slots);
        for ability in self.abilities() {
            if rules.offers(*ability) && !keep.contains(ability) {
                keep.push(*ability);
            }
        }
        keep.truncate(rules.ability_slots);
        if keep.is_empty() {
            keep.push(fallback);
        }
        if rules.ability_slots == 1 {
            AbilityPick::Single(keep[0])
        } else {
            AbilityPick::Slots(keep)
        }
    }
}

impl<'de> Deserialize<'de> for AbilityPick {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
            Junk(IgnoredAny),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::One(key) => match EnemyAbility::from_key(&key) {
                Some(a) => AbilityPick::Single(a),
                None => AbilityPick::Slots(Vec::new()),
            },
            Raw::Many(keys) => {
                AbilityPick::Slots(keys.iter().filter_map(|k| EnemyAbility::from_key(k)).collect())
            }
            Raw::Junk(_) => AbilityPick::Slots(Vec::new()),
        })
    }
}

/// Per-tier ability selections, kept in tier order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct AbilityBook(IndexMap<Tier, AbilityPick>);

impl AbilityBook {
    pub fn get(&self, tier: Tier) -> Option<&AbilityPick> {
        self.0.get(&tier)
    }

    pub fn selected(&self, tier: Tier) -> &[EnemyAbility] {
        self.0.get(&tier).map(AbilityPick::abilities).unwrap_or(&[])
    }

    fn uniform(rules: &CampaignRules) -> Self {
        let pick = AbilityPick::Single(rules.default_ability).normalized(rules, rules.default_ability);
        AbilityBook(rules.allowed_tiers.iter().map(|t| (*t, pick.clone())).collect())
    }
}

impl<'de> Deserialize<'de> for AbilityBook {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Map(IndexMap<String, AbilityPick>),
            Junk(IgnoredAny),
        }

        let map = match Raw::deserialize(deserializer)? {
            Raw::Map(map) => map
                .into_iter()
                .filter_map(|(k, v)| Tier::from_key(&k).map(|t| (t, v)))
                .collect(),
            Raw::Junk(_) => IndexMap::new(),
        };
        Ok(AbilityBook(map))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Valid(T),
    Invalid(IgnoredAny),
}

/// Deserializes a sequence, dropping elements that do not parse.
fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seq<T> {
        Items(Vec<Lenient<T>>),
        Junk(IgnoredAny),
    }

    Ok(match Seq::<T>::deserialize(deserializer)? {
        Seq::Items(items) => {
            let total = items.len();
            let kept: Vec<T> = items
                .into_iter()
                .filter_map(|item| match item {
                    Lenient::Valid(v) => Some(v),
                    Lenient::Invalid(_) => None,
                })
                .collect();
            if kept.len() < total {
                tracing::warn!(dropped = total - kept.len(), "discarded unreadable entries");
            }
            kept
        }
        Seq::Junk(_) => Vec::new(),
    })
}

pub(crate) fn lenient_option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match Lenient::<T>::deserialize(deserializer)? {
        Lenient::Valid(v) => Some(v),
        Lenient::Invalid(_) => None,
    })
}

/// Unknown tiers read as `R`; normalization then moves disallowed tiers to the
/// campaign's default.
fn lenient_tier<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Tier, D::Error> {
    Ok(lenient_option(deserializer)?.unwrap_or(Tier::R))
}

/// One independent playthrough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: CampaignKind,
    pub name: String,
    pub progress: f64,
    pub erosion_debt: f64,
    #[serde(deserialize_with = "lenient_tier")]
    pub selected_enemy_tier: Tier,
    #[serde(default)]
    pub enemy_ability_selections: AbilityBook,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_option"
    )]
    pub last_defeated_tier: Option<Tier>,
    #[serde(deserialize_with = "lenient_seq")]
    pub roster: Vec<TeamMember>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub battle_log: Vec<LogEntry>,
    /// Pre-slot single selection from older saves; folded into the book on load.
    #[serde(default, rename = "enemyAbility", skip_serializing)]
    legacy_ability: Option<String>,
}

fn canonical_roster(kind: CampaignKind) -> Vec<TeamMember> {
    match kind {
        CampaignKind::First => vec![
            TeamMember::new("c1-m1", Character::Chtholly, Color::Blue, Stance::Main),
            TeamMember::new("c1-m2", Character::Nephren, Color::White, Stance::Assist),
            TeamMember::new("c1-m3", Character::Ithea, Color::Yellow, Stance::Assist),
        ],
        CampaignKind::Second => vec![
            TeamMember::new("c2-m1", Character::Nephren, Color::White, Stance::Main),
            TeamMember::new("c2-m2", Character::Rhantolk, Color::Blue, Stance::Assist),
            TeamMember::new("c2-m3", Character::Nopht, Color::Red, Stance::Assist),
        ],
    }
}

pub(crate) fn sanitize(value: f64, min: f64, max: f64) -> f64 {
    if value.is_finite() { value.clamp(min, max) } else { min }
}

impl Campaign {
    /// The state a campaign starts in, and returns to on reset.
    pub fn default_for(kind: CampaignKind) -> Self {
        let rules = kind.rules();
        Self {
            id: kind,
            name: match kind {
                CampaignKind::First => "Campaign One".to_string(),
                CampaignKind::Second => "Campaign Two".to_string(),
            },
            progress: 0.0,
            erosion_debt: 0.0,
            selected_enemy_tier: rules.default_tier(),
            enemy_ability_selections: AbilityBook::uniform(rules),
            last_defeated_tier: rules.tracks_streak.then(|| rules.default_tier()),
            roster: canonical_roster(kind),
            battle_log: Vec::new(),
            legacy_ability: None,
        }
    }

    pub fn rules(&self) -> &'static CampaignRules {
        self.id.rules()
    }

    /// Repairs a loaded campaign in place. Every repair falls back to a fixed
    /// default; nothing here fails.
    pub fn normalize(&mut self) {
        let rules = self.rules();

        self.progress = sanitize(self.progress, 0.0, 100.0);
        self.erosion_debt = sanitize(self.erosion_debt, 0.0, f64::MAX);

        // Membership is fixed: rebuild from the canonical roster, keeping the
        // persisted mana and stance of every id that survived.
        let saved = std::mem::take(&mut self.roster);
        self.roster = canonical_roster(self.id)
            .into_iter()
            .map(|mut member| {
                if let Some(prev) = saved.iter().find(|m| m.id == member.id) {
                    member.mana_pool = sanitize(prev.mana_pool, 0.0, 100.0);
                    member.stance = prev.stance;
                } else {
                    tracing::warn!(campaign = %self.id, member = %member.id, "member missing from save, restored default");
                }
                member
            })
            .collect();
        roster::ensure_single_main(&mut self.roster, None);

        if !rules.allows_tier(self.selected_enemy_tier) {
            tracing::warn!(campaign = %self.id, tier = %self.selected_enemy_tier, "selected tier not allowed, reset");
            self.selected_enemy_tier = rules.default_tier();
        }

        let fallback = self
            .legacy_ability
            .take()
            .and_then(|key| EnemyAbility::from_key(&key))
            .filter(|a| rules.offers(*a))
            .unwrap_or(rules.default_ability);
        let empty = AbilityPick::Slots(Vec::new());
        self.enemy_ability_selections = AbilityBook(
            rules
                .allowed_tiers
                .iter()
                .map(|tier| {
                    let pick = self.enemy_ability_selections.get(*tier).unwrap_or(&empty);
                    (*tier, pick.normalized(rules, fallback))
                })
                .collect(),
        );

        if rules.tracks_streak {
            if !self.last_defeated_tier.is_some_and(|t| rules.allows_tier(t)) {
                self.last_defeated_tier = Some(rules.default_tier());
            }
        } else {
            self.last_defeated_tier = None;
        }

        self.battle_log.truncate(LOG_CAP);
        for entry in &mut self.battle_log {
            entry.repair();
        }
    }

    pub fn member(&self, id: &str) -> Option<&TeamMember> {
        self.roster.iter().find(|m| m.id == id)
    }

    fn member_mut(&mut self, id: &str) -> Result<&mut TeamMember, CampaignError> {
        self.roster
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| CampaignError::UnknownMember(id.to_string()))
    }

    /// Changes one member's stance. A new `Main` demotes the previous one to
    /// `Assist`; nobody is ever promoted.
    pub fn set_stance(&mut self, member_id: &str, stance: Stance) -> Result<(), CampaignError> {
        let member = self.member_mut(member_id)?;
        let previous = member.stance;
        member.stance = stance;
        if stance == Stance::Main && previous != Stance::Main {
            for other in self.roster.iter_mut().filter(|m| m.id != member_id) {
                if other.stance == Stance::Main {
                    other.stance = Stance::Assist;
                }
            }
        }
        roster::ensure_single_main(&mut self.roster, Some(member_id));
        Ok(())
    }

    pub fn set_mana(&mut self, member_id: &str, mana: f64) -> Result<(), CampaignError> {
        self.member_mut(member_id)?.mana_pool = sanitize(mana, 0.0, 100.0);
        Ok(())
    }

    pub fn select_enemy(&mut self, tier: Tier) -> Result<(), CampaignError> {
        if !self.rules().allows_tier(tier) {
            return Err(CampaignError::TierNotAllowed(tier));
        }
        self.selected_enemy_tier = tier;
        Ok(())
    }

    /// Sets (or with `None`, clears) one ability slot for `tier`. Clearing slot 0
    /// shifts slot 1 down; an emptied selection falls back to the default ability.
    pub fn set_ability(
        &mut self,
        tier: Tier,
        slot: usize,
        ability: Option<EnemyAbility>,
    ) -> Result<(), CampaignError> {
        let rules = self.rules();
        if !rules.allows_tier(tier) {
            return Err(CampaignError::TierNotAllowed(tier));
        }
        if slot >= rules.ability_slots {
            return Err(CampaignError::SlotOutOfRange(slot));
        }
        if let Some(a) = ability {
            if !rules.offers(a) {
                return Err(CampaignError::AbilityNotOffered(a.key()));
            }
        }

        let mut slots = self.enemy_ability_selections.selected(tier).to_vec();
        match ability {
            None if slot < slots.len() => {
                slots.remove(slot);
            }
            None => {}
            Some(a) if slot < slots.len() => slots[slot] = a,
            Some(a) => {
                if slots.is_empty() {
                    slots.push(rules.default_ability);
                }
                slots.push(a);
            }
        }
        let pick = AbilityPick::Slots(slots).normalized(rules, rules.default_ability);
        self.enemy_ability_selections.0.insert(tier, pick);
        Ok(())
    }

    pub fn set_ability_for_all_tiers(
        &mut self,
        slot: usize,
        ability: Option<EnemyAbility>,
    ) -> Result<(), CampaignError> {
        for tier in self.rules().allowed_tiers {
            self.set_ability(*tier, slot, ability)?;
        }
        Ok(())
    }

    pub fn set_last_defeated(&mut self, tier: Tier) -> Result<(), CampaignError> {
        let rules = self.rules();
        if !rules.tracks_streak {
            return Err(CampaignError::NoStreakTracking);
        }
        if !rules.allows_tier(tier) {
            return Err(CampaignError::TierNotAllowed(tier));
        }
        self.last_defeated_tier = Some(tier);
        Ok(())
    }

    /// Whether a battle could be committed with the current formation.
    pub fn readiness(&self) -> Result<(), BattleError> {
        roster::check_formation(&self.roster)
    }

    pub fn push_log(&mut self, entry: LogEntry) {
        self.battle_log.insert(0, entry);
        self.battle_log.truncate(LOG_CAP);
    }

    pub fn log_for(&self, tier: Tier) -> impl Iterator<Item = &LogEntry> {
        self.battle_log.iter().filter(move |e| e.enemy.tier == tier)
    }

    pub fn total_mana(&self) -> f64 {
        self.roster.iter().map(|m| m.mana_pool).sum()
    }

    pub fn summary(&self) -> String {
        format!(
            "Progress {}/100 · Erosion {} · Total mana {}",
            format_number(self.progress, 0),
            format_number(self.erosion_debt, 1),
            format_number(self.total_mana(), 1)
        )
    }
}
