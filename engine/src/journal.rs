use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::battle::BattleOutcome;
use crate::catalog::EnemyStats;
use crate::roster::TeamMember;

/// Most-recent-first cap on a campaign's battle log.
pub const LOG_CAP: usize = 80;

/// Accepts RFC 3339 text or epoch milliseconds, which older saves wrote.
fn timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stamp {
        Text(DateTime<Utc>),
        Millis(#[serde(with = "chrono::serde::ts_milliseconds")] DateTime<Utc>),
    }

    Ok(match Stamp::deserialize(deserializer)? {
        Stamp::Text(ts) | Stamp::Millis(ts) => ts,
    })
}

/// One committed battle, as kept in the campaign's log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub seq: usize,
    #[serde(deserialize_with = "timestamp")]
    pub ts: DateTime<Utc>,
    pub enemy: EnemyStats,
    pub rounds: u32,
    pub mana_spent: f64,
    pub erosion_gained: f64,
    pub progress_gain: f64,
    pub progress_after: f64,
    /// Post-battle mana of every member in roster order, e.g. `94/89/97`.
    pub mana_after: String,
    /// `Name(Stance)` pairs separated by spaces.
    pub roster: String,
    #[serde(default)]
    pub enemy_ability: Option<String>,
    #[serde(default)]
    pub sealed: bool,
    #[serde(default)]
    pub forced_stop: bool,
    #[serde(default)]
    pub remaining_hp: f64,
    /// Missing from the oldest saves; loading fills in the tier's base HP.
    #[serde(default)]
    pub enemy_max_hp: f64,
}

impl LogEntry {
    pub fn record(
        seq: usize,
        ts: DateTime<Utc>,
        outcome: &BattleOutcome,
        roster: &[TeamMember],
    ) -> Self {
        Self {
            seq,
            ts,
            enemy: outcome.enemy,
            rounds: outcome.rounds_elapsed,
            mana_spent: outcome.mana_spent,
            erosion_gained: outcome.erosion_gained,
            progress_gain: outcome.progress_gain,
            progress_after: outcome.progress_after,
            mana_after: mana_snapshot(roster),
            roster: roster_label(roster),
            enemy_ability: outcome.ability_label.clone(),
            sealed: outcome.sealed,
            forced_stop: outcome.forced_stop,
            remaining_hp: outcome.remaining_hp,
            enemy_max_hp: outcome.enemy_effective_max_hp,
        }
    }

    /// Entries without a usable max HP show the tier's base HP instead.
    pub(crate) fn repair(&mut self) {
        if !(self.enemy_max_hp.is_finite() && self.enemy_max_hp > 0.0) {
            self.enemy_max_hp = self.enemy.base_hp;
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[#{}] {}", self.seq, self.ts.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(
            f,
            "Enemy: {} HP={} progress +{}",
            self.enemy.tier,
            format_number(self.enemy_max_hp, 1),
            self.enemy.progress_reward
        )?;
        if let Some(ability) = &self.enemy_ability {
            let sealed = if self.sealed { " (sealed)" } else { "" };
            writeln!(f, "Ability: {ability}{sealed}")?;
        }
        writeln!(f, "Roster: {}", self.roster)?;
        writeln!(
            f,
            "Result: rounds={}, mana spent={}, erosion +{}, progress -> {}/100",
            self.rounds,
            format_number(self.mana_spent, 1),
            format_number(self.erosion_gained, 1),
            format_number(self.progress_after, 0)
        )?;
        if self.forced_stop {
            writeln!(f, "Ended: a single member's erosion rose above 200, forced stop")?;
        }
        writeln!(f, "Remaining HP: {}", format_number(self.remaining_hp, 1))?;
        write!(f, "Mana left: {}", self.mana_after)
    }
}

/// Rounds to `digits` decimals and drops trailing zeros; non-finite values render as `-`.
pub fn format_number(n: f64, digits: usize) -> String {
    if !n.is_finite() {
        return "-".to_string();
    }
    let fixed = format!("{:.*}", digits, n);
    let rounded: f64 = fixed.parse().unwrap_or(n);
    // `+ 0.0` folds -0 into 0
    format!("{}", rounded + 0.0)
}

pub fn mana_snapshot(roster: &[TeamMember]) -> String {
    roster
        .iter()
        .map(|m| format_number(m.mana_pool, 1))
        .collect::<Vec<_>>()
        .join("/")
}

pub fn roster_label(roster: &[TeamMember]) -> String {
    roster
        .iter()
        .map(|m| format!("{}({})", m.name, m.stance))
        .collect::<Vec<_>>()
        .join(" ")
}
