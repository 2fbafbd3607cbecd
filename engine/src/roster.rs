use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::battle::BattleError;
use crate::catalog::{Character, Color};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Main,
    Assist,
    Standby,
}

impl Stance {
    /// Mana paid every round before any multiplier.
    pub const fn base_cost(self) -> f64 {
        match self {
            Stance::Main => 2.0,
            Stance::Assist => 1.0,
            Stance::Standby => 0.0,
        }
    }

    pub const fn is_active(self) -> bool {
        !matches!(self, Stance::Standby)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Stance::Main => "Main",
            Stance::Assist => "Assist",
            Stance::Standby => "Standby",
        }
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Stance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "main" => Ok(Stance::Main),
            "assist" => Ok(Stance::Assist),
            "standby" => Ok(Stance::Standby),
            other => Err(format!("unknown stance '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: String,
    pub name: Character,
    pub color: Color,
    #[serde(alias = "mana")]
    pub mana_pool: f64,
    #[serde(alias = "role")]
    pub stance: Stance,
}

impl TeamMember {
    pub fn new(id: &str, name: Character, color: Color, stance: Stance) -> Self {
        Self {
            id: id.to_string(),
            name,
            color,
            mana_pool: 100.0,
            stance,
        }
    }

    pub fn is_active(&self) -> bool {
        self.stance.is_active()
    }

    /// `name` holds `stance`; the test every stance-bound skill starts with.
    pub fn is(&self, name: Character, stance: Stance) -> bool {
        self.name == name && self.stance == stance
    }
}

pub fn active_count(roster: &[TeamMember]) -> usize {
    roster.iter().filter(|m| m.is_active()).count()
}

pub fn main_count(roster: &[TeamMember]) -> usize {
    roster.iter().filter(|m| m.stance == Stance::Main).count()
}

/// Index of the first `Main` in roster order.
pub fn main_index(roster: &[TeamMember]) -> Option<usize> {
    roster.iter().position(|m| m.stance == Stance::Main)
}

/// Strict formation check: at least one active member and exactly one `Main`.
pub fn check_formation(roster: &[TeamMember]) -> Result<(), BattleError> {
    if active_count(roster) == 0 {
        return Err(BattleError::NoActiveMembers);
    }
    match main_count(roster) {
        1 => Ok(()),
        mains => Err(BattleError::InvalidFormation { mains }),
    }
}

/// Demotes surplus `Main`s to `Assist`, keeping `preferred` when it is one of
/// them and otherwise the first `Main` in roster order. Never promotes: a
/// roster with zero `Main`s is left as is.
pub fn ensure_single_main(roster: &mut [TeamMember], preferred: Option<&str>) {
    if active_count(roster) == 0 || main_count(roster) <= 1 {
        return;
    }
    let keep = preferred
        .and_then(|id| {
            roster
                .iter()
                .position(|m| m.id == id && m.stance == Stance::Main)
        })
        .or_else(|| main_index(roster));
    for (idx, member) in roster.iter_mut().enumerate() {
        if member.stance == Stance::Main && Some(idx) != keep {
            tracing::debug!(member = %member.id, "demoting surplus main to assist");
            member.stance = Stance::Assist;
        }
    }
}
