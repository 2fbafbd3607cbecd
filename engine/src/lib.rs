pub mod api;
pub mod battle;
pub mod campaign;
pub mod catalog;
pub mod history;
pub mod journal;
pub mod modifiers;
pub mod roster;
pub mod rules;
pub mod state;

pub use api::{commit, commit_at, forecast, forecast_all, TierPreview};
pub use battle::{BattleError, BattleOutcome, MemberOutcome, RoundRecord, EPSILON, EROSION_STOP_THRESHOLD};
pub use campaign::{AbilityPick, Campaign, CampaignError};
pub use catalog::{Character, Color, EnemyAbility, EnemyStats, Tier};
pub use history::{History, UndoSnapshot, HISTORY_CAP};
pub use journal::{format_number, LogEntry, LOG_CAP};
pub use modifiers::{BattleModifiers, EnemyEffects};
pub use roster::{Stance, TeamMember};
pub use rules::{CampaignKind, CampaignRules};
pub use state::{Game, GameState};
