use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand, ValueEnum};
use encoding_rs::Encoding;
use kdl_engine::{
    format_number, BattleOutcome, Campaign, CampaignKind, EnemyAbility, Game, GameState, History,
    Stance, Tier, TierPreview,
};
use serde::Serialize;
use std::{fs, path::Path, path::PathBuf};

#[derive(Copy, Clone, ValueEnum)]
enum Format {
    Text,
    Json,
    Yaml,
}

#[derive(Subcommand)]
enum Cmd {
    /// Summary, roster and ability picks of one or both campaigns
    Show {
        #[arg(value_parser = parse_campaign)]
        campaign: Option<CampaignKind>,
    },
    /// Preview a battle without saving anything
    Forecast {
        #[arg(value_parser = parse_campaign)]
        campaign: CampaignKind,
        /// Enemy tier (defaults to the selected one)
        tier: Option<Tier>,
    },
    /// Preview every tier the campaign allows
    Enemies {
        #[arg(value_parser = parse_campaign)]
        campaign: CampaignKind,
    },
    /// Fight for real and save the result
    Fight {
        #[arg(value_parser = parse_campaign)]
        campaign: CampaignKind,
        /// Enemy tier (defaults to the selected one)
        tier: Option<Tier>,
    },
    /// Roll back the most recent fight
    Undo,
    /// Restore a campaign to its starting state (clears undo history)
    Reset {
        #[arg(value_parser = parse_campaign)]
        campaign: CampaignKind,
    },
    /// Set a member's stance: main | assist | standby
    Stance {
        #[arg(value_parser = parse_campaign)]
        campaign: CampaignKind,
        member: String,
        stance: Stance,
    },
    /// Set a member's mana (clamped to 0..=100)
    Mana {
        #[arg(value_parser = parse_campaign)]
        campaign: CampaignKind,
        member: String,
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },
    /// Pick an enemy ability, or `none` to clear the slot
    Ability {
        #[arg(value_parser = parse_campaign)]
        campaign: CampaignKind,
        ability: String,
        /// Tier to edit (defaults to the selected one)
        #[arg(long, conflicts_with = "all")]
        tier: Option<Tier>,
        /// Apply to every allowed tier
        #[arg(long, default_value_t = false)]
        all: bool,
        /// Ability slot (0-based)
        #[arg(long, default_value_t = 0)]
        slot: usize,
    },
    /// Set the tier the streak bonus compares against
    Streak {
        #[arg(value_parser = parse_campaign)]
        campaign: CampaignKind,
        tier: Tier,
    },
    /// Select the enemy tier used when none is given
    Select {
        #[arg(value_parser = parse_campaign)]
        campaign: CampaignKind,
        tier: Tier,
    },
    /// Print the battle log, newest first
    Log {
        #[arg(value_parser = parse_campaign)]
        campaign: CampaignKind,
        /// Only entries against this tier
        #[arg(long)]
        tier: Option<Tier>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Parser)]
#[command(name = "kdl")]
#[command(about = "Battle resolution harness for both campaigns")]
struct Cli {
    /// Game state JSON (created on first save)
    #[arg(long, global = true, default_value = "kdl-state.json")]
    state: PathBuf,
    /// Undo history JSON
    #[arg(long, global = true, default_value = "kdl-history.json")]
    history: PathBuf,
    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,
    #[command(subcommand)]
    cmd: Cmd,
}

fn parse_campaign(s: &str) -> Result<CampaignKind, String> {
    CampaignKind::from_key(s).ok_or_else(|| format!("unknown campaign '{s}' (expected c1 or c2)"))
}

fn read_text_auto(path: &Path) -> anyhow::Result<String> {
    let bytes = fs::read(path)?;
    if let Some((enc, bom_len)) = Encoding::for_bom(&bytes) {
        let (cow, _, _) = enc.decode(&bytes[bom_len..]);
        Ok(cow.into_owned())
    } else {
        Ok(String::from_utf8(bytes)?)
    }
}

fn load_game(state: &Path, history: &Path) -> anyhow::Result<Game> {
    let state = if state.exists() {
        let text = read_text_auto(state).with_context(|| format!("reading {}", state.display()))?;
        GameState::from_json_lenient(&text)
    } else {
        GameState::default()
    };
    let history = if history.exists() {
        let text =
            read_text_auto(history).with_context(|| format!("reading {}", history.display()))?;
        History::from_json_lenient(&text)
    } else {
        History::default()
    };
    tracing::debug!(undo_depth = history.len(), "game loaded");
    Ok(Game::new(state, history))
}

fn save_game(cli: &Cli, game: &Game) -> anyhow::Result<()> {
    fs::write(&cli.state, game.state.to_json()?)
        .with_context(|| format!("writing {}", cli.state.display()))?;
    fs::write(&cli.history, game.history.to_json()?)
        .with_context(|| format!("writing {}", cli.history.display()))?;
    tracing::info!(
        state = %cli.state.display(),
        undo_depth = game.history.len(),
        "game saved"
    );
    Ok(())
}

fn emit<T: Serialize>(format: Format, value: &T, text: impl FnOnce() -> String) -> anyhow::Result<()> {
    match format {
        Format::Text => println!("{}", text()),
        Format::Json => println!("{}", serde_json::to_string_pretty(value)?),
        Format::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

fn verdict(outcome: &BattleOutcome) -> &'static str {
    if outcome.forced_stop {
        "forced stop"
    } else if outcome.victory() {
        "victory"
    } else {
        "formation not ready"
    }
}

fn outcome_text(kind: CampaignKind, outcome: &BattleOutcome) -> String {
    let mut out = format!(
        "{kind} vs {}: {}\nEnemy HP {}",
        outcome.enemy.tier,
        verdict(outcome),
        format_number(outcome.enemy_effective_max_hp, 1)
    );
    if let Some(label) = &outcome.ability_label {
        out.push_str(&format!(", ability {label}"));
        if outcome.sealed {
            out.push_str(" (sealed)");
        }
    }
    out.push_str(&format!(
        "\nRounds {}, mana spent {}, erosion +{}, progress {} -> {}",
        outcome.rounds_elapsed,
        format_number(outcome.mana_spent, 1),
        format_number(outcome.erosion_gained, 1),
        format_number(outcome.progress_before, 0),
        format_number(outcome.progress_after, 0)
    ));
    if outcome.forced_stop {
        out.push_str(&format!("\nRemaining HP {}", format_number(outcome.remaining_hp, 1)));
    }
    for m in &outcome.members {
        out.push_str(&format!(
            "\n  {}({}) mana {} -> {} (spent {}, erosion {})",
            m.name,
            m.stance,
            format_number(m.mana_before, 1),
            format_number(m.mana_after, 1),
            format_number(m.spent_mana, 1),
            format_number(m.erosion_accrued, 1)
        ));
    }
    out
}

fn campaign_text(c: &Campaign) -> String {
    let mut out = format!("[{}] {}\n{}", c.id, c.name, c.summary());
    out.push_str(&format!("\nSelected enemy: {}", c.selected_enemy_tier));
    if let Some(tier) = c.last_defeated_tier {
        out.push_str(&format!(", streak reference: {tier}"));
    }
    if let Err(e) = c.readiness() {
        out.push_str(&format!("\nNot ready: {e}"));
    }
    for m in &c.roster {
        out.push_str(&format!(
            "\n  {:<6} {:<9} {:<8} mana {}",
            m.id,
            m.name.to_string(),
            m.stance.to_string(),
            format_number(m.mana_pool, 1)
        ));
        let skill = match m.stance {
            Stance::Main => Some(m.name.skills().main),
            Stance::Assist => Some(m.name.skills().assist),
            Stance::Standby => None,
        };
        if let Some(skill) = skill {
            out.push_str(&format!("\n         {skill}"));
        }
    }
    for tier in c.rules().allowed_tiers {
        let picks: Vec<&str> = c
            .enemy_ability_selections
            .selected(*tier)
            .iter()
            .map(|a| a.display_name())
            .collect();
        out.push_str(&format!("\n  {:<4} {}", tier.key(), picks.join(" + ")));
    }
    out
}

fn previews_text(kind: CampaignKind, previews: &[TierPreview]) -> String {
    let mut out = format!("{kind} enemy previews");
    for p in previews {
        let cost = p
            .cost_per_progress
            .map_or_else(|| "-".to_string(), |c| format_number(c, 2));
        out.push_str(&format!(
            "\n  {:<4} {:<19} rounds {:>3}  cost/progress {}",
            p.tier.key(),
            verdict(&p.outcome),
            p.outcome.rounds_elapsed,
            cost
        ));
    }
    out
}

fn parse_ability(key: &str) -> anyhow::Result<Option<EnemyAbility>> {
    if key.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    EnemyAbility::from_key(key)
        .map(Some)
        .ok_or_else(|| anyhow!("unknown ability '{key}'"))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut game = load_game(&cli.state, &cli.history)?;

    match &cli.cmd {
        Cmd::Show { campaign } => {
            let kinds = campaign.map_or(CampaignKind::ALL.to_vec(), |k| vec![k]);
            let campaigns: Vec<&Campaign> = kinds.iter().map(|k| game.state.campaign(*k)).collect();
            emit(cli.format, &campaigns, || {
                campaigns
                    .iter()
                    .map(|c| campaign_text(c))
                    .collect::<Vec<_>>()
                    .join("\n\n")
            })?;
        }
        Cmd::Forecast { campaign, tier } => {
            let tier = tier.unwrap_or(game.state.campaign(*campaign).selected_enemy_tier);
            let outcome = game.forecast(*campaign, tier)?;
            emit(cli.format, &outcome, || outcome_text(*campaign, &outcome))?;
        }
        Cmd::Enemies { campaign } => {
            let previews = kdl_engine::forecast_all(game.state.campaign(*campaign))?;
            emit(cli.format, &previews, || previews_text(*campaign, &previews))?;
        }
        Cmd::Fight { campaign, tier } => {
            let tier = tier.unwrap_or(game.state.campaign(*campaign).selected_enemy_tier);
            let outcome = game
                .fight(*campaign, tier)
                .with_context(|| format!("{campaign} cannot fight {tier}"))?;
            save_game(&cli, &game)?;
            emit(cli.format, &outcome, || outcome_text(*campaign, &outcome))?;
        }
        Cmd::Undo => {
            if !game.undo() {
                println!("nothing to undo");
                return Ok(());
            }
            save_game(&cli, &game)?;
            println!("undone ({} left)", game.history.len());
        }
        Cmd::Reset { campaign } => {
            game.reset(*campaign);
            save_game(&cli, &game)?;
            println!("{campaign} reset");
        }
        Cmd::Stance { campaign, member, stance } => {
            game.state.campaign_mut(*campaign).set_stance(member, *stance)?;
            save_game(&cli, &game)?;
            let c = game.state.campaign(*campaign);
            emit(cli.format, c, || campaign_text(c))?;
        }
        Cmd::Mana { campaign, member, value } => {
            game.state.campaign_mut(*campaign).set_mana(member, *value)?;
            save_game(&cli, &game)?;
            let c = game.state.campaign(*campaign);
            emit(cli.format, c, || campaign_text(c))?;
        }
        Cmd::Ability { campaign, ability, tier, all, slot } => {
            let ability = parse_ability(ability)?;
            let c = game.state.campaign_mut(*campaign);
            if *all {
                c.set_ability_for_all_tiers(*slot, ability)?;
            } else {
                let tier = tier.unwrap_or(c.selected_enemy_tier);
                c.set_ability(tier, *slot, ability)?;
            }
            save_game(&cli, &game)?;
            let c = game.state.campaign(*campaign);
            emit(cli.format, c, || campaign_text(c))?;
        }
        Cmd::Streak { campaign, tier } => {
            game.state.campaign_mut(*campaign).set_last_defeated(*tier)?;
            save_game(&cli, &game)?;
            let c = game.state.campaign(*campaign);
            emit(cli.format, c, || campaign_text(c))?;
        }
        Cmd::Select { campaign, tier } => {
            game.state.campaign_mut(*campaign).select_enemy(*tier)?;
            save_game(&cli, &game)?;
            let c = game.state.campaign(*campaign);
            emit(cli.format, c, || campaign_text(c))?;
        }
        Cmd::Log { campaign, tier, limit } => {
            let c = game.state.campaign(*campaign);
            let entries: Vec<_> = match tier {
                Some(t) => c.log_for(*t).take(*limit).collect(),
                None => c.battle_log.iter().take(*limit).collect(),
            };
            emit(cli.format, &entries, || {
                if entries.is_empty() {
                    return "no battles yet".to_string();
                }
                entries
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("\n\n")
            })?;
        }
    }
    Ok(())
}
