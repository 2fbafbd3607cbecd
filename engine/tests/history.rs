use kdl_engine::{
    BattleError, Campaign, CampaignKind, EnemyAbility, Game, GameState, History, Stance, Tier,
    HISTORY_CAP,
};

#[test]
fn undo_restores_progress_erosion_and_mana_only() {
    let mut game = Game::default();
    game.state.c1.set_mana("c1-m1", 0.0).unwrap();
    let before = game.state.clone();

    game.fight(CampaignKind::First, Tier::SSR).unwrap();
    assert_ne!(game.state.c1.progress, before.c1.progress);
    game.state.c1.set_stance("c1-m3", Stance::Standby).unwrap();

    assert!(game.undo());
    let c1 = &game.state.c1;
    assert_eq!(c1.progress, before.c1.progress);
    assert_eq!(c1.erosion_debt, before.c1.erosion_debt);
    let mana: Vec<f64> = c1.roster.iter().map(|m| m.mana_pool).collect();
    assert_eq!(mana, vec![0.0, 100.0, 100.0]);

    // the log and later stance edits survive
    assert_eq!(c1.battle_log.len(), 1);
    assert_eq!(c1.roster[2].stance, Stance::Standby);
    assert!(!game.undo());
}

#[test]
fn undo_restores_the_streak_reference() {
    let mut game = Game::default();
    game.fight(CampaignKind::Second, Tier::UR).unwrap();
    assert_eq!(game.state.c2.last_defeated_tier, Some(Tier::UR));

    assert!(game.undo());
    assert_eq!(game.state.c2.last_defeated_tier, Some(Tier::SR));
}

#[test]
fn snapshots_cover_both_campaigns() {
    let mut game = Game::default();
    game.fight(CampaignKind::First, Tier::R).unwrap();
    game.fight(CampaignKind::Second, Tier::SR).unwrap();

    assert!(game.undo());
    assert_eq!(game.state.c2.progress, 0.0);
    assert_eq!(game.state.c1.progress, 5.0);
    assert!(game.undo());
    assert_eq!(game.state.c1.progress, 0.0);
}

#[test]
fn rejected_fight_leaves_history_alone() {
    let mut game = Game::default();
    game.state.c2.roster[1].stance = Stance::Main;

    assert_eq!(
        game.fight(CampaignKind::Second, Tier::SR),
        Err(BattleError::InvalidFormation { mains: 2 })
    );
    assert_eq!(
        game.fight(CampaignKind::Second, Tier::R),
        Err(BattleError::InvalidEnemy("R".to_string()))
    );
    assert!(game.history.is_empty());
}

#[test]
fn history_is_capped() {
    let mut game = Game::default();
    for _ in 0..(HISTORY_CAP + 10) {
        game.state.c1.progress = 0.0;
        game.fight(CampaignKind::First, Tier::R).unwrap();
    }
    assert_eq!(game.history.len(), HISTORY_CAP);
}

#[test]
fn reset_restores_defaults_and_clears_history() {
    let mut game = Game::default();
    game.fight(CampaignKind::First, Tier::R).unwrap();
    game.fight(CampaignKind::Second, Tier::SR).unwrap();
    game.state.c1.set_ability(Tier::R, 0, Some(EnemyAbility::Drain)).unwrap();

    game.reset(CampaignKind::First);
    assert_eq!(game.state.c1, Campaign::default_for(CampaignKind::First));
    assert_eq!(game.state.c2.progress, 10.0);
    assert!(game.history.is_empty());
}

#[test]
fn persisted_history_reloads() {
    let mut game = Game::default();
    game.fight(CampaignKind::First, Tier::R).unwrap();
    game.fight(CampaignKind::First, Tier::R).unwrap();

    let text = game.history.to_json().unwrap();
    let mut reloaded = Game::new(game.state.clone(), History::from_json_lenient(&text));
    assert_eq!(reloaded.history.len(), 2);
    assert!(reloaded.undo());
    assert_eq!(reloaded.state.c1.progress, 5.0);

    assert!(History::from_json_lenient("{oops").is_empty());
}

#[test]
fn undo_clamps_out_of_range_snapshots() {
    let persisted = r#"[
        {
            "c1": {
                "progress": 500,
                "erosionDebt": -40,
                "roster": [ { "id": "c1-m1", "manaPool": 1000 }, { "id": "c1-m2", "manaPool": -5 } ]
            },
            "c2": { "progress": 10, "erosionDebt": 0, "lastDefeatedTier": "R", "roster": [] }
        }
    ]"#;
    let mut game = Game::new(GameState::default(), History::from_json_lenient(persisted));
    assert_eq!(game.history.len(), 1);

    assert!(game.undo());
    let c1 = &game.state.c1;
    assert_eq!(c1.progress, 100.0);
    assert_eq!(c1.erosion_debt, 0.0);
    assert_eq!(c1.roster[0].mana_pool, 100.0);
    assert_eq!(c1.roster[1].mana_pool, 0.0);
    // a tier the campaign cannot fight is not restored as its streak reference
    assert_eq!(game.state.c2.last_defeated_tier, Some(Tier::SR));

    let out = game.forecast(CampaignKind::First, Tier::R).unwrap();
    assert!(out.members.iter().all(|m| m.mana_after <= 100.0));
}

#[test]
fn legacy_history_loads_and_undoes() {
    let persisted = r#"[
        {
            "c1": { "progress": 5, "erosion": 2, "team": [ { "id": "c1-m1", "mana": 60 } ] },
            "c2": { "progress": 0, "erosion": 0, "lastTarget": "", "team": [] }
        },
        {
            "c1": { "progress": 10, "erosion": 4, "team": [ { "id": "c1-m1", "mana": 30 } ] },
            "c2": { "progress": 20, "erosion": 1, "lastTarget": "UR", "team": [ { "id": "c2-m3", "mana": 75 } ] }
        },
        { "c1": "unreadable" }
    ]"#;
    let mut game = Game::new(GameState::default(), History::from_json_lenient(persisted));
    assert_eq!(game.history.len(), 2);

    assert!(game.undo());
    assert_eq!(game.state.c1.progress, 10.0);
    assert_eq!(game.state.c1.erosion_debt, 4.0);
    assert_eq!(game.state.c1.roster[0].mana_pool, 30.0);
    assert_eq!(game.state.c2.progress, 20.0);
    assert_eq!(game.state.c2.last_defeated_tier, Some(Tier::UR));
    assert_eq!(game.state.c2.roster[2].mana_pool, 75.0);

    // an empty last target leaves the streak reference alone
    assert!(game.undo());
    assert_eq!(game.state.c1.roster[0].mana_pool, 60.0);
    assert_eq!(game.state.c2.last_defeated_tier, Some(Tier::UR));
    assert!(!game.undo());
}

#[test]
fn forecast_through_the_game_is_read_only() {
    let game = Game::new(GameState::default(), History::default());
    let out = game.forecast(CampaignKind::Second, Tier::SSR).unwrap();
    assert!(out.victory());
    assert_eq!(game, Game::default());
}
